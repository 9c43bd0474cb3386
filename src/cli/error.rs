//! CLI error types and conversions

use crate::client::ClientError;
use crate::export::ExportError;
use crate::resume::ResumeError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Export error
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),

    /// Client error
    #[error("client error: {0}")]
    ClientError(#[from] ClientError),

    /// Resume error
    #[error("checkpoint error: {0}")]
    ResumeError(#[from] ResumeError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
