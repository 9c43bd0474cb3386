//! CLI command implementations

pub mod dump;
pub mod error;
pub mod sites;
pub mod validate;

pub use dump::{Cli, Commands, DumpArgs};
pub use error::CliError;
pub use sites::SitesCommand;
pub use validate::ValidateCommand;
