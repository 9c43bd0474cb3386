//! Validation subcommand

use super::CliError;
use crate::export::config::DEFAULT_CHECKPOINT_FILE;
use crate::resume::{Checkpoint, CheckpointStore};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Validate command for checking persisted state
#[derive(Parser, Debug)]
pub struct ValidateCommand {
    /// What to validate
    #[command(subcommand)]
    pub target: ValidateTarget,
}

/// Target type for validation
#[derive(clap::Subcommand, Debug)]
pub enum ValidateTarget {
    /// Check that a checkpoint file parses and satisfies its range invariant
    Checkpoint {
        /// Checkpoint file
        #[arg(long, default_value = DEFAULT_CHECKPOINT_FILE)]
        checkpoint_file: PathBuf,
    },
}

impl ValidateCommand {
    /// Execute the validation command
    pub fn execute(&self) -> Result<Option<Checkpoint>, CliError> {
        match &self.target {
            ValidateTarget::Checkpoint { checkpoint_file } => validate_checkpoint(checkpoint_file),
        }
    }
}

fn validate_checkpoint(path: &Path) -> Result<Option<Checkpoint>, CliError> {
    match CheckpointStore::read(path) {
        Ok(Some(checkpoint)) => {
            println!("Valid checkpoint: {}", path.display());
            println!("  Start date: {}", checkpoint.start_date());
            println!("  End date: {}", checkpoint.end_date());
            println!("  Next date: {}", checkpoint.next_date());
            Ok(Some(checkpoint))
        }
        Ok(None) => {
            println!("No checkpoint found at {}", path.display());
            Ok(None)
        }
        Err(e) if e.is_corrupt_state() => {
            eprintln!("Invalid checkpoint {}: {}", path.display(), e);
            Err(CliError::InvalidArgument(format!(
                "{} is not a valid checkpoint: {}. Use `dump --resume reset` to start over.",
                path.display(),
                e
            )))
        }
        Err(e) => Err(e.into()),
    }
}
