//! CLI module
//!
//! Provides:
//! - Argument parsing (clap)
//! - Tracing subscriber setup
//! - Mode dispatch (audit, flows, serve, config)

pub mod args;
pub mod dispatch;
pub mod logging;

// Re-exports
pub use args::{parse_args, Args, Command};
pub use dispatch::{run_cli_mode, ExitCode};
pub use logging::init_logging;

use webaudit_core::config::ConfigError;
use webaudit_core::report::ReportError;
use webaudit_core::thresholds::ThresholdError;
use webaudit_store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Thresholds(#[from] ThresholdError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    History(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(#[from] anyhow::Error),
}

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;
