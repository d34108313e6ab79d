//! WebAudit CLI
//!
//! Loads configuration, applies flag overrides, installs logging and hands
//! off to the mode dispatcher.

use clap::Parser;

use webaudit::cli::{init_logging, run_cli_mode, Args, EXIT_FAILURE};
use webaudit_core::config::AuditConfig;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match AuditConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };
    args.apply_to(&mut config);

    if let Err(e) = init_logging(&config.log_level, config.log_json) {
        eprintln!("Error: failed to initialise logging: {}", e);
        std::process::exit(EXIT_FAILURE);
    }

    let exit_code = run_cli_mode(args, config).await;
    std::process::exit(exit_code);
}
