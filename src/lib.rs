//! WebAudit: page audits, accessibility scans and behavioral flows
//!
//! The binary wires the workspace crates together: `webaudit-core` decides
//! what a run is, `webaudit-tools` supplies the probes and browser driver,
//! `webaudit-store` keeps the history and `webaudit-api` serves it over HTTP.

pub mod cli;

pub use cli::{parse_args, run_cli_mode, Args, Command};
