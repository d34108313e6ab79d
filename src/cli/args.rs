//! CLI argument parsing
//!
//! Grammar:
//! ```text
//! webaudit [options]                 audit --url (comma-separated list)
//! webaudit --flows [--url URL]       run the flows only
//! webaudit serve [--host] [--port]   start the HTTP surface
//! webaudit config                    print the effective configuration
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use webaudit_core::config::AuditConfig;

/// Parsed CLI arguments
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "webaudit", version, about = "Audit web pages and run behavioral flows")]
pub struct Args {
    /// URL to audit, or a comma-separated list
    #[arg(long)]
    pub url: Option<String>,

    /// Run only the flows (URL from --url, TEST_URL or https://example.com)
    #[arg(long)]
    pub flows: bool,

    /// JSON file of threshold overrides
    #[arg(long, value_name = "FILE")]
    pub thresholds: Option<PathBuf>,

    /// Append the run to the history file
    #[arg(long)]
    pub save: bool,

    /// Directory of flow scripts
    #[arg(long, value_name = "DIR")]
    pub flows_dir: Option<PathBuf>,

    /// Where to write the HTML report
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Skip the HTML report
    #[arg(long, conflicts_with = "report")]
    pub no_report: bool,

    /// Print the pass/fail listing instead of JSON
    #[arg(long)]
    pub simple: bool,

    /// Configuration file (defaults to webaudit.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "WEBAUDIT_LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Start the HTTP surface
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the effective configuration as TOML
    Config,
}

impl Args {
    /// Apply flag overrides on top of loaded configuration
    pub fn apply_to(&self, config: &mut AuditConfig) {
        if let Some(dir) = &self.flows_dir {
            config.flows_dir = dir.clone();
        }
        if let Some(report) = &self.report {
            config.report_path = report.clone();
        }
        if self.log_json {
            config.log_json = true;
        }
        if let Some(Command::Serve { host, port }) = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}

/// Parse from an explicit argument list
pub fn parse_args<I, T>(args: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Args::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_flags() {
        let args = parse_args([
            "webaudit",
            "--url",
            "https://a.test,https://b.test",
            "--thresholds",
            "limits.json",
            "--save",
            "--simple",
        ])
        .unwrap();
        assert_eq!(args.url.as_deref(), Some("https://a.test,https://b.test"));
        assert_eq!(args.thresholds, Some(PathBuf::from("limits.json")));
        assert!(args.save);
        assert!(args.simple);
        assert!(!args.flows);
        assert_eq!(args.command, None);
    }

    #[test]
    fn test_serve_overrides_server_settings() {
        let args = parse_args(["webaudit", "serve", "--port", "8080", "--config", "a.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("a.toml")));

        let mut config = AuditConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_path_overrides() {
        let args = parse_args([
            "webaudit",
            "--flows",
            "--flows-dir",
            "e2e",
            "--report",
            "out/r.html",
        ])
        .unwrap();
        let mut config = AuditConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.flows_dir, PathBuf::from("e2e"));
        assert_eq!(config.report_path, PathBuf::from("out/r.html"));
    }

    #[test]
    fn test_report_and_no_report_conflict() {
        assert!(parse_args(["webaudit", "--report", "a.html", "--no-report"]).is_err());
    }
}
