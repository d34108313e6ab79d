//! CLI mode dispatch
//!
//! - audit (default): probes and flows for every `--url`, then report,
//!   optional history write and the JSON payload on stdout
//! - flows: the flow runner alone against one URL
//! - serve: the HTTP surface
//! - config: the effective configuration as TOML
//!
//! Verdicts never change the exit code; only input and I/O errors do.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use webaudit_api::{ApiConfig, ApiServer};
use webaudit_core::config::AuditConfig;
use webaudit_core::flows::{FlowRegistry, FlowRunner};
use webaudit_core::orchestrator::AuditOrchestrator;
use webaudit_core::report::{
    format_as_text, project_flows, project_run, render_flow_bundle_html, render_html,
    write_report,
};
use webaudit_core::thresholds::ThresholdOverride;
use webaudit_core::split_urls;
use webaudit_store::HistoryStore;
use webaudit_tools::{build_flow_runner, build_orchestrator};

use crate::cli::{Args, Command, Error, Result, EXIT_FAILURE, EXIT_SUCCESS};

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// URL used by flows mode when neither `--url` nor `TEST_URL` is given
pub const DEFAULT_FLOWS_URL: &str = "https://example.com";

/// Run the selected mode and return the exit code
///
/// `config` already carries the flag overrides.
pub async fn run_cli_mode(args: Args, config: AuditConfig) -> ExitCode {
    let outcome = match &args.command {
        Some(Command::Serve { .. }) => serve(&config).await.map(|()| None),
        Some(Command::Config) => config.to_toml().map(Some).map_err(Error::from),
        None if args.flows => run_flows(&args, &config).await.map(Some),
        None => run_audit(&args, &config).await.map(Some),
    };

    match outcome {
        Ok(Some(payload)) => {
            println!("{}", payload.trim_end());
            EXIT_SUCCESS
        }
        Ok(None) => EXIT_SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

/// Validated inputs of an audit run
#[derive(Debug, Clone, PartialEq)]
pub struct AuditPlan {
    pub urls: Vec<String>,
    pub overrides: ThresholdOverride,
    pub report_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
    pub simple: bool,
}

impl AuditPlan {
    /// Check the arguments before anything is launched
    pub fn from_args(args: &Args, config: &AuditConfig) -> Result<Self> {
        let urls = args.url.as_deref().map(split_urls).unwrap_or_default();
        if urls.is_empty() {
            return Err(Error::MissingArgument("--url"));
        }

        let overrides = match &args.thresholds {
            Some(path) => ThresholdOverride::from_file(path)?,
            None => ThresholdOverride::default(),
        };

        Ok(Self {
            urls,
            overrides,
            report_path: (!args.no_report).then(|| config.report_path.clone()),
            history_path: args.save.then(|| config.history_path.clone()),
            simple: args.simple,
        })
    }
}

async fn run_audit(args: &Args, config: &AuditConfig) -> Result<String> {
    let plan = AuditPlan::from_args(args, config)?;
    let orchestrator = build_orchestrator(config, FlowRegistry::new());
    execute_audit(&plan, &orchestrator).await
}

/// Run the plan and return the stdout payload
pub async fn execute_audit(plan: &AuditPlan, orchestrator: &AuditOrchestrator) -> Result<String> {
    let run = orchestrator.audit_all(&plan.urls, &plan.overrides).await;

    if let Some(path) = &plan.report_path {
        write_report(path, &render_html(&run)).await?;
    }
    if let Some(path) = &plan.history_path {
        HistoryStore::new(path).save(&run).await?;
    }

    info!(
        "{} of {} URL(s) passed thresholds",
        run.passed_count(),
        run.verdicts.len()
    );

    if plan.simple {
        Ok(format_as_text(&project_run(&run)))
    } else {
        Ok(serde_json::to_string_pretty(&run)?)
    }
}

/// URL for flows mode: `--url`, then `TEST_URL`, then [`DEFAULT_FLOWS_URL`]
pub fn flows_url(args: &Args, test_url: Option<String>) -> String {
    args.url
        .clone()
        .or(test_url)
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FLOWS_URL.to_string())
}

async fn run_flows(args: &Args, config: &AuditConfig) -> Result<String> {
    let url = flows_url(args, std::env::var("TEST_URL").ok());
    let runner = build_flow_runner(config, FlowRegistry::new());
    let report_path = (!args.no_report).then(|| config.report_path.clone());
    execute_flows(&url, &runner, report_path.as_deref(), args.simple).await
}

/// Run the flows against `url` and return the stdout payload
pub async fn execute_flows(
    url: &str,
    runner: &FlowRunner,
    report_path: Option<&std::path::Path>,
    simple: bool,
) -> Result<String> {
    let bundle = runner.run_for_url(url).await;

    if let Some(path) = report_path {
        write_report(path, &render_flow_bundle_html(url, &bundle)).await?;
    }

    if simple {
        Ok(format_as_text(&project_flows(&bundle)))
    } else {
        Ok(serde_json::to_string_pretty(&bundle)?)
    }
}

async fn serve(config: &AuditConfig) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(config, FlowRegistry::new()));
    let store = Arc::new(HistoryStore::new(&config.history_path));
    ApiServer::new(ApiConfig::from(&config.server), orchestrator, store)
        .start()
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse_args;

    #[test]
    fn test_flows_url_precedence() {
        let with_url = parse_args(["webaudit", "--flows", "--url", "https://a.test"]).unwrap();
        let without = parse_args(["webaudit", "--flows"]).unwrap();

        assert_eq!(
            flows_url(&with_url, Some("https://env.test".to_string())),
            "https://a.test"
        );
        assert_eq!(
            flows_url(&without, Some("https://env.test".to_string())),
            "https://env.test"
        );
        assert_eq!(flows_url(&without, None), DEFAULT_FLOWS_URL);
    }

    #[test]
    fn test_plan_requires_url() {
        let args = parse_args(["webaudit", "--url", " , "]).unwrap();
        let err = AuditPlan::from_args(&args, &AuditConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MissingArgument("--url")));
    }

    #[test]
    fn test_plan_paths_follow_flags() {
        let args = parse_args(["webaudit", "--url", "https://a.test", "--no-report"]).unwrap();
        let plan = AuditPlan::from_args(&args, &AuditConfig::default()).unwrap();
        assert_eq!(plan.urls, vec!["https://a.test".to_string()]);
        assert_eq!(plan.report_path, None);
        assert_eq!(plan.history_path, None);

        let args = parse_args(["webaudit", "--url", "https://a.test", "--save"]).unwrap();
        let plan = AuditPlan::from_args(&args, &AuditConfig::default()).unwrap();
        assert_eq!(plan.report_path, Some(PathBuf::from("report.html")));
        assert_eq!(plan.history_path, Some(PathBuf::from("data/results.json")));
    }

    #[tokio::test]
    async fn test_missing_url_exits_with_failure() {
        let args = parse_args(["webaudit"]).unwrap();
        assert_eq!(run_cli_mode(args, AuditConfig::default()).await, EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_config_mode_succeeds() {
        let args = parse_args(["webaudit", "config"]).unwrap();
        assert_eq!(run_cli_mode(args, AuditConfig::default()).await, EXIT_SUCCESS);
    }
}
