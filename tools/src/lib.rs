//! WebAudit Tools Module
//!
//! Concrete collaborators behind the core contracts: the subprocess
//! executor, the three probe providers and the out-of-process browser
//! driver. [`build_orchestrator`] wires them from an [`AuditConfig`].

pub mod driver;
pub mod probes;
pub mod subprocess;

use std::sync::Arc;

use webaudit_core::config::AuditConfig;
use webaudit_core::flows::{FlowRegistry, FlowRunner};
use webaudit_core::orchestrator::{AuditOrchestrator, ProbeSet};

pub use driver::DriverLauncher;
pub use probes::{InstrumentationProbe, LighthouseProbe, Pa11yProbe};
pub use subprocess::{ExecutionResult, SubprocessExecutor};

/// Browser driver launcher configured from `config`
pub fn build_launcher(config: &AuditConfig) -> Arc<DriverLauncher> {
    Arc::new(
        DriverLauncher::new(config.driver.clone())
            .with_intra_flow_navigation_timeout(config.timeouts.intra_flow_navigation()),
    )
}

/// Flow runner over the browser driver
pub fn build_flow_runner(config: &AuditConfig, registry: FlowRegistry) -> FlowRunner {
    FlowRunner::new(
        build_launcher(config),
        Arc::new(registry),
        config.flow_runner(),
    )
}

/// The production probe set
pub fn build_probes(config: &AuditConfig) -> ProbeSet {
    let probe_timeout = config.timeouts.probe();
    ProbeSet {
        instrumentation: Arc::new(InstrumentationProbe::new(
            build_launcher(config),
            config.viewport,
            config.timeouts.navigation(),
        )),
        synthetic: Arc::new(LighthouseProbe::new(
            config.lighthouse.clone(),
            probe_timeout,
        )),
        accessibility: Arc::new(Pa11yProbe::new(config.pa11y.clone(), probe_timeout)),
    }
}

/// Orchestrator wired with the production probes and flow runner
pub fn build_orchestrator(config: &AuditConfig, registry: FlowRegistry) -> AuditOrchestrator {
    AuditOrchestrator::new(
        build_probes(config),
        Arc::new(build_flow_runner(config, registry)),
    )
    .with_probe_timeout(config.timeouts.probe())
}

#[cfg(test)]
mod tests {
    use super::*;
    use webaudit_core::orchestrator::FlowExecutor;
    use webaudit_core::probe::{Probe, ProbeKind};

    #[test]
    fn test_build_probes_kinds() {
        let probes = build_probes(&AuditConfig::default());
        assert_eq!(probes.instrumentation.kind(), ProbeKind::PageInstrumentation);
        assert_eq!(probes.synthetic.kind(), ProbeKind::SyntheticAudit);
        assert_eq!(probes.accessibility.kind(), ProbeKind::AccessibilityScan);
    }

    #[tokio::test]
    async fn test_orchestrator_without_flows_directory() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let config = AuditConfig {
            flows_dir: dir.path().join("absent"),
            ..Default::default()
        };
        let orchestrator = build_orchestrator(&config, FlowRegistry::new());
        let bundle = orchestrator
            .flows()
            .run_flows("https://a.test")
            .await
            .unwrap();
        assert_eq!(bundle.note.as_deref(), Some("no flows directory"));
    }
}
