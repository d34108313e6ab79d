//! Page instrumentation probe
//!
//! Loads the URL in a fresh browser session and reads resource and DOM
//! metrics from the page. The session is closed whether or not the
//! measurement succeeds.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use webaudit_core::browser::{BrowserLauncher, BrowserSession, Navigation, Viewport};
use webaudit_core::model::{PageMetrics, ProbeOutcome};
use webaudit_core::probe::{Probe, ProbeKind, Result};

/// Page metrics via a driven browser
pub struct InstrumentationProbe {
    launcher: Arc<dyn BrowserLauncher>,
    viewport: Viewport,
    navigation_timeout: Duration,
}

impl InstrumentationProbe {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        viewport: Viewport,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            launcher,
            viewport,
            navigation_timeout,
        }
    }

    async fn measure(&self, session: &mut dyn BrowserSession, url: &str) -> Result<PageMetrics> {
        let mut page = session.new_page(self.viewport).await?;
        let navigation = Navigation::initial(self.navigation_timeout);

        let measured = match page.goto(url, navigation).await {
            Ok(()) => page.metrics().await,
            Err(e) => Err(e),
        };

        if let Err(e) = page.close().await {
            warn!("Failed to close instrumentation page: {}", e);
        }
        Ok(measured?)
    }
}

#[async_trait]
impl Probe for InstrumentationProbe {
    type Report = PageMetrics;

    fn kind(&self) -> ProbeKind {
        ProbeKind::PageInstrumentation
    }

    async fn probe(&self, url: &str) -> ProbeOutcome<PageMetrics> {
        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => return ProbeOutcome::failed(e.to_string()),
        };

        let measured = self.measure(session.as_mut(), url).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close instrumentation browser: {}", e);
        }
        measured.into()
    }
}
