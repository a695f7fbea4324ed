//! Thin composition layer over the automation subsystems.
//!
//! Sequences resolve -> act -> readiness -> classify -> snapshot for each
//! user-issued command. All real logic lives in the library crates; this
//! module only wires them together.

use osprey_browser::{
    ElementResolver, Error, Outcome, ReadinessDetector, Result, Session, classify, probes,
};
use osprey_core::{AutomationConfig, DiffReport, PageMode, SnapshotKey, SnapshotStore};
use serde_json::Value;

/// What one mutating command observed after acting.
pub struct CommandReport {
    pub outcome: Outcome,
    pub mode: PageMode,
    pub diff: DiffReport,
}

pub struct Orchestrator {
    session: Session,
    detector: ReadinessDetector,
    store: SnapshotStore,
    config: AutomationConfig,
}

impl Orchestrator {
    /// Attaches to the browser on `port` with the default snapshot store.
    pub async fn connect(port: u16, config: AutomationConfig) -> Result<Self> {
        let store = SnapshotStore::new(SnapshotStore::default_dir()?)?;
        Self::connect_with_store(port, config, store).await
    }

    pub async fn connect_with_store(
        port: u16,
        config: AutomationConfig,
        store: SnapshotStore,
    ) -> Result<Self> {
        let session = Session::attach(port, config.clone()).await?;
        tracing::debug!(port, "orchestrator attached");
        Ok(Self {
            session,
            detector: ReadinessDetector::new(config.clone()),
            store,
            config,
        })
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// Navigate, converge, classify, snapshot.
    pub async fn open(&mut self, url: &str) -> Result<CommandReport> {
        self.session.navigate(url).await?;
        let outcome = self
            .detector
            .wait_converged(&mut self.session, None, self.config.navigation_timeout)
            .await?;
        self.report(outcome).await
    }

    /// Resolve a reference, click it, then converge on its container.
    pub async fn click(
        &mut self,
        reference: &str,
        index: Option<usize>,
        within: Option<&str>,
    ) -> Result<CommandReport> {
        let element = ElementResolver::resolve(&mut self.session, reference, within, index).await?;
        tracing::debug!(reference, selector = %element.selector, "click");

        let clicked = self
            .session
            .evaluate(&probes::click_probe(&element.selector))
            .await?;
        if !matches!(clicked, Value::Bool(true)) {
            return Err(Error::NotFound {
                reference: format!("{} (element vanished before click)", reference),
            });
        }

        let scope = element.container.as_ref().map(|c| c.selector.clone());
        let outcome = self
            .detector
            .wait_converged(
                &mut self.session,
                scope.as_deref(),
                self.config.post_action_timeout,
            )
            .await?;
        self.report(outcome).await
    }

    /// Resolve a reference, set its value, then converge.
    pub async fn input(
        &mut self,
        reference: &str,
        value: &str,
        index: Option<usize>,
    ) -> Result<CommandReport> {
        let element = ElementResolver::resolve(&mut self.session, reference, None, index).await?;
        tracing::debug!(reference, selector = %element.selector, "input");

        let accepted = self
            .session
            .evaluate(&probes::input_probe(&element.selector, value))
            .await?;
        if !matches!(accepted, Value::Bool(true)) {
            return Err(Error::NotFound {
                reference: format!("{} (element vanished before input)", reference),
            });
        }

        let scope = element.container.as_ref().map(|c| c.selector.clone());
        let outcome = self
            .detector
            .wait_converged(
                &mut self.session,
                scope.as_deref(),
                self.config.post_action_timeout,
            )
            .await?;
        self.report(outcome).await
    }

    /// Composite convergence wait with no action.
    pub async fn wait_converged(&mut self, window: std::time::Duration) -> Result<Outcome> {
        self.detector
            .wait_converged(&mut self.session, None, window)
            .await
    }

    /// Hard-failing selector presence/absence wait.
    pub async fn wait_for_selector(
        &mut self,
        selector: &str,
        gone: bool,
        window: std::time::Duration,
    ) -> Result<u32> {
        self.detector
            .wait_for_selector(&mut self.session, selector, gone, window)
            .await
    }

    /// Capture a snapshot; returns the full canonical text or the diff
    /// against the previous capture for the same key.
    pub async fn snapshot(&mut self, full: bool) -> Result<(PageMode, String)> {
        let (mode, key) = self.capture().await?;
        if full {
            let content = self.store.latest(&key)?.unwrap_or_default();
            Ok((mode, content))
        } else {
            Ok((mode, self.store.diff(&key)?.render()))
        }
    }

    async fn report(&mut self, outcome: Outcome) -> Result<CommandReport> {
        let (mode, key) = self.capture().await?;
        let diff = self.store.diff(&key)?;
        Ok(CommandReport {
            outcome,
            mode,
            diff,
        })
    }

    /// Classify, canonicalize, persist. Returns the snapshot key used.
    async fn capture(&mut self) -> Result<(PageMode, SnapshotKey)> {
        let mode = classify::classify_page(&mut self.session).await?;
        let url = self.session.current_url().await?;
        let key = SnapshotKey::from_url(&url, mode)?;

        let content = match self.session.evaluate(probes::SNAPSHOT_PROBE).await? {
            Value::String(text) => text,
            other => {
                return Err(Error::Protocol(format!(
                    "Snapshot probe returned non-text value: {}",
                    other
                )));
            }
        };
        self.store.record(&key, &content)?;
        tracing::debug!(%mode, prefix = %key.file_prefix(), "page captured");
        Ok((mode, key))
    }
}
