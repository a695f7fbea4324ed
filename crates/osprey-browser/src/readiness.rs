//! Multi-signal page readiness detection.
//!
//! Entered after every mutating command. The remote debugging transport does
//! not push one unambiguous "idle" event for arbitrary SPA frameworks, so
//! readiness is a cooperative interval poll over three independent signals:
//! document-ready, network-idle, and DOM stability. The tick accounting
//! lives in [`ConvergenceTracker`], a pure struct testable without a browser.

use crate::probes;
use crate::session::Session;
use crate::{Error, Result};
use osprey_core::AutomationConfig;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};

/// One probe observation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessSample {
    pub document_ready: bool,
    pub inflight_requests: u64,
    pub node_count: u64,
    pub serialized_size: u64,
}

/// The three composite signals as of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    pub document_ready: bool,
    pub network_idle: bool,
    pub dom_stable: bool,
}

impl Signals {
    pub fn all(&self) -> bool {
        self.document_ready && self.network_idle && self.dom_stable
    }
}

/// Result of a composite readiness wait.
///
/// `TimedOut` is a soft result: whether it fails the surrounding command is
/// the caller's policy decision, not this module's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Converged { signals: Signals, ticks: u32 },
    TimedOut { last: Option<Signals> },
}

impl Outcome {
    pub fn converged(&self) -> bool {
        matches!(self, Outcome::Converged { .. })
    }
}

/// Pure tick accounting for the composite convergence signal.
///
/// DOM stability means the structural fingerprint (node count + serialized
/// size) has been observed unchanged on the required number of consecutive
/// ticks, which tolerates staggered lazy-loaded content.
pub struct ConvergenceTracker {
    required_stable: u32,
    ticks: u32,
    stable_run: u32,
    last_fingerprint: Option<(u64, u64)>,
}

impl ConvergenceTracker {
    pub fn new(required_stable: u32) -> Self {
        Self {
            required_stable,
            ticks: 0,
            stable_run: 0,
            last_fingerprint: None,
        }
    }

    /// Records one sample and returns the signal vector for this tick.
    pub fn observe(&mut self, sample: &ReadinessSample) -> Signals {
        self.ticks += 1;
        let fingerprint = (sample.node_count, sample.serialized_size);
        self.stable_run = match self.last_fingerprint {
            Some(previous) if previous == fingerprint => self.stable_run + 1,
            _ => 1,
        };
        self.last_fingerprint = Some(fingerprint);

        Signals {
            document_ready: sample.document_ready,
            network_idle: sample.inflight_requests == 0,
            dom_stable: self.stable_run >= self.required_stable,
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

/// Pure tick accounting for an explicit selector wait.
///
/// In appear-mode the wait is done once the selector is present; in
/// gone-mode once it is absent. Presence of the wrong polarity never
/// satisfies the wait, no matter how many ticks pass.
pub struct SelectorWait {
    gone: bool,
    ticks: u32,
}

impl SelectorWait {
    pub fn new(gone: bool) -> Self {
        Self { gone, ticks: 0 }
    }

    /// Records one presence observation; true once the wanted condition holds.
    pub fn observe(&mut self, present: bool) -> bool {
        self.ticks += 1;
        present != self.gone
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

/// Interval-polling readiness detector bound to one configuration.
pub struct ReadinessDetector {
    config: AutomationConfig,
}

impl ReadinessDetector {
    pub fn new(config: AutomationConfig) -> Self {
        Self { config }
    }

    /// Blocks until all three signals hold simultaneously, or `window`
    /// elapses.
    ///
    /// `scope` narrows the DOM fingerprint to one container's subtree, used
    /// when an action is known to only affect that subtree.
    pub async fn wait_converged(
        &self,
        session: &mut Session,
        scope: Option<&str>,
        window: Duration,
    ) -> Result<Outcome> {
        let mut tracker = ConvergenceTracker::new(self.config.effective_stable_ticks());
        let deadline = Instant::now() + window;
        let mut last = None;

        loop {
            let sample = self.sample(session, scope).await?;
            let signals = tracker.observe(&sample);
            last = Some(signals);

            if signals.all() {
                tracing::debug!(ticks = tracker.ticks(), "page converged");
                return Ok(Outcome::Converged {
                    signals,
                    ticks: tracker.ticks(),
                });
            }
            if Instant::now() + self.config.poll_interval > deadline {
                tracing::debug!(
                    ticks = tracker.ticks(),
                    ?last,
                    "convergence window elapsed"
                );
                return Ok(Outcome::TimedOut { last });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Polls for `selector` presence, or absence when `gone` is set.
    ///
    /// Unlike the composite wait, this timeout is a hard failure: the caller
    /// asked for a specific condition that did not happen. Returns the
    /// number of ticks taken.
    pub async fn wait_for_selector(
        &self,
        session: &mut Session,
        selector: &str,
        gone: bool,
        window: Duration,
    ) -> Result<u32> {
        let probe = probes::selector_probe(selector);
        let deadline = Instant::now() + window;
        let mut wait = SelectorWait::new(gone);

        loop {
            let present = matches!(session.evaluate(&probe).await?, Value::Bool(true));
            if wait.observe(present) {
                return Ok(wait.ticks());
            }
            if Instant::now() + self.config.poll_interval > deadline {
                return Err(Error::SelectorTimeout {
                    selector: selector.to_string(),
                    gone,
                    ms: window.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn sample(&self, session: &mut Session, scope: Option<&str>) -> Result<ReadinessSample> {
        let value = session.evaluate(&probes::readiness_probe(scope)).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::Protocol(format!("Bad readiness sample: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ready: bool, inflight: u64, nodes: u64, size: u64) -> ReadinessSample {
        ReadinessSample {
            document_ready: ready,
            inflight_requests: inflight,
            node_count: nodes,
            serialized_size: size,
        }
    }

    #[test]
    fn test_converges_after_required_stable_ticks() {
        let mut tracker = ConvergenceTracker::new(4);

        for tick in 1..=4 {
            let signals = tracker.observe(&sample(true, 0, 100, 5000));
            if tick < 4 {
                assert!(!signals.all(), "converged too early at tick {}", tick);
            } else {
                assert!(signals.all());
            }
        }
    }

    #[test]
    fn test_fingerprint_change_resets_stability() {
        let mut tracker = ConvergenceTracker::new(4);

        tracker.observe(&sample(true, 0, 100, 5000));
        tracker.observe(&sample(true, 0, 100, 5000));
        tracker.observe(&sample(true, 0, 100, 5000));
        // Lazy-loaded content lands; the run must restart.
        tracker.observe(&sample(true, 0, 120, 6200));
        let signals = tracker.observe(&sample(true, 0, 120, 6200));

        assert!(!signals.dom_stable);
    }

    #[test]
    fn test_all_signals_must_hold_simultaneously() {
        let mut tracker = ConvergenceTracker::new(4);

        // Stable DOM but network still busy.
        for _ in 0..5 {
            let signals = tracker.observe(&sample(true, 2, 100, 5000));
            assert!(signals.dom_stable || tracker.ticks() < 4);
            assert!(!signals.all());
        }

        // Network drains; the already-stable fingerprint converges now.
        let signals = tracker.observe(&sample(true, 0, 100, 5000));
        assert!(signals.all());
    }

    #[test]
    fn test_document_not_ready_blocks_convergence() {
        let mut tracker = ConvergenceTracker::new(4);

        for _ in 0..6 {
            let signals = tracker.observe(&sample(false, 0, 100, 5000));
            assert!(!signals.all());
        }
    }

    #[test]
    fn test_gone_wait_succeeds_when_selector_disappears() {
        let mut wait = SelectorWait::new(true);

        // Dialog still visible on the first two ticks.
        assert!(!wait.observe(true));
        assert!(!wait.observe(true));
        // Removed from the DOM.
        assert!(wait.observe(false));
        assert_eq!(wait.ticks(), 3);
    }

    #[test]
    fn test_gone_wait_never_satisfied_while_present() {
        let mut wait = SelectorWait::new(true);

        for _ in 0..50 {
            assert!(!wait.observe(true));
        }
    }

    #[test]
    fn test_appear_wait_succeeds_on_presence() {
        let mut wait = SelectorWait::new(false);

        assert!(!wait.observe(false));
        assert!(wait.observe(true));
        assert_eq!(wait.ticks(), 2);
    }

    #[test]
    fn test_node_count_alone_is_not_stability() {
        let mut tracker = ConvergenceTracker::new(2);

        tracker.observe(&sample(true, 0, 100, 5000));
        // Same node count, different serialized size: text mutated in place.
        let signals = tracker.observe(&sample(true, 0, 100, 5600));

        assert!(!signals.dom_stable);
    }
}
