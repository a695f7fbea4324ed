use std::time::Duration;

/// Minimum number of unchanged DOM fingerprints before the page counts as stable.
///
/// Lazy-loaded content often lands in staggered bursts; fewer than four quiet
/// ticks produces premature "stable" verdicts on slow single-page apps.
pub const MIN_STABLE_TICKS: u32 = 4;

/// How a composite readiness timeout is surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Treat the timeout as "probably ready" and proceed with the command.
    ///
    /// Indefinite blocking is worse than a possibly-premature snapshot, so
    /// this is the default.
    #[default]
    Proceed,
    /// Surface the timeout as a command failure.
    Fail,
}

/// Timeouts and polling knobs threaded explicitly through constructors.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// Interval between readiness samples.
    pub poll_interval: Duration,
    /// Convergence window after a mutating action (click, input).
    pub post_action_timeout: Duration,
    /// How long `navigate` waits for the page-load event.
    pub navigation_timeout: Duration,
    /// How long an explicit selector wait polls before failing.
    pub selector_timeout: Duration,
    /// Consecutive unchanged fingerprints required for DOM stability.
    /// Values below [`MIN_STABLE_TICKS`] are raised to the minimum.
    pub stable_ticks: u32,
    /// What to do when composite convergence does not happen in time.
    pub on_timeout: TimeoutPolicy,
    /// Inclusive debugging-port range the lease manager allocates from.
    pub port_range: (u16, u16),
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            post_action_timeout: Duration::from_secs(3),
            navigation_timeout: Duration::from_secs(30),
            selector_timeout: Duration::from_secs(10),
            stable_ticks: MIN_STABLE_TICKS,
            on_timeout: TimeoutPolicy::Proceed,
            port_range: (9222, 9299),
        }
    }
}

impl AutomationConfig {
    /// Stability requirement with the floor applied.
    pub fn effective_stable_ticks(&self) -> u32 {
        self.stable_ticks.max(MIN_STABLE_TICKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = AutomationConfig::default();

        assert_eq!(config.poll_interval, Duration::from_millis(300));
        assert_eq!(config.post_action_timeout, Duration::from_secs(3));
        assert_eq!(config.on_timeout, TimeoutPolicy::Proceed);
        assert_eq!(config.port_range, (9222, 9299));
    }

    #[test]
    fn test_stable_ticks_floor() {
        let config = AutomationConfig {
            stable_ticks: 1,
            ..Default::default()
        };

        assert_eq!(config.effective_stable_ticks(), MIN_STABLE_TICKS);
    }
}
