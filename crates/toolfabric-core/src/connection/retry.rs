//! Retry policies for probe loops
//!
//! After every probe iteration the loop asks its policy how long to sleep.
//! `FixedInterval` reproduces plain periodic probing with no cap on
//! reconnection attempts; the other policies bound retry storms.

use std::sync::Arc;
use std::time::Duration;

/// Result of one probe iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Unhealthy,
}

/// Decides the delay before the next probe iteration
///
/// One policy instance belongs to one probe loop, so implementations may
/// keep per-loop state in `&mut self`.
pub trait RetryPolicy: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Delay before the next iteration given the last outcome
    fn next_delay(&mut self, outcome: ProbeOutcome, interval: Duration) -> Duration;
}

/// Creates a fresh policy for each probe loop
pub type RetryPolicyFactory = Arc<dyn Fn() -> Box<dyn RetryPolicy> + Send + Sync>;

/// Factory for the default fixed-interval policy
pub fn fixed_interval() -> RetryPolicyFactory {
    Arc::new(|| Box::new(FixedInterval))
}

/// Probe every interval regardless of outcome
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedInterval;

impl RetryPolicy for FixedInterval {
    fn name(&self) -> &str {
        "fixed"
    }

    fn next_delay(&mut self, _outcome: ProbeOutcome, interval: Duration) -> Duration {
        interval
    }
}

/// Double the delay on each consecutive failure, up to `max`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max: Duration,
    failures: u32,
}

impl ExponentialBackoff {
    pub fn new(max: Duration) -> Self {
        Self { max, failures: 0 }
    }

    pub fn factory(max: Duration) -> RetryPolicyFactory {
        Arc::new(move || Box::new(Self::new(max)))
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn name(&self) -> &str {
        "exponential"
    }

    fn next_delay(&mut self, outcome: ProbeOutcome, interval: Duration) -> Duration {
        match outcome {
            ProbeOutcome::Healthy => {
                self.failures = 0;
                interval
            }
            ProbeOutcome::Unhealthy => {
                let factor = 1u32.checked_shl(self.failures).unwrap_or(u32::MAX);
                self.failures = self.failures.saturating_add(1);
                interval
                    .checked_mul(factor)
                    .unwrap_or(self.max)
                    .min(self.max.max(interval))
            }
        }
    }
}

/// Stop hammering a dead peer after `threshold` consecutive failures
///
/// While open, the loop waits `cooldown` between attempts; a single
/// healthy outcome closes the circuit again.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    failures: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            failures: 0,
        }
    }

    pub fn factory(threshold: u32, cooldown: Duration) -> RetryPolicyFactory {
        Arc::new(move || Box::new(Self::new(threshold, cooldown)))
    }

    pub fn is_open(&self) -> bool {
        self.failures >= self.threshold
    }
}

impl RetryPolicy for CircuitBreaker {
    fn name(&self) -> &str {
        "circuit-breaker"
    }

    fn next_delay(&mut self, outcome: ProbeOutcome, interval: Duration) -> Duration {
        match outcome {
            ProbeOutcome::Healthy => {
                self.failures = 0;
                interval
            }
            ProbeOutcome::Unhealthy => {
                self.failures = self.failures.saturating_add(1);
                if self.is_open() {
                    self.cooldown.max(interval)
                } else {
                    interval
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn test_fixed_interval() {
        let mut policy = FixedInterval;
        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), INTERVAL);
        assert_eq!(policy.next_delay(ProbeOutcome::Healthy, INTERVAL), INTERVAL);
    }

    #[test]
    fn test_exponential_backoff_grows_and_resets() {
        let mut policy = ExponentialBackoff::new(Duration::from_millis(500));

        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), Duration::from_millis(100));
        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), Duration::from_millis(200));
        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), Duration::from_millis(400));
        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), Duration::from_millis(500));
        assert_eq!(policy.consecutive_failures(), 4);

        assert_eq!(policy.next_delay(ProbeOutcome::Healthy, INTERVAL), INTERVAL);
        assert_eq!(policy.consecutive_failures(), 0);
    }

    #[test]
    fn test_exponential_backoff_saturates() {
        let mut policy = ExponentialBackoff::new(Duration::from_secs(60));
        for _ in 0..100 {
            policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL);
        }
        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), Duration::from_secs(60));
    }

    #[test]
    fn test_circuit_breaker_opens_and_closes() {
        let cooldown = Duration::from_secs(5);
        let mut policy = CircuitBreaker::new(3, cooldown);

        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), INTERVAL);
        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), INTERVAL);
        assert!(!policy.is_open());
        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), cooldown);
        assert!(policy.is_open());
        // Half-open attempt failed: stay open
        assert_eq!(policy.next_delay(ProbeOutcome::Unhealthy, INTERVAL), cooldown);

        assert_eq!(policy.next_delay(ProbeOutcome::Healthy, INTERVAL), INTERVAL);
        assert!(!policy.is_open());
    }

    #[test]
    fn test_factories_build_independent_policies() {
        let factory = ExponentialBackoff::factory(Duration::from_secs(1));
        let mut a = factory();
        let mut b = factory();

        a.next_delay(ProbeOutcome::Unhealthy, INTERVAL);
        a.next_delay(ProbeOutcome::Unhealthy, INTERVAL);
        assert_eq!(b.next_delay(ProbeOutcome::Unhealthy, INTERVAL), INTERVAL);
        assert_eq!(fixed_interval()().name(), "fixed");
    }
}
