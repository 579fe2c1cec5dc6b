//! Dedicated probe loop threads

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::retry::{ProbeOutcome, RetryPolicy};
use crate::types::CancellationToken;

/// Floor for the bounded join on shutdown
const MIN_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Bounded join wait for a loop probing every `interval`
pub fn join_timeout(interval: Duration) -> Duration {
    interval.saturating_mul(2).max(MIN_JOIN_TIMEOUT)
}

/// Shared count of live probe loops
///
/// Incremented before a loop thread starts, decremented when the thread
/// exits. Zero after shutdown means nothing leaked.
#[derive(Debug, Clone, Default)]
pub struct LoopCounter {
    active: Arc<AtomicUsize>,
}

impl LoopCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of probe loops currently alive
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn enter(&self) -> LoopGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        LoopGuard {
            active: self.active.clone(),
        }
    }
}

struct LoopGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cancels its token when dropped, so exit is signalled even on panic
struct ExitSignal(CancellationToken);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// One running probe loop
///
/// The loop runs `tick`, asks its retry policy for a delay, then sleeps on
/// its stop token. Stopping wakes it immediately.
pub struct ProbeLoop {
    name: String,
    interval: Duration,
    stop: CancellationToken,
    exited: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ProbeLoop {
    /// Spawn a named probe thread
    pub fn spawn<F>(
        name: impl Into<String>,
        interval: Duration,
        mut policy: Box<dyn RetryPolicy>,
        counter: &LoopCounter,
        mut tick: F,
    ) -> std::io::Result<Self>
    where
        F: FnMut() -> ProbeOutcome + Send + 'static,
    {
        let name = name.into();
        let stop = CancellationToken::new();
        let exited = CancellationToken::new();

        let guard = counter.enter();
        let loop_stop = stop.clone();
        let exit_signal = ExitSignal(exited.clone());

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                // Dropped in reverse order: the counter is decremented
                // before the exit signal fires
                let _exit_signal = exit_signal;
                let _guard = guard;

                while !loop_stop.is_cancelled() {
                    let outcome = tick();
                    let delay = policy.next_delay(outcome, interval);
                    if loop_stop.wait_timeout(delay) {
                        break;
                    }
                }
            })?;

        Ok(Self {
            name,
            interval,
            stop,
            exited,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the loop thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.exited.is_cancelled()
    }

    /// Signal the loop without waiting for it
    pub fn signal_stop(&self) {
        self.stop.cancel();
    }

    /// Signal the loop and join it, waiting at most `timeout`
    ///
    /// Returns `false` if the loop did not exit in time; the thread is then
    /// abandoned and will exit on its own once its current tick returns.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        self.stop.cancel();
        let Some(handle) = self.handle.take() else {
            return true;
        };

        if self.exited.wait_timeout(timeout) {
            let _ = handle.join();
            true
        } else {
            false
        }
    }

    /// `stop` with the default bound derived from the interval
    pub fn stop_default(&mut self) -> bool {
        self.stop(join_timeout(self.interval))
    }
}

impl Drop for ProbeLoop {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

impl std::fmt::Debug for ProbeLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeLoop")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::FixedInterval;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_loop_ticks_and_stops() {
        let counter = LoopCounter::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let seen = ticks.clone();

        let mut probe = ProbeLoop::spawn(
            "probe:test",
            Duration::from_millis(10),
            Box::new(FixedInterval),
            &counter,
            move || {
                seen.fetch_add(1, Ordering::SeqCst);
                ProbeOutcome::Healthy
            },
        )
        .unwrap();

        assert_eq!(counter.active(), 1);
        thread::sleep(Duration::from_millis(100));
        assert!(probe.is_running());

        assert!(probe.stop(Duration::from_secs(1)));
        assert!(!probe.is_running());
        assert_eq!(counter.active(), 0);
        assert!(ticks.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_stop_interrupts_long_sleep() {
        let counter = LoopCounter::new();
        let mut probe = ProbeLoop::spawn(
            "probe:sleepy",
            Duration::from_secs(3600),
            Box::new(FixedInterval),
            &counter,
            || ProbeOutcome::Healthy,
        )
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        assert!(probe.stop(Duration::from_secs(2)));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(counter.active(), 0);
    }

    #[test]
    fn test_stop_abandons_stuck_loop() {
        let counter = LoopCounter::new();
        let release = CancellationToken::new();
        let blocker = release.clone();

        let mut probe = ProbeLoop::spawn(
            "probe:stuck",
            Duration::from_millis(10),
            Box::new(FixedInterval),
            &counter,
            move || {
                blocker.wait();
                ProbeOutcome::Healthy
            },
        )
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        assert!(!probe.stop(Duration::from_millis(50)));

        // Once the tick returns the loop sees the stop signal and exits
        release.cancel();
        let deadline = Instant::now() + Duration::from_secs(2);
        while counter.active() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(counter.active(), 0);
    }

    #[test]
    fn test_join_timeout_bounds() {
        assert_eq!(join_timeout(Duration::from_millis(10)), Duration::from_secs(1));
        assert_eq!(join_timeout(Duration::from_secs(5)), Duration::from_secs(10));
    }
}
