//! Fixed-interval polling with an injectable clock.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use forge_core::ForgeConfig;
use tracing::trace;

/// How many times to poll and how long to wait before each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &ForgeConfig) -> Self {
        Self {
            max_attempts: config.max_poll_attempts,
            interval: config.poll_interval(),
        }
    }
}

/// Source of delays. Production code sleeps on the tokio timer; tests
/// record the requested durations instead.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    Ready(T),
    Pending,
}

/// Result of a whole polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Done { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Call `check` up to `policy.max_attempts` times, sleeping
/// `policy.interval` before each call, until it reports a terminal value.
///
/// The check receives the 1-based attempt number.
pub async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    sleeper: &dyn Sleeper,
    mut check: F,
) -> PollOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PollStep<T>>,
{
    for attempt in 1..=policy.max_attempts {
        sleeper.sleep(policy.interval).await;
        match check(attempt).await {
            PollStep::Ready(value) => {
                return PollOutcome::Done {
                    value,
                    attempts: attempt,
                };
            }
            PollStep::Pending => trace!(attempt, "poll pending"),
        }
    }
    PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records every requested sleep and returns immediately.
    #[derive(Default)]
    pub struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn slept(&self) -> Vec<Duration> {
            self.slept.lock().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSleeper;
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn stops_at_first_terminal_value() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let outcome = poll_until(&PollPolicy::default(), &sleeper, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 4 {
                    PollStep::Ready("done")
                } else {
                    PollStep::Pending
                }
            }
        })
        .await;

        assert_eq!(
            outcome,
            PollOutcome::Done {
                value: "done",
                attempts: 4
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(5); 4]);
    }

    #[tokio::test]
    async fn exhausts_without_extra_check() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let outcome: PollOutcome<()> = poll_until(&PollPolicy::default(), &sleeper, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { PollStep::Pending }
        })
        .await;

        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 10 });
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(sleeper.slept().len(), 10);
    }

    #[tokio::test]
    async fn zero_attempts_never_checks() {
        let policy = PollPolicy {
            max_attempts: 0,
            interval: Duration::from_secs(1),
        };
        let sleeper = RecordingSleeper::default();
        let outcome: PollOutcome<()> =
            poll_until(&policy, &sleeper, |_| async { PollStep::Ready(()) }).await;
        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 0 });
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_advances_paused_clock() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(30)).await;
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[test]
    fn policy_from_config() {
        let config = ForgeConfig {
            max_poll_attempts: 3,
            poll_interval_secs: 7,
            ..Default::default()
        };
        let policy = PollPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.interval, Duration::from_secs(7));
    }
}
