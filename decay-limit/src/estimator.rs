use std::ops::ControlFlow;
use std::time::Duration;

use parking_lot::Mutex;
use quanta::Clock;
use quanta::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::DECAY_FACTOR;
use crate::EstimatorConfig;
use crate::Reason;
use crate::Strategy;
use crate::generation::DecayState;
use crate::generation::Generations;

/// Outcome of accounting a single request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decision {
    pub allowed: bool,
    /// Updated estimate of the client's request spacing, in seconds.
    pub estimated_interval: f64,
    /// Silence needed before the next request would be admitted.
    /// Zero when the request was allowed.
    pub retry_after: Duration,
    /// The client was within its limit before this request and is not now.
    pub newly_limited: bool,
}

impl Decision {
    fn unlimited() -> Self {
        Self {
            allowed: true,
            estimated_interval: f64::INFINITY,
            retry_after: Duration::ZERO,
            newly_limited: false,
        }
    }
}

#[derive(Debug)]
struct LimiterState {
    generations: Generations,
    epoch_deadline: Instant,
}

/// Per-client decayed interval rate estimator.
///
/// Every request updates the client's estimate as
/// `DECAY_FACTOR * elapsed + (1 - DECAY_FACTOR) * previous`, and the request is
/// admitted while the estimate stays at or above the minimum interval.
#[derive(Debug)]
pub struct DecayEstimator {
    config: EstimatorConfig,
    clock: Clock,
    /// `None` when rate estimation is disabled.
    state: Option<Mutex<LimiterState>>,
}

impl DecayEstimator {
    /// Creates an estimator allowing, on average, one request per
    /// `min_interval` from each client. A zero interval admits everything.
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Clock::new())
    }

    pub fn with_clock(min_interval: Duration, clock: Clock) -> Self {
        let config = EstimatorConfig::new(min_interval);
        let state = config.is_enabled().then(|| {
            info!(
                min_interval = ?config.min_interval(),
                epoch_length = ?config.epoch_length(),
                "creating decay rate estimator"
            );
            Mutex::new(LimiterState {
                generations: Generations::default(),
                epoch_deadline: deadline_after(clock.now(), config.epoch_length()),
            })
        });

        Self {
            config,
            clock,
            state,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    /// Accounts a request from `key` arriving now.
    pub fn admit(&self, key: &str) -> Decision {
        self.admit_at(key, self.clock.now())
    }

    /// Accounts a request from `key` arriving at `now`.
    pub fn admit_at(&self, key: &str, now: Instant) -> Decision {
        let Some(state) = &self.state else {
            return Decision::unlimited();
        };
        let min_interval = self.config.min_interval_secs();

        let (prior, estimated_interval, rotated) = {
            let mut state = state.lock();

            let prior = state.generations.lookup(key);
            let estimated_interval = match prior {
                Some(prior) => {
                    let elapsed = now
                        .checked_duration_since(prior.last_seen)
                        .unwrap_or_default();
                    DECAY_FACTOR * elapsed.as_secs_f64()
                        + (1.0 - DECAY_FACTOR) * prior.estimated_interval
                }
                None => self.config.seed_interval(),
            };

            let rotated = now > state.epoch_deadline;
            if rotated {
                state.generations.rotate();
                state.epoch_deadline = deadline_after(now, self.config.epoch_length());
            }

            state.generations.record(
                key,
                DecayState {
                    estimated_interval,
                    last_seen: now,
                },
            );
            (prior, estimated_interval, rotated)
        };

        if rotated {
            debug!("rotated rate estimator generations");
        }

        let allowed = estimated_interval >= min_interval;
        let newly_limited =
            !allowed && prior.is_some_and(|prior| prior.estimated_interval >= min_interval);
        if newly_limited {
            warn!(
                key = %key,
                estimated_interval,
                min_interval,
                "client exceeded allowed request rate"
            );
        }

        let retry_after = if allowed {
            Duration::ZERO
        } else {
            // Gap g such that DECAY_FACTOR * g + (1 - DECAY_FACTOR) * estimate == min_interval
            let gap = (min_interval - (1.0 - DECAY_FACTOR) * estimated_interval) / DECAY_FACTOR;
            Duration::try_from_secs_f64(gap.max(0.0)).unwrap_or(Duration::MAX)
        };

        Decision {
            allowed,
            estimated_interval,
            retry_after,
            newly_limited,
        }
    }

    /// Number of distinct clients currently remembered.
    pub fn tracked_clients(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |state| state.lock().generations.len())
    }

    #[cfg(test)]
    pub(crate) fn epoch_deadline(&self) -> Option<Instant> {
        self.state.as_ref().map(|state| state.lock().epoch_deadline)
    }
}

// Falls back to an immediate deadline instead of panicking on overflow.
fn deadline_after(now: Instant, epoch_length: Duration) -> Instant {
    now.checked_add(epoch_length).unwrap_or(now)
}

impl Strategy for DecayEstimator {
    fn process(&self, key: &str) -> ControlFlow<Reason> {
        let decision = self.admit(key);
        if decision.allowed {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Reason::TooFrequent {
                estimated_interval: Duration::try_from_secs_f64(decision.estimated_interval)
                    .unwrap_or_default(),
                retry_after: decision.retry_after,
            })
        }
    }
}
