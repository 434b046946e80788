use std::time::Duration;

/// Weight given to the most recent gap when updating an estimate.
pub const DECAY_FACTOR: f64 = 0.010;

/// Multiple of the minimum interval a new client is seeded with.
pub const BURST_FACTOR: f64 = 1.200;

/// Generations never rotate more often than this.
pub const MIN_EPOCH: Duration = Duration::from_secs(10 * 60);

/// Upper bound on the epoch, keeping deadlines representable on any clock.
pub const MAX_EPOCH: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Immutable estimator settings.
///
/// A zero `min_interval` disables rate estimation altogether.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimatorConfig {
    min_interval: Duration,
    epoch_length: Duration,
}

impl EstimatorConfig {
    /// Creates a config allowing, on average, one request per `min_interval`.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            epoch_length: epoch_length_for(min_interval),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.min_interval.is_zero()
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Minimum interval in seconds, the unit estimates are kept in.
    pub fn min_interval_secs(&self) -> f64 {
        self.min_interval.as_secs_f64()
    }

    /// How long a generation stays current before it is rotated out.
    pub fn epoch_length(&self) -> Duration {
        self.epoch_length
    }

    /// Estimate assigned to a client with no recorded history.
    pub fn seed_interval(&self) -> f64 {
        BURST_FACTOR * self.min_interval_secs()
    }
}

// The epoch must be long enough for an over-limit estimate to decay back to
// `min_interval` before its history can be rotated away.
fn epoch_length_for(min_interval: Duration) -> Duration {
    let secs = min_interval.as_secs_f64() * (BURST_FACTOR + DECAY_FACTOR - 1.0) / DECAY_FACTOR;
    Duration::try_from_secs_f64(secs)
        .unwrap_or(MAX_EPOCH)
        .clamp(MIN_EPOCH, MAX_EPOCH)
}
