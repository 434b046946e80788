//! # decay-limit
//!
//! `decay-limit` estimates, per client, the average spacing between requests and
//! rejects clients whose estimate drops below a configured minimum interval.
//!
//! ## Core Philosophy
//!
//! Counting requests in windows punishes the client that happens to straddle a
//! boundary. `decay-limit` instead keeps an exponentially-decayed estimate of each
//! client's inter-arrival interval. A new client starts with a generous seed
//! (`BURST_FACTOR * min_interval`) and every request nudges the estimate towards
//! the gap that just elapsed (weighted by `DECAY_FACTOR`).
//!
//! ## Key Concepts
//!
//! * **Decayed Interval**: `k * elapsed + (1 - k) * previous_estimate`.
//! * **Two Generations**: per-client state lives in a "current" and a
//!   "previous" table which rotate every epoch. Memory is bounded by the number
//!   of distinct clients seen in two epochs; no size based eviction is needed.
//! * **Single Lock**: one mutex serializes every update. It is held for a
//!   constant amount of work and never across a handler.
//! * **Strategy Trait**: a keyed interface for the middleware to consume.
//!
//! ## Example
//!
//! ```rust
//! use decay_limit::DecayEstimator;
//! use decay_limit::Strategy;
//! use std::time::Duration;
//!
//! // Allow, on average, one request per 100ms per client.
//! let estimator = DecayEstimator::new(Duration::from_millis(100));
//!
//! if estimator.process("10.0.0.1").is_continue() {
//!     // Request allowed
//! }
//! ```

use std::fmt::Debug;
use std::ops::ControlFlow;
use std::time::Duration;

mod config;
mod estimator;
mod generation;

pub use config::BURST_FACTOR;
pub use config::DECAY_FACTOR;
pub use config::EstimatorConfig;
pub use config::MAX_EPOCH;
pub use config::MIN_EPOCH;
pub use estimator::DecayEstimator;
pub use estimator::Decision;

/// Reasons why a request might be rejected by a strategy.
#[derive(Debug, PartialEq)]
pub enum Reason {
    /// The client is, on average, arriving faster than permitted.
    TooFrequent {
        estimated_interval: Duration,
        retry_after: Duration,
    },
}

/// The core trait for keyed rate-limiting algorithms.
///
/// Strategies are shared across tasks via `Arc`, so implementations should be
/// `Send` and `Sync`.
pub trait Strategy: Debug {
    /// Accounts a single request from `key`.
    ///
    /// # Errors
    ///
    /// Returns `Reason` if the client has exceeded its allowed rate.
    fn process(&self, key: &str) -> ControlFlow<Reason>;
}
