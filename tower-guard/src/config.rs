use std::time::Duration;

use decay_limit::DecayEstimator;

use crate::guard::ExecutionGuard;

/// Settings for the managed guard stack.
///
/// Each setting is independent; leaving it at zero disables that feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GuardConfig {
    max_body_size: usize,
    rate_duration: Duration,
    exec_timeout: Duration,
}

impl GuardConfig {
    /// * `max_body_size` - byte ceiling for request bodies
    /// * `rate_duration` - minimum average spacing between requests from one client
    /// * `exec_timeout` - how long a handler may run before the caller gets a timeout
    pub fn new(max_body_size: usize, rate_duration: Duration, exec_timeout: Duration) -> Self {
        Self {
            max_body_size,
            rate_duration,
            exec_timeout,
        }
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub fn with_rate_duration(mut self, rate_duration: Duration) -> Self {
        self.rate_duration = rate_duration;
        self
    }

    pub fn with_exec_timeout(mut self, exec_timeout: Duration) -> Self {
        self.exec_timeout = exec_timeout;
        self
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn rate_duration(&self) -> Duration {
        self.rate_duration
    }

    pub fn exec_timeout(&self) -> Duration {
        self.exec_timeout
    }

    pub fn estimator(&self) -> DecayEstimator {
        DecayEstimator::new(self.rate_duration)
    }

    pub fn execution_guard(&self) -> ExecutionGuard {
        ExecutionGuard::new(self.exec_timeout)
    }

    /// The body-size wrapper, if a ceiling is configured.
    ///
    /// Bodies are limited outside of the managed stack, because the wrapper
    /// changes the request body type.
    #[cfg(feature = "axum")]
    pub fn body_limit(&self) -> Option<tower_http::limit::RequestBodyLimitLayer> {
        (self.max_body_size > 0)
            .then(|| tower_http::limit::RequestBodyLimitLayer::new(self.max_body_size))
    }
}
