use std::time::Duration;

/// Errors produced by the Tower Guard middleware stack.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuardError {
    /// The client is sending requests faster than its allowed rate.
    ///
    /// When the `axum` feature is enabled, this converts to `429 Too Many Requests`
    /// with a `Retry-After` header.
    #[error("Too many requests from {key}; retry after {retry_after:?}")]
    RateLimited {
        /// The resolved client key.
        key: String,
        /// The silence needed before the next request would be admitted.
        retry_after: Duration,
    },

    /// The handler did not complete before the execution deadline.
    ///
    /// The handler keeps running in the background; its result is discarded.
    /// When the `axum` feature is enabled, this converts to `408 Request Timeout`.
    #[error("Request from {key} timed out")]
    Timeout {
        /// The resolved client key.
        key: String,
    },

    /// The handler panicked. The string carries the panic message.
    ///
    /// When the `axum` feature is enabled, this converts to `500 Internal Server Error`.
    #[error("Handler aborted: {0}")]
    Aborted(String),

    /// An unexpected error occurred in the inner service.
    ///
    /// The string contains the `Display` representation of the inner error.
    /// When the `axum` feature is enabled, this converts to `500 Internal Server Error`.
    #[error("Internal service error: {0}")]
    Inner(String),
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for GuardError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, msg, headers) = match self {
            Self::Timeout { .. } => (StatusCode::REQUEST_TIMEOUT, self.to_string(), None),
            Self::RateLimited { retry_after, .. } => {
                let val = axum::http::HeaderValue::from(retry_after_secs(retry_after));
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    self.to_string(),
                    Some((axum::http::header::RETRY_AFTER, val)),
                )
            }
            Self::Aborted(_) | Self::Inner(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string(), None)
            }
        };

        let mut response = (status, msg).into_response();
        if let Some((name, value)) = headers {
            response.headers_mut().insert(name, value);
        }
        response
    }
}

/// Whole seconds for a `Retry-After` header, rounded up so that a client
/// waiting exactly that long is admitted.
#[cfg(feature = "axum")]
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}
