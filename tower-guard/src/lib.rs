//! # Tower Guard
//!
//! `tower-guard` is a request-admission guard for the
//! [Tower](https://github.com/tower-rs/tower) ecosystem. It does two independent
//! jobs per request:
//!
//! 1. **Admission**: each client's average request spacing is estimated with
//!    [`decay_limit::DecayEstimator`]. Clients arriving faster than allowed are
//!    rejected with `GuardError::RateLimited` before the handler runs.
//! 2. **Execution Timeout**: the handler runs on its own task, raced against a
//!    deadline. If the deadline wins, the caller gets `GuardError::Timeout`
//!    while the handler finishes undisturbed in the background. A panicking
//!    handler becomes `GuardError::Aborted` instead of taking the caller down.
//!
//! [`ManagedGuardLayer`] composes both from a [`GuardConfig`]. Clients are
//! identified by a [`KeyResolver`], usually a closure over the request.
//!
//! ## Feature Flags
//!
//! - `axum`: Enables `IntoResponse` for [`GuardError`] (429, 408, 500), the
//!   `RealIp` key resolver, and `GuardConfig::body_limit`.

mod config;
mod error;
mod execution;
mod guard;
mod layer;
mod managed_layer;
mod resolver;
mod service;
mod utils;


pub use config::GuardConfig;
pub use error::GuardError;
pub use execution::ExecutionLayer;
pub use execution::ExecutionService;
pub use guard::ExecutionGuard;
pub use guard::RunError;
pub use layer::AdmissionLayer;
pub use managed_layer::ManagedGuardLayer;
#[cfg(feature = "axum")]
pub use resolver::RealIp;
pub use resolver::KeyResolver;
pub use service::AdmissionService;
pub use utils::ServiceBuilderExt;
pub use utils::make_guarded_svc;
