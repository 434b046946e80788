use std::marker::PhantomData;
use std::sync::Arc;

use decay_limit::DecayEstimator;
use tower::BoxError;
use tower::Layer;
use tower::Service;
use tower::util::BoxCloneSyncService;

use crate::AdmissionLayer;
use crate::ExecutionLayer;
use crate::GuardConfig;
use crate::GuardError;
use crate::guard::ExecutionGuard;
use crate::resolver::KeyResolver;

/// A pre-composed admission and execution stack.
///
/// Requests pass through two independent checks, in order:
///
/// - **Admission (`GuardError::RateLimited`)**: the client's decayed request
///   interval is updated, and the request is rejected without reaching the
///   inner service if the client is arriving faster than allowed.
/// - **Execution (`GuardError::Timeout`)**: the inner service runs on its own
///   task against a deadline. A late handler is abandoned, not cancelled.
///
/// Any other inner error is converted into `GuardError::Inner`, and a
/// panicking handler into `GuardError::Aborted`, so callers only ever see
/// `GuardError`.
pub struct ManagedGuardLayer<K, Req> {
    estimator: Arc<DecayEstimator>,
    guard: ExecutionGuard,
    resolver: K,
    _phantom: PhantomData<fn(Req)>,
}

// Deriving Clone would demand Req: Clone.
impl<K, Req> Clone for ManagedGuardLayer<K, Req>
where
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            estimator: self.estimator.clone(),
            guard: self.guard,
            resolver: self.resolver.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<K, Req> ManagedGuardLayer<K, Req> {
    pub fn new(config: GuardConfig, resolver: K) -> Self {
        Self::with_estimator(Arc::new(config.estimator()), config.execution_guard(), resolver)
    }

    /// Builds the stack around an existing estimator, e.g. one shared with
    /// another router.
    pub fn with_estimator(
        estimator: Arc<DecayEstimator>,
        guard: ExecutionGuard,
        resolver: K,
    ) -> Self {
        Self {
            estimator,
            guard,
            resolver,
            _phantom: PhantomData,
        }
    }

    pub fn estimator(&self) -> &Arc<DecayEstimator> {
        &self.estimator
    }
}

impl<S, K, Req> Layer<S> for ManagedGuardLayer<K, Req>
where
    K: KeyResolver<Req> + Clone + Send + Sync + 'static,
    S: Service<Req, Error = BoxError> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Send + 'static,
{
    type Service = BoxCloneSyncService<Req, S::Response, BoxError>;

    fn layer(&self, inner: S) -> Self::Service {
        let svc = tower::ServiceBuilder::new()
            .map_err(|err: BoxError| {
                if err.is::<GuardError>() {
                    err
                } else {
                    // Wrap any other inner service errors
                    Box::from(GuardError::Inner(err.to_string()))
                }
            })
            .layer(AdmissionLayer::new(
                self.estimator.clone(),
                self.resolver.clone(),
            ))
            // The execution stage resolves the key again, and only when a
            // timeout is set, because `Req` has nowhere to carry the first result.
            .layer(ExecutionLayer::new(
                self.guard.timeout(),
                self.resolver.clone(),
            ))
            .service(inner);

        BoxCloneSyncService::new(svc)
    }
}
