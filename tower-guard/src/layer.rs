use std::sync::Arc;

use decay_limit::Strategy;
use tower::Layer;

use crate::service::AdmissionService;

/// Applies per-client admission to requests.
#[derive(Debug)]
pub struct AdmissionLayer<L, K>
where
    L: ?Sized,
{
    limiter: Arc<L>,
    resolver: K,
}

impl<L, K> Clone for AdmissionLayer<L, K>
where
    L: ?Sized,
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            resolver: self.resolver.clone(),
        }
    }
}

impl<L, K> AdmissionLayer<L, K>
where
    L: Strategy + ?Sized,
{
    /// Create an AdmissionLayer
    ///
    /// Every service produced by this layer shares `limiter`, so a client is
    /// accounted once no matter which clone handles its request.
    pub fn new(limiter: Arc<L>, resolver: K) -> Self {
        AdmissionLayer { limiter, resolver }
    }
}

impl<L, K, S> Layer<S> for AdmissionLayer<L, K>
where
    L: ?Sized,
    K: Clone,
{
    type Service = AdmissionService<L, K, S>;

    fn layer(&self, service: S) -> Self::Service {
        AdmissionService::new(service, self.limiter.clone(), self.resolver.clone())
    }
}
