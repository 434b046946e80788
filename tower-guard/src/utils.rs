use std::sync::Arc;
use std::time::Duration;

use tower::BoxError;
use tower::Layer;
use tower::Service;
use tower::ServiceBuilder;
use tower::layer::util::Stack;
use tower::util::BoxCloneSyncService;

use decay_limit::Strategy;

use crate::AdmissionLayer;
use crate::ExecutionLayer;
use crate::GuardConfig;
use crate::KeyResolver;
use crate::ManagedGuardLayer;

/// Guard a service with admission and an execution timeout taken from `config`
pub fn make_guarded_svc<K, V, Req, Resp>(
    config: GuardConfig,
    resolver: K,
    svc: V,
) -> BoxCloneSyncService<Req, Resp, BoxError>
where
    K: KeyResolver<Req> + Clone + Send + Sync + 'static,
    Req: Send + 'static,
    Resp: Send + 'static,
    V: Service<Req, Response = Resp, Error = BoxError> + Clone + Send + Sync + 'static,
    <V as Service<Req>>::Future: Send,
{
    ManagedGuardLayer::new(config, resolver).layer(svc)
}

/// Service Builder Extension with additional useful functions for tower::ServiceBuilder.
pub trait ServiceBuilderExt<L> {
    /// Add a per-client admission layer
    fn admission<K>(
        self,
        limiter: Arc<dyn Strategy + Send + Sync + 'static>,
        resolver: K,
    ) -> ServiceBuilder<Stack<AdmissionLayer<dyn Strategy + Send + Sync + 'static, K>, L>>;

    /// Add a soft execution timeout
    fn execution_timeout<K>(
        self,
        timeout: Duration,
        resolver: K,
    ) -> ServiceBuilder<Stack<ExecutionLayer<K>, L>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn admission<K>(
        self,
        limiter: Arc<dyn Strategy + Send + Sync + 'static>,
        resolver: K,
    ) -> ServiceBuilder<Stack<AdmissionLayer<dyn Strategy + Send + Sync + 'static, K>, L>> {
        self.layer(AdmissionLayer::new(limiter, resolver))
    }

    fn execution_timeout<K>(
        self,
        timeout: Duration,
        resolver: K,
    ) -> ServiceBuilder<Stack<ExecutionLayer<K>, L>> {
        self.layer(ExecutionLayer::new(timeout, resolver))
    }
}
