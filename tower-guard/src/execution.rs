use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use opentelemetry::global;
use opentelemetry::metrics::Counter;
use tower::BoxError;
use tower::Layer;
use tower::Service;

use crate::GuardError;
use crate::guard::ExecutionGuard;
use crate::guard::RunError;
use crate::resolver::KeyResolver;

#[derive(Clone, Debug)]
struct ExecutionServiceMetrics {
    timed_out: Counter<u64>,
    aborted: Counter<u64>,
}

/// Bounds the time the inner service may take to respond.
///
/// See [`ExecutionGuard`] for the timeout semantics.
#[derive(Clone, Debug)]
pub struct ExecutionLayer<K> {
    guard: ExecutionGuard,
    resolver: K,
}

impl<K> ExecutionLayer<K> {
    /// A zero `timeout` leaves the inner service unbounded.
    pub fn new(timeout: Duration, resolver: K) -> Self {
        Self {
            guard: ExecutionGuard::new(timeout),
            resolver,
        }
    }
}

impl<K, S> Layer<S> for ExecutionLayer<K>
where
    K: Clone,
{
    type Service = ExecutionService<K, S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExecutionService::new(inner, self.guard, self.resolver.clone())
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionService<K, S> {
    inner: S,
    guard: ExecutionGuard,
    resolver: K,
    instruments: ExecutionServiceMetrics,
}

impl<K, S> ExecutionService<K, S> {
    pub fn new(inner: S, guard: ExecutionGuard, resolver: K) -> Self {
        let meter = global::meter("execution_service");
        let instruments = ExecutionServiceMetrics {
            timed_out: meter.u64_counter("timed_out").build(),
            aborted: meter.u64_counter("aborted").build(),
        };

        Self {
            inner,
            guard,
            resolver,
            instruments,
        }
    }
}

impl<K, S, Req> Service<Req> for ExecutionService<K, S>
where
    K: KeyResolver<Req>,
    S: Service<Req, Error = BoxError>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // Only a timeout needs to name the client
        let key = self
            .guard
            .is_enabled()
            .then(|| self.resolver.resolve(&req))
            .unwrap_or_default();
        let handler = self.inner.call(req);
        let guard = self.guard;
        let instruments = self.instruments.clone();

        Box::pin(async move {
            guard.run(handler).await.map_err(|err| match err {
                RunError::Handler(err) => err,
                RunError::Aborted(msg) => {
                    instruments.aborted.add(1, &[]);
                    BoxError::from(GuardError::Aborted(msg))
                }
                RunError::Elapsed(_) => {
                    instruments.timed_out.add(1, &[]);
                    BoxError::from(GuardError::Timeout { key })
                }
            })
        })
    }
}
