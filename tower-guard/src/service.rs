use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use opentelemetry::global;
use opentelemetry::metrics::Counter;
use pin_project_lite::pin_project;
use tower::BoxError;
use tower::Service;

use decay_limit::Reason;
use decay_limit::Strategy;

use crate::error::GuardError;
use crate::resolver::KeyResolver;

#[derive(Clone, Debug)]
struct AdmissionServiceMetrics {
    rate_limited: Counter<u64>,
}

/// Admits or rejects each request according to its client's rate.
///
/// Rejected requests never reach the inner service; they fail immediately
/// with [`GuardError::RateLimited`].
#[derive(Debug)]
pub struct AdmissionService<L, K, S>
where
    L: ?Sized,
{
    inner: S,
    limiter: Arc<L>,
    resolver: K,
    instruments: AdmissionServiceMetrics,
}

pin_project! {
    /// Either the inner service future, or an immediate rejection.
    #[project = ResponseFutureProj]
    pub enum ResponseFuture<F> {
        Admitted {
            #[pin]
            inner: F,
        },
        Rejected {
            error: GuardError,
        },
    }
}

impl<F, T> Future for ResponseFuture<F>
where
    F: Future<Output = Result<T, BoxError>>,
{
    type Output = Result<T, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ResponseFutureProj::Admitted { inner } => inner.poll(cx),
            ResponseFutureProj::Rejected { error } => Poll::Ready(Err(error.clone().into())),
        }
    }
}

impl<L, K, S> Clone for AdmissionService<L, K, S>
where
    L: ?Sized,
    K: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
            resolver: self.resolver.clone(),
            instruments: self.instruments.clone(),
        }
    }
}

impl<L, K, S, Req> Service<Req> for AdmissionService<L, K, S>
where
    L: Strategy + ?Sized,
    K: KeyResolver<Req>,
    S: Service<Req, Error = BoxError>,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Admission depends on the request's key, so it is decided in call()
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = self.resolver.resolve(&req);

        match self.limiter.process(&key) {
            ControlFlow::Continue(()) => ResponseFuture::Admitted {
                inner: self.inner.call(req),
            },
            ControlFlow::Break(Reason::TooFrequent { retry_after, .. }) => {
                self.instruments.rate_limited.add(1, &[]);
                ResponseFuture::Rejected {
                    error: GuardError::RateLimited { key, retry_after },
                }
            }
        }
    }
}

impl<L, K, S> AdmissionService<L, K, S>
where
    L: ?Sized,
{
    pub fn new(inner: S, limiter: Arc<L>, resolver: K) -> Self {
        let meter = global::meter("admission_service");
        let instruments = AdmissionServiceMetrics {
            rate_limited: meter.u64_counter("rate_limited").build(),
        };

        Self {
            inner,
            limiter,
            resolver,
            instruments,
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}
