use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::debug;

/// Why a guarded handler did not produce its own result.
#[derive(Debug, thiserror::Error)]
pub enum RunError<E> {
    /// The handler completed with an error of its own.
    #[error(transparent)]
    Handler(E),

    /// The handler panicked; carries the panic message.
    #[error("handler panicked: {0}")]
    Aborted(String),

    /// The deadline fired before the handler completed.
    #[error("handler exceeded deadline of {0:?}")]
    Elapsed(Duration),
}

/// Runs handlers against a soft deadline.
///
/// With a non-zero timeout the handler is spawned onto its own task and raced
/// against the deadline. If the deadline wins the caller gets
/// [`RunError::Elapsed`] straight away, while the handler is left to run to
/// completion in the background and its result is dropped. Panics inside the
/// handler are caught on the worker and surface as [`RunError::Aborted`].
///
/// A zero timeout runs the handler in place, without spawning.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutionGuard {
    timeout: Duration,
}

impl ExecutionGuard {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_enabled(&self) -> bool {
        !self.timeout.is_zero()
    }

    pub async fn run<F, T, E>(&self, handler: F) -> Result<T, RunError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        if !self.is_enabled() {
            return handler.await.map_err(RunError::Handler);
        }

        // A oneshot send never blocks, so an abandoned worker always finishes.
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(handler).catch_unwind().await {
                Ok(result) => result.map_err(RunError::Handler),
                Err(payload) => Err(RunError::Aborted(panic_message(payload.as_ref()))),
            };
            if tx.send(outcome).is_err() {
                debug!("discarding result of abandoned handler");
            }
        });

        match timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RunError::Aborted(
                "worker exited without reporting a result".to_string(),
            )),
            Err(_) => Err(RunError::Elapsed(self.timeout)),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
