//! Shutdown callbacks.

mod command;
mod timeout;

pub use command::CommandHook;
pub use timeout::TimeoutGuard;

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Priority used when none is given.
pub const DEFAULT_PRIORITY: i32 = 0;

type CallbackFn = dyn Fn(CancellationToken) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// A shutdown action.
///
/// Receives the shutdown token, which is cancelled once the dispatcher
/// finishes the cycle or the caller's parent token is cancelled. The token
/// may already be cancelled when the callback starts.
#[derive(Clone)]
pub struct Callback(Arc<CallbackFn>);

impl Callback {
    /// Build a callback from an async function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self(Arc::new(move |token| Box::pin(f(token))))
    }

    /// A callback that does nothing and succeeds.
    pub fn noop() -> Self {
        Self::new(|_| async { Ok(()) })
    }

    /// Run the callback.
    pub fn call(&self, token: CancellationToken) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.0)(token)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}

/// A callback paired with its priority. Higher runs earlier.
#[derive(Debug, Clone)]
pub struct PriorityCallback {
    pub priority: i32,
    pub callback: Callback,
}

impl PriorityCallback {
    pub fn new(priority: i32, callback: Callback) -> Self {
        Self { priority, callback }
    }
}

impl From<Callback> for PriorityCallback {
    fn from(callback: Callback) -> Self {
        Self::new(DEFAULT_PRIORITY, callback)
    }
}
