//! Forced process termination.
//!
//! The timeout guard and the killer signal emitter both end the process
//! directly instead of reporting through the callback error path. They do it
//! through a [`Terminator`] so that tests can observe the call instead of
//! losing the test process.

use std::fmt;
use std::sync::Arc;

/// Exit status used whenever shutdown is forced.
pub const FORCED_EXIT_STATUS: i32 = 1;

/// Ends the process with a status code.
///
/// Production implementations never return. Test doubles may record the
/// status and return normally.
pub trait Terminator: Send + Sync + 'static {
    /// Terminate with the given exit status.
    fn terminate(&self, status: i32);
}

impl<F> Terminator for F
where
    F: Fn(i32) + Send + Sync + 'static,
{
    fn terminate(&self, status: i32) {
        self(status)
    }
}

/// Terminator backed by [`std::process::exit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, status: i32) {
        tracing::warn!(status, "forcing process exit");
        std::process::exit(status);
    }
}

/// Shared handle to a terminator.
#[derive(Clone)]
pub struct SharedTerminator(Arc<dyn Terminator>);

impl SharedTerminator {
    /// Wrap a terminator for sharing across tasks.
    pub fn new(terminator: impl Terminator) -> Self {
        Self(Arc::new(terminator))
    }

    /// Terminate with the given exit status.
    pub fn terminate(&self, status: i32) {
        self.0.terminate(status);
    }
}

impl Default for SharedTerminator {
    fn default() -> Self {
        Self::new(ProcessExit)
    }
}

impl fmt::Debug for SharedTerminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTerminator").finish_non_exhaustive()
    }
}
