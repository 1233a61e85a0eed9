//! Stop reason emitters.
//!
//! An emitter is a one-shot async function that receives an [`Intake`] and
//! calls it whenever it decides the process should stop. The dispatcher runs
//! every emitter on its own task.

mod signal;

pub use signal::{KillerSignalEmitter, OsSignalListener, SignalEmitter, SignalListener};

use crate::dispatcher::Intake;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use tokio::task::JoinHandle;

/// A source of stop reasons.
pub struct Emitter(Box<dyn FnOnce(Intake) -> BoxFuture<'static, ()> + Send>);

impl Emitter {
    /// Build an emitter from an async function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Intake) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Box::new(move |intake| Box::pin(f(intake))))
    }

    /// Start the emitter on its own task.
    pub(crate) fn spawn(self, intake: Intake) -> JoinHandle<()> {
        tokio::spawn((self.0)(intake))
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}
