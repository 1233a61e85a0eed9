//! The shutdown dispatcher.

use crate::callback::{Callback, DEFAULT_PRIORITY, PriorityCallback};
use crate::dispatcher::errors::ErrorList;
use crate::dispatcher::registry::{CallbackHandle, CallbackRegistry};
use crate::dispatcher::rendezvous::{self, Intake, Receiver};
use crate::emitter::Emitter;
use crate::handler::{self, ReasonHandler};
use crate::reason::Reason;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Collects one stop reason per cycle and runs the registered callbacks.
///
/// Callbacks run sequentially, highest priority first, ties in registration
/// order. A failing callback never prevents the next one from running; all
/// failures are returned together from [`Dispatcher::wait`].
pub struct Dispatcher {
    intake: Intake,
    receiver: Receiver,
    registry: CallbackRegistry,
    reason_handler: ReasonHandler,
}

impl Dispatcher {
    /// Create a dispatcher with a no-op reason handler and no emitters.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Producer handle for this dispatcher.
    pub fn intake(&self) -> Intake {
        self.intake.clone()
    }

    /// Hand a stop reason to a pending [`Dispatcher::wait`].
    ///
    /// Stays pending until a wait call is ready to receive.
    pub async fn stop(&self, reason: impl Into<Reason>) {
        self.intake.stop(reason).await;
    }

    /// Spawn an emitter on its own task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register_emitter(&self, emitter: Emitter) {
        emitter.spawn(self.intake());
    }

    /// Spawn several emitters.
    pub fn register_emitters<I>(&self, emitters: I)
    where
        I: IntoIterator<Item = Emitter>,
    {
        for emitter in emitters {
            self.register_emitter(emitter);
        }
    }

    /// Register a callback at the default priority.
    pub fn register_callback(&self, callback: Callback) -> CallbackHandle {
        self.register_callback_with_priority(callback, DEFAULT_PRIORITY)
    }

    /// Register a callback. Higher priorities run earlier.
    pub fn register_callback_with_priority(
        &self,
        callback: Callback,
        priority: i32,
    ) -> CallbackHandle {
        self.registry.register(priority, callback)
    }

    /// Register callbacks at the default priority. They cannot be
    /// unregistered; use [`Dispatcher::register_callback`] for that.
    pub fn register_callbacks<I>(&self, callbacks: I)
    where
        I: IntoIterator<Item = Callback>,
    {
        self.registry.register_all(
            callbacks
                .into_iter()
                .map(|callback| (DEFAULT_PRIORITY, callback)),
        );
    }

    /// Register callbacks with explicit priorities.
    pub fn register_priority_callbacks<I>(&self, callbacks: I)
    where
        I: IntoIterator<Item = PriorityCallback>,
    {
        self.registry.register_all(
            callbacks
                .into_iter()
                .map(|pc| (pc.priority, pc.callback)),
        );
    }

    /// Number of live callbacks.
    pub fn callback_count(&self) -> usize {
        self.registry.len()
    }

    /// Wait for a stop reason and run every callback.
    ///
    /// The reason handler is called once before the first callback. Each
    /// callback receives a child of `parent`, cancelled when this call
    /// returns. Registrations that race with the snapshot may or may not be
    /// part of this cycle.
    pub async fn wait(&self, parent: &CancellationToken) -> Result<(), ErrorList> {
        let reason = self.receiver.recv().await;
        info!(reason = %reason, "stop reason received");
        (self.reason_handler)(&reason);

        let token = parent.child_token();
        let _guard = token.clone().drop_guard();

        let callbacks = self.registry.snapshot();
        debug!(callbacks = callbacks.len(), "running shutdown callbacks");

        let started = Instant::now();
        let mut errors = ErrorList::new();
        for (position, callback) in callbacks.iter().enumerate() {
            if let Err(err) = callback.call(token.clone()).await {
                warn!(position, error = %err, "shutdown callback failed");
                errors.push(err);
            }
        }

        info!(
            callbacks = callbacks.len(),
            failures = errors.len(),
            elapsed = ?started.elapsed(),
            "shutdown callbacks finished"
        );
        errors.into_result()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Construction-time options for a [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    reason_handler: Option<ReasonHandler>,
    emitters: Vec<Emitter>,
}

impl DispatcherBuilder {
    /// Hook called with each received reason before callbacks run.
    pub fn reason_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Reason) + Send + Sync + 'static,
    {
        self.reason_handler = Some(Arc::new(handler));
        self
    }

    /// Emitter spawned when the dispatcher is built.
    pub fn emitter(mut self, emitter: impl Into<Emitter>) -> Self {
        self.emitters.push(emitter.into());
        self
    }

    /// Several emitters spawned when the dispatcher is built.
    pub fn emitters<I>(mut self, emitters: I) -> Self
    where
        I: IntoIterator<Item = Emitter>,
    {
        self.emitters.extend(emitters);
        self
    }

    /// Build the dispatcher. Spawning emitters requires a tokio runtime.
    pub fn build(self) -> Dispatcher {
        let (intake, receiver) = rendezvous::channel();
        let dispatcher = Dispatcher {
            intake,
            receiver,
            registry: CallbackRegistry::new(),
            reason_handler: self
                .reason_handler
                .unwrap_or_else(|| Arc::new(handler::noop())),
        };
        dispatcher.register_emitters(self.emitters);
        dispatcher
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("reason_handler", &self.reason_handler.is_some())
            .field("emitters", &self.emitters.len())
            .finish()
    }
}
