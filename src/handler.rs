//! Reason handlers.
//!
//! A reason handler sees each received reason once, before any callback
//! runs. It is typically used to log why the process is stopping.

use crate::reason::Reason;
use std::sync::Arc;
use tracing::{error, info};

/// Hook invoked with the stop reason at the start of each cycle.
pub type ReasonHandler = Arc<dyn Fn(&Reason) + Send + Sync>;

/// Handler that ignores the reason.
pub fn noop() -> impl Fn(&Reason) + Send + Sync + 'static {
    |_: &Reason| {}
}

/// Handler that logs the reason according to its kind.
pub fn log() -> impl Fn(&Reason) + Send + Sync + 'static {
    |reason: &Reason| match reason {
        Reason::Signal(signal) => info!("received signal ({})", signal),
        Reason::Error(err) => error!("fatal error : {}", err),
        other => info!("stop reason {}", other),
    }
}
