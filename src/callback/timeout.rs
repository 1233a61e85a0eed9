//! Shutdown watchdog.

use crate::callback::Callback;
use crate::process::{FORCED_EXIT_STATUS, SharedTerminator, Terminator};
use std::time::Duration;
use tracing::error;

/// Callback that arms a timer and force-exits the process when it fires.
///
/// Invoking the callback returns immediately. The timer is never disarmed:
/// if the process is still alive when it elapses, it is terminated even if
/// every other callback already finished. Register it with a high priority
/// so it is armed before slow callbacks run.
#[derive(Debug, Clone)]
pub struct TimeoutGuard {
    duration: Duration,
    terminator: SharedTerminator,
}

impl TimeoutGuard {
    /// Guard that exits the process after `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            terminator: SharedTerminator::default(),
        }
    }

    /// Replace the exit primitive.
    pub fn with_terminator(mut self, terminator: impl Terminator) -> Self {
        self.terminator = SharedTerminator::new(terminator);
        self
    }

    /// Configured duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start the timer on its own task.
    pub fn arm(&self) {
        let duration = self.duration;
        let terminator = self.terminator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            error!("Shutdown timeout exceeded {}", humantime::format_duration(duration));
            terminator.terminate(FORCED_EXIT_STATUS);
        });
    }

    /// Turn the guard into a shutdown callback.
    pub fn into_callback(self) -> Callback {
        Callback::new(move |_| {
            self.arm();
            async { Ok(()) }
        })
    }
}

impl From<TimeoutGuard> for Callback {
    fn from(guard: TimeoutGuard) -> Self {
        guard.into_callback()
    }
}
