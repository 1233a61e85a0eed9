//! OS signal emitters.

use crate::dispatcher::Intake;
use crate::emitter::Emitter;
use crate::process::{FORCED_EXIT_STATUS, SharedTerminator, Terminator};
use crate::reason::Signal;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Subscribes a channel to OS signals.
///
/// Deliveries that find the channel full are dropped.
pub trait SignalListener: Send + Sync + 'static {
    /// Start forwarding `signals` into `tx`.
    fn notify(&self, signals: &[Signal], tx: mpsc::Sender<Signal>) -> io::Result<()>;
}

/// Listener backed by `tokio::signal`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSignalListener;

impl SignalListener for OsSignalListener {
    #[cfg(unix)]
    fn notify(&self, signals: &[Signal], tx: mpsc::Sender<Signal>) -> io::Result<()> {
        use tokio::signal::unix::signal;

        for &sig in signals {
            let mut stream = signal(sig.kind())?;
            let tx = tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(sig) {
                        break;
                    }
                }
            });
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn notify(&self, signals: &[Signal], tx: mpsc::Sender<Signal>) -> io::Result<()> {
        interrupt_only(signals)?;

        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(Signal::Interrupt) {
                    break;
                }
            }
        });
        Ok(())
    }
}

/// Platforms without unix signals can only deliver Ctrl+C.
#[cfg(any(not(unix), test))]
fn interrupt_only(signals: &[Signal]) -> io::Result<()> {
    match signals.iter().find(|&&sig| sig != Signal::Interrupt) {
        Some(sig) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{} is not supported on this platform", sig.name()),
        )),
        None if signals.is_empty() => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "no supported signal requested",
        )),
        None => Ok(()),
    }
}

fn subscribe(
    listener: &dyn SignalListener,
    signals: &[Signal],
    capacity: usize,
) -> Option<mpsc::Receiver<Signal>> {
    let (tx, rx) = mpsc::channel(capacity);
    match listener.notify(signals, tx) {
        Ok(()) => {
            info!(signals = ?signals, "listening for stop signals");
            Some(rx)
        }
        Err(e) => {
            error!(error = %e, "failed to subscribe to signals");
            None
        }
    }
}

/// Forwards the first received signal as the stop reason.
#[derive(Clone)]
pub struct SignalEmitter {
    signals: Vec<Signal>,
    listener: Arc<dyn SignalListener>,
}

impl SignalEmitter {
    /// Listen for the given signals through the OS.
    pub fn new(signals: impl Into<Vec<Signal>>) -> Self {
        Self {
            signals: signals.into(),
            listener: Arc::new(OsSignalListener),
        }
    }

    /// Replace the signal source.
    pub fn with_listener(mut self, listener: impl SignalListener) -> Self {
        self.listener = Arc::new(listener);
        self
    }

    async fn run(self, intake: Intake) {
        let Some(mut rx) = subscribe(self.listener.as_ref(), &self.signals, 1) else {
            return;
        };

        if let Some(sig) = rx.recv().await {
            intake.stop(sig).await;
        }
    }
}

impl Default for SignalEmitter {
    fn default() -> Self {
        Self::new(Signal::DEFAULT)
    }
}

impl From<SignalEmitter> for Emitter {
    fn from(emitter: SignalEmitter) -> Self {
        Emitter::new(move |intake| emitter.run(intake))
    }
}

/// Forwards the first signal and force-exits on the second.
///
/// The second signal is honored even while the graceful shutdown started by
/// the first one is still running.
#[derive(Clone)]
pub struct KillerSignalEmitter {
    signals: Vec<Signal>,
    listener: Arc<dyn SignalListener>,
    terminator: SharedTerminator,
}

impl KillerSignalEmitter {
    /// Listen for the given signals through the OS.
    pub fn new(signals: impl Into<Vec<Signal>>) -> Self {
        Self {
            signals: signals.into(),
            listener: Arc::new(OsSignalListener),
            terminator: SharedTerminator::default(),
        }
    }

    /// Replace the signal source.
    pub fn with_listener(mut self, listener: impl SignalListener) -> Self {
        self.listener = Arc::new(listener);
        self
    }

    /// Replace the exit primitive.
    pub fn with_terminator(mut self, terminator: impl Terminator) -> Self {
        self.terminator = SharedTerminator::new(terminator);
        self
    }

    async fn run(self, intake: Intake) {
        let Some(mut rx) = subscribe(self.listener.as_ref(), &self.signals, 2) else {
            return;
        };

        let Some(first) = rx.recv().await else {
            return;
        };

        let terminator = self.terminator;
        tokio::spawn(async move {
            if let Some(second) = rx.recv().await {
                warn!(signal = %second, "received second stop signal, forcing exit");
                terminator.terminate(FORCED_EXIT_STATUS);
            }
        });

        intake.stop(first).await;
    }
}

impl Default for KillerSignalEmitter {
    fn default() -> Self {
        Self::new(Signal::DEFAULT)
    }
}

impl From<KillerSignalEmitter> for Emitter {
    fn from(emitter: KillerSignalEmitter) -> Self {
        Emitter::new(move |intake| emitter.run(intake))
    }
}
