//! Stop reasons.
//!
//! A [`Reason`] says why shutdown was triggered. Emitters produce one and the
//! dispatcher passes it to the reason handler before running callbacks.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Why shutdown was triggered.
#[derive(Debug, Clone)]
pub enum Reason {
    /// An OS signal was received.
    Signal(Signal),
    /// A fatal error stopped the process.
    Error(Arc<anyhow::Error>),
    /// A plain text marker.
    Message(String),
    /// Any other value; use [`Reason::downcast_ref`] to inspect it.
    Custom(Arc<dyn CustomReason>),
}

/// A value that can travel as a [`Reason::Custom`].
///
/// Implemented for every `Debug + Send + Sync + 'static` type.
pub trait CustomReason: Any + fmt::Debug + Send + Sync {
    /// View the value as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T> CustomReason for T
where
    T: Any + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reason {
    /// Wrap an arbitrary value.
    pub fn custom<T>(value: T) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
    {
        Reason::Custom(Arc::new(value))
    }

    /// The signal, if this reason is one.
    pub fn as_signal(&self) -> Option<Signal> {
        match self {
            Reason::Signal(signal) => Some(*signal),
            _ => None,
        }
    }

    /// The error, if this reason is one.
    pub fn as_error(&self) -> Option<&anyhow::Error> {
        match self {
            Reason::Error(err) => Some(err),
            _ => None,
        }
    }

    /// The text, if this reason is a message.
    pub fn as_message(&self) -> Option<&str> {
        match self {
            Reason::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Downcast a custom reason to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Reason::Custom(value) => CustomReason::as_any(&**value).downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Signal(signal) => write!(f, "{}", signal),
            Reason::Error(err) => write!(f, "{}", err),
            Reason::Message(message) => f.write_str(message),
            Reason::Custom(value) => write!(f, "{:?}", value),
        }
    }
}

impl From<Signal> for Reason {
    fn from(signal: Signal) -> Self {
        Reason::Signal(signal)
    }
}

impl From<anyhow::Error> for Reason {
    fn from(err: anyhow::Error) -> Self {
        Reason::Error(Arc::new(err))
    }
}

impl From<&str> for Reason {
    fn from(message: &str) -> Self {
        Reason::Message(message.to_string())
    }
}

impl From<String> for Reason {
    fn from(message: String) -> Self {
        Reason::Message(message)
    }
}

/// Termination signals the emitters can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// SIGINT, usually Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGHUP.
    Hangup,
    /// SIGQUIT.
    Quit,
    /// SIGUSR1.
    User1,
    /// SIGUSR2.
    User2,
}

impl Signal {
    /// Signals subscribed to when none are configured.
    pub const DEFAULT: [Signal; 2] = [Signal::Interrupt, Signal::Terminate];

    /// Conventional name, e.g. `SIGINT`.
    pub fn name(self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Hangup => "SIGHUP",
            Signal::Quit => "SIGQUIT",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }

    /// The matching tokio signal kind.
    #[cfg(unix)]
    pub fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::Quit => SignalKind::quit(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
