//! stop-dispatcher - orderly process shutdown
//!
//! This crate provides:
//! - A one-shot rendezvous that accepts a stop reason from any number of emitters
//! - Priority-ordered shutdown callbacks with index-stable unregistration
//! - Aggregation of every callback failure into one composite error
//! - A timeout guard and a second-signal killer that force the process to exit

pub mod callback;
pub mod config;
pub mod dispatcher;
pub mod emitter;
pub mod handler;
pub mod process;
pub mod reason;
pub mod util;

pub use callback::{Callback, CommandHook, PriorityCallback, TimeoutGuard};
pub use config::Config;
pub use dispatcher::{CallbackHandle, Dispatcher, ErrorList, Intake};
pub use emitter::{Emitter, KillerSignalEmitter, SignalEmitter};
pub use reason::{Reason, Signal};
pub use tokio_util::sync::CancellationToken;
