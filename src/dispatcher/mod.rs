//! Stop reason rendezvous, callback registry and the dispatcher itself.

mod dispatch;
mod errors;
mod registry;
mod rendezvous;

pub use dispatch::{Dispatcher, DispatcherBuilder};
pub use errors::ErrorList;
pub use registry::{CallbackHandle, CallbackRegistry};
pub use rendezvous::Intake;
