//! Logging setup and test helpers.

mod logging;
#[cfg(test)]
pub(crate) mod test_support;

pub use logging::init_logging;
