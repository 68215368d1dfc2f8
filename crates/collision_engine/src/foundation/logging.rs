//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system, ignoring repeated initialization.
///
/// Useful in tests and host applications that cannot guarantee a single
/// initialization point.
pub fn try_init() {
    let _ = env_logger::try_init();
}
