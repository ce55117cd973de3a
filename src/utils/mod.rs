//! Utility modules for logging and fault tolerance

pub mod logging;
pub mod timeout;

pub use logging::{init_logging, init_logging_from_config};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use timeout::{with_custom_timeout, DEFAULT_STARTUP_TIMEOUT};
