//! Timeout utilities for fault tolerance
//!
//! Provides timeout wrappers for module startup calls that might hang.
//!
//! **Default Timeout**: module startup falls back to 30 seconds. The host
//! configuration (`HostConfig::startup_timeout_seconds`) overrides it and
//! `0` disables the bound.

use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for a single module's startup call
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute operation with custom timeout
pub async fn with_custom_timeout<F, T>(
    operation: F,
    duration: Duration,
) -> Result<T, tokio::time::error::Elapsed>
where
    F: std::future::Future<Output = T>,
{
    timeout(duration, operation).await
}
