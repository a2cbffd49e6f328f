//! Application-wide constants for tuning and configuration
//!
//! Centralizes magic numbers to make them discoverable and configurable.

/// Default background refresh period in seconds.
/// Matches the reference polling cadence of the live monitor.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Request timeout in seconds for calls to the mail service.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default mail service endpoint when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
