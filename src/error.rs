//! Error taxonomy for the monitor core.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the mail service.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure: connect, timeout, or body decode.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("server returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },
}

/// Errors surfaced by monitor operations.
///
/// None of these are fatal: every failure leaves the monitor in its prior
/// valid state, with the last-known-good snapshot intact.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Configuration attempted with a blank email or password.
    #[error("email and password are both required")]
    MissingFields,

    /// A fetch was attempted without an active session.
    #[error("no account configured")]
    NotConfigured,

    /// A search was attempted with a blank term.
    #[error("search term must not be empty")]
    EmptyTerm,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
