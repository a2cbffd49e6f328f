//! In-memory credential session.
//!
//! Credentials live only for the lifetime of the active session. They are
//! never written to disk and are dropped on reset or reconfiguration.

use crate::error::MonitorError;

/// Email/password pair passed through to the mail service on each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Session lifecycle: configured with credentials, or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Configured,
}

/// Holds the active credentials for the session, if any.
///
/// No correctness validation happens here; whether the credentials actually
/// work is decided by the mail service's response to the next fetch.
#[derive(Debug, Default)]
pub struct CredentialSession {
    credentials: Option<Credentials>,
}

impl CredentialSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a credential pair and move to Configured.
    ///
    /// Fails if either field is empty or whitespace-only.
    pub fn configure(&mut self, email: &str, password: &str) -> Result<(), MonitorError> {
        let email = email.trim();
        if email.is_empty() || password.trim().is_empty() {
            return Err(MonitorError::MissingFields);
        }
        self.credentials = Some(Credentials {
            email: email.to_string(),
            password: password.to_string(),
        });
        Ok(())
    }

    /// Drop the credentials and return to Unconfigured.
    pub fn reset(&mut self) {
        self.credentials = None;
    }

    pub fn current(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn state(&self) -> SessionState {
        if self.credentials.is_some() {
            SessionState::Configured
        } else {
            SessionState::Unconfigured
        }
    }
}
