//! Error taxonomy for one refresh cycle.
//!
//! The provider adapters report one of the `ProviderError` kinds; nothing
//! below the coordinator boundary is allowed to escape it. The coordinator
//! wraps whatever went wrong into a single `RefreshError` for the caller.

use core::fmt;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ProviderError {
    /// Bad credentials, auth endpoint failure, or missing token in the response.
    Authentication(String),
    /// Account/contract listing empty or missing the expected identifier.
    Resolution(String),
    /// Network-level failure (DNS, TLS, timeout) during data retrieval.
    Transport(String),
    /// Non-success HTTP status during data retrieval.
    Http { status: u16, message: String },
    /// Well-formed response but no reading found, or the fallback-date
    /// window was exhausted.
    NoData,
    /// Unexpected response shape: missing keys, wrong types, unparseable dates.
    Malformed(String),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Authentication(s) => write!(f, "authentication failed: {}", s),
            ProviderError::Resolution(s) => write!(f, "account resolution failed: {}", s),
            ProviderError::Transport(s) => write!(f, "transport error: {}", s),
            ProviderError::Http { status, message } => write!(f, "http {}: {}", status, message),
            ProviderError::NoData => write!(f, "no consumption data available"),
            ProviderError::Malformed(s) => write!(f, "malformed response: {}", s),
        }
    }
}

impl Error for ProviderError {}

/// The one failure signal that crosses the coordinator boundary.
///
/// Carries the underlying cause for logging; callers treat every cause the
/// same way (skip the cycle, keep the last cached reading).
#[derive(Debug)]
pub struct RefreshError(ProviderError);

impl RefreshError {
    pub fn cause(&self) -> &ProviderError {
        &self.0
    }
}

impl Display for RefreshError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "refresh failed: {}", self.0)
    }
}

impl Error for RefreshError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl From<ProviderError> for RefreshError {
    fn from(value: ProviderError) -> Self {
        RefreshError(value)
    }
}
