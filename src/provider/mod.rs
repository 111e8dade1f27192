//! Provider adapters for the supported water utilities.
//!
//! Both utilities follow the same overall flow (authenticate, find the
//! account/section identifier, fetch the latest consumption figure) but
//! differ in every wire detail. The `ProviderAdapter` trait is the seam the
//! coordinator is written against; `eaudupic` and `saur` implement it.

pub mod eaudupic;
pub mod saur;

use crate::error::ProviderError;
use crate::reading::Reading;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// Per-request timeout applied to every provider call.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated session state, produced by `ProviderAdapter::authenticate`.
///
/// `expires_at` is only known for providers whose auth response carries an
/// `expires_in`; a session without one is treated as valid indefinitely.
/// `account_id` is filled in at auth time when the provider embeds it, or by
/// the coordinator after a separate resolution step.
#[derive(Debug, Clone)]
pub struct Session {
    pub bearer_token: String,
    pub expires_at: Option<Instant>,
    pub account_id: Option<String>,
}

impl Session {
    pub fn is_valid(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() < expires_at,
            None => true,
        }
    }
}

pub trait ProviderAdapter {
    /// Short provider name for logging.
    fn name(&self) -> &'static str;

    /// Exchange the stored credentials for a fresh session.
    fn authenticate(&self) -> Result<Session, ProviderError>;

    /// Discover the account/contract/section identifier for data requests.
    ///
    /// Only called when the session does not already carry one. Always
    /// re-queries the server; caching lives in the session.
    fn resolve_account(&self, session: &Session) -> Result<String, ProviderError>;

    /// Fetch the reading for `date`. `Ok(None)` means the provider answered
    /// but had nothing for that date, which is distinct from every error.
    fn fetch_reading(
        &self,
        session: &Session,
        account_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Reading>, ProviderError>;

    /// How many days back to probe when a date yields no reading. Zero means
    /// the provider ignores the date and a single request per cycle suffices.
    fn fallback_days(&self) -> u32;

    /// Polling cadence to use when the configuration does not override it.
    fn default_poll_interval(&self) -> Duration;
}

pub(crate) fn build_agent() -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build()
}

/// Decode a JSON response body, reporting the path to any offending field.
pub(crate) fn parse_json<T: DeserializeOwned>(resp: ureq::Response) -> Result<T, ProviderError> {
    let mut de = serde_json::Deserializer::from_reader(resp.into_reader());
    serde_path_to_error::deserialize(&mut de).map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Map a failed data-retrieval call onto the error taxonomy.
pub(crate) fn request_error(err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::Status(status, resp) => {
            let message = resp.into_string().unwrap_or_else(|_| String::from("<no body>"));
            ProviderError::Http { status, message }
        }
        ureq::Error::Transport(t) => ProviderError::Transport(t.to_string()),
    }
}

/// Render a failed call as text, for wrapping into auth/resolution errors.
pub(crate) fn describe_request_error(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_else(|_| String::from("<no body>"));
            format!("http {}: {}", status, body)
        }
        ureq::Error::Transport(t) => format!("transport error: {}", t),
    }
}

/// Parse the calendar-date component of an ISO-8601 date or datetime string,
/// discarding any time-of-day part ("2024-01-01", "2024-01-01T06:30:00" and
/// "2024-01-01 06:30:00" all yield 2024-01-01).
pub(crate) fn parse_iso_date(raw: &str) -> Result<NaiveDate, ProviderError> {
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| ProviderError::Malformed(format!("bad date {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn iso_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        assert_eq!(parse_iso_date("2024-01-01").expect("date"), expected);
        assert_eq!(parse_iso_date("2024-01-01T06:30:00").expect("date"), expected);
        assert_eq!(parse_iso_date("2024-01-01 06:30:00").expect("date"), expected);
    }

    #[test]
    fn iso_date_rejects_garbage() {
        assert!(parse_iso_date("yesterday").is_err());
        assert!(parse_iso_date("").is_err());
    }

    #[test]
    fn session_without_expiry_stays_valid() {
        let session = Session {
            bearer_token: "tok".into(),
            expires_at: None,
            account_id: None,
        };
        assert!(session.is_valid());
    }

    #[test]
    fn session_validity_follows_expiry() {
        let fresh = Session {
            bearer_token: "tok".into(),
            expires_at: Some(Instant::now() + Duration::from_secs(3600)),
            account_id: None,
        };
        assert!(fresh.is_valid());

        let expired = Session {
            bearer_token: "tok".into(),
            expires_at: Instant::now().checked_sub(Duration::from_secs(60)),
            account_id: None,
        };
        assert!(expired.expires_at.is_some(), "clock too close to boot for this test");
        assert!(!expired.is_valid());
    }
}
