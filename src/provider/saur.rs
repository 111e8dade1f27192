//! SAUR adapter.
//!
//! - `POST /admin/auth` with a password-grant style JSON body; the response
//!   carries the bearer token, its lifetime (`expires_in`, seconds) and the
//!   default section id, so no separate resolution request is needed.
//! - `GET /deli/section_subscription/{section}/consumptions/weekly` takes
//!   `year`/`month`/`day` query parameters and returns the consumption
//!   entries for the week containing that date.
//!
//! Meter telemetry is not reported same-day, so the adapter advertises a
//! seven-day fallback window for the coordinator to probe backwards.

use crate::error::ProviderError;
use crate::provider::{build_agent, describe_request_error, parse_iso_date, parse_json, request_error, ProviderAdapter, Session};
use crate::reading::Reading;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::time::{Duration, Instant};

const BASE_URL: &str = "https://apib2c.azure.saurclient.fr";
const CLIENT_ID: &str = "frontjs-client";
const SCOPE: &str = "api-scope";

pub struct Saur {
    agent: ureq::Agent,
    base_url: String,
    email: String,
    password: String,
}

impl Saur {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_base_url(email, password, BASE_URL)
    }

    pub fn with_base_url(email: impl Into<String>, password: impl Into<String>, base_url: impl Into<String>) -> Self {
        Saur {
            agent: build_agent(),
            base_url: base_url.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Deserialize)]
struct AuthResponse {
    token: TokenEnvelope,
    // Arrives as a number on some accounts and a string on others; both are
    // only ever interpolated into the consumption URL.
    #[serde(rename = "defaultSectionId")]
    default_section_id: serde_json::Value,
}

#[derive(Deserialize)]
struct TokenEnvelope {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct WeeklyConsumptions {
    #[serde(default)]
    consumptions: Vec<WeeklyEntry>,
}

#[derive(Deserialize)]
struct WeeklyEntry {
    value: serde_json::Number,
    #[serde(rename = "startDate")]
    start_date: String,
    #[serde(rename = "endDate")]
    end_date: String,
}

fn session_from_auth(body: AuthResponse) -> Result<Session, ProviderError> {
    let section_id = match &body.default_section_id {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(ProviderError::Authentication(format!(
                "unexpected defaultSectionId: {}",
                other
            )));
        }
    };
    Ok(Session {
        bearer_token: body.token.access_token,
        expires_at: Some(Instant::now() + Duration::from_secs(body.token.expires_in)),
        account_id: Some(section_id),
    })
}

/// First entry of the week's consumption list, or no data when the list is
/// empty (the coordinator then probes an earlier date).
fn extract_reading(body: WeeklyConsumptions) -> Result<Option<Reading>, ProviderError> {
    let Some(entry) = body.consumptions.into_iter().next() else {
        return Ok(None);
    };
    let period_start = parse_iso_date(&entry.start_date)?;
    let period_end = parse_iso_date(&entry.end_date)?;
    Reading::new(entry.value, period_start, period_end).map(Some)
}

impl ProviderAdapter for Saur {
    fn name(&self) -> &'static str {
        "saur"
    }

    fn authenticate(&self) -> Result<Session, ProviderError> {
        let payload = serde_json::json!({
            "username": self.email,
            "password": self.password,
            "client_id": CLIENT_ID,
            "grant_type": "password",
            "scope": SCOPE,
            "isRecaptchaV3": true,
            "captchaToken": true,
        });
        let resp = self
            .agent
            .post(&format!("{}/admin/auth", self.base_url))
            .set("Accept", "application/json")
            .send_json(payload)
            .map_err(|e| ProviderError::Authentication(describe_request_error(e)))?;
        let body: AuthResponse = match parse_json(resp) {
            Ok(b) => b,
            Err(e) => return Err(ProviderError::Authentication(e.to_string())),
        };
        session_from_auth(body)
    }

    fn resolve_account(&self, session: &Session) -> Result<String, ProviderError> {
        // The section id is embedded in the auth response; nothing to query.
        session
            .account_id
            .clone()
            .ok_or_else(|| ProviderError::Resolution("section id not returned at authentication".into()))
    }

    fn fetch_reading(
        &self,
        session: &Session,
        account_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Reading>, ProviderError> {
        let url = format!(
            "{}/deli/section_subscription/{}/consumptions/weekly",
            self.base_url, account_id
        );
        let resp = self
            .agent
            .get(&url)
            .query("year", &date.year().to_string())
            .query("month", &date.month().to_string())
            .query("day", &date.day().to_string())
            .set("Authorization", &format!("Bearer {}", session.bearer_token))
            .call()
            .map_err(request_error)?;
        extract_reading(parse_json(resp)?)
    }

    fn fallback_days(&self) -> u32 {
        7
    }

    fn default_poll_interval(&self) -> Duration {
        Duration::from_secs(900)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn load_auth_fixture() -> AuthResponse {
        let json = std::fs::read_to_string("tests/data/saur-auth.json").expect("fixture present");
        serde_json::from_str(&json).expect("parse auth response")
    }

    fn load_weekly_fixture() -> WeeklyConsumptions {
        let json = std::fs::read_to_string("tests/data/saur-weekly.json").expect("fixture present");
        serde_json::from_str(&json).expect("parse weekly response")
    }

    #[test]
    fn auth_response_becomes_session() {
        let session = session_from_auth(load_auth_fixture()).expect("session");
        assert_eq!(session.bearer_token, "saur-access-token");
        assert_eq!(session.account_id.as_deref(), Some("98765"));
        assert!(session.is_valid());
    }

    #[test]
    fn section_id_accepts_strings() {
        let mut body = load_auth_fixture();
        body.default_section_id = serde_json::Value::String("S-42".into());
        let session = session_from_auth(body).expect("session");
        assert_eq!(session.account_id.as_deref(), Some("S-42"));
    }

    #[test]
    fn weekly_reading_extraction() {
        let reading = extract_reading(load_weekly_fixture())
            .expect("extraction succeeds")
            .expect("reading present");
        assert_eq!(reading.value.to_string(), "1.234");
        assert_eq!(reading.period_start.to_string(), "2024-05-06");
        assert_eq!(reading.period_end.to_string(), "2024-05-12");
        assert!(reading.period_start <= reading.period_end);
    }

    #[test]
    fn empty_consumptions_is_no_data() {
        let mut body = load_weekly_fixture();
        body.consumptions.clear();
        let result = extract_reading(body).expect("extraction succeeds");
        assert!(result.is_none());
    }

    #[test]
    fn authenticate_against_mock_server() {
        let mut server = mockito::Server::new();
        let body = std::fs::read_to_string("tests/data/saur-auth.json").expect("fixture present");
        let mock = server
            .mock("POST", "/admin/auth")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "username": "user@example.com",
                "client_id": CLIENT_ID,
                "grant_type": "password",
            })))
            .with_status(200)
            .with_body(body)
            .create();

        let provider = Saur::with_base_url("user@example.com", "hunter2", server.url());
        let session = provider.authenticate().expect("authentication succeeds");
        mock.assert();
        assert_eq!(session.bearer_token, "saur-access-token");
        assert_eq!(session.account_id.as_deref(), Some("98765"));
    }

    #[test]
    fn authenticate_maps_status_errors() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/admin/auth")
            .with_status(401)
            .with_body("unauthorized")
            .create();

        let provider = Saur::with_base_url("user@example.com", "wrong", server.url());
        let err = provider.authenticate().unwrap_err();
        assert!(matches!(err, ProviderError::Authentication(_)));
    }

    #[test]
    fn fetch_reading_sends_date_parameters() {
        let mut server = mockito::Server::new();
        let body = std::fs::read_to_string("tests/data/saur-weekly.json").expect("fixture present");
        let mock = server
            .mock("GET", "/deli/section_subscription/98765/consumptions/weekly")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("year".into(), "2024".into()),
                Matcher::UrlEncoded("month".into(), "5".into()),
                Matcher::UrlEncoded("day".into(), "8".into()),
            ]))
            .match_header("Authorization", "Bearer saur-access-token")
            .with_status(200)
            .with_body(body)
            .create();

        let provider = Saur::with_base_url("user@example.com", "hunter2", server.url());
        let session = Session {
            bearer_token: "saur-access-token".into(),
            expires_at: None,
            account_id: Some("98765".into()),
        };
        let date = NaiveDate::from_ymd_opt(2024, 5, 8).expect("valid date");
        let reading = provider
            .fetch_reading(&session, "98765", date)
            .expect("fetch succeeds")
            .expect("reading present");
        mock.assert();
        assert_eq!(reading.value.to_string(), "1.234");
    }

    #[test]
    fn fetch_reading_maps_server_errors() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/deli/section_subscription/98765/consumptions/weekly")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create();

        let provider = Saur::with_base_url("user@example.com", "hunter2", server.url());
        let session = Session {
            bearer_token: "tok".into(),
            expires_at: None,
            account_id: Some("98765".into()),
        };
        let date = NaiveDate::from_ymd_opt(2024, 5, 8).expect("valid date");
        let err = provider.fetch_reading(&session, "98765", date).unwrap_err();
        assert!(matches!(err, ProviderError::Http { status: 503, .. }));
    }
}
