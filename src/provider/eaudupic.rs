//! Eau du Pic adapter.
//!
//! JSON:API-flavored customer portal:
//! - `POST /signin` with a `POICL_Signin` resource; the bearer token comes
//!   back in the `authorization` response header (no expiry is advertised).
//! - `GET /contracts` lists the customer's contracts; the first entry's id
//!   is the one used for data requests.
//! - `GET /contracts/{id}` returns the contract with an `included` resource
//!   list; the latest meter reading is the first `POGRC_Releve` entry
//!   (`consorlv` = consumption in m³, `dateai`/`dateni` = period bounds).
//!
//! The consumption endpoint is not date-addressable, so the adapter reports
//! a zero-day fallback window.

use crate::error::ProviderError;
use crate::provider::{
    build_agent, describe_request_error, parse_iso_date, parse_json, request_error, ProviderAdapter, Session,
};
use crate::reading::Reading;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://espace-client.eaudupic.fr/api";
const API_ID: &str = "eaudupic-espace-client";
/// Resource type tag of a meter-reading entry in the `included` list.
const READING_TYPE: &str = "POGRC_Releve";

pub struct EauDuPic {
    agent: ureq::Agent,
    base_url: String,
    email: String,
    password: String,
}

impl EauDuPic {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_base_url(email, password, BASE_URL)
    }

    pub fn with_base_url(email: impl Into<String>, password: impl Into<String>, base_url: impl Into<String>) -> Self {
        EauDuPic {
            agent: build_agent(),
            base_url: base_url.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Deserialize)]
struct ContractList {
    #[serde(default)]
    data: Vec<ContractRef>,
}

#[derive(Deserialize)]
struct ContractRef {
    id: String,
}

#[derive(Deserialize)]
struct ContractDetail {
    #[serde(default)]
    included: Vec<IncludedResource>,
}

#[derive(Deserialize)]
struct IncludedResource {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: serde_json::Value,
}

#[derive(Deserialize)]
struct ReleveAttributes {
    consorlv: serde_json::Number,
    dateai: String,
    dateni: String,
}

/// Pick the reading out of a contract response. A contract with no
/// `POGRC_Releve` entry is "no data", not an error.
fn extract_reading(body: ContractDetail) -> Result<Option<Reading>, ProviderError> {
    let Some(entry) = body.included.into_iter().find(|r| r.kind == READING_TYPE) else {
        return Ok(None);
    };
    let attrs: ReleveAttributes = serde_json::from_value(entry.attributes)
        .map_err(|e| ProviderError::Malformed(format!("{} attributes: {}", READING_TYPE, e)))?;
    let period_start = parse_iso_date(&attrs.dateai)?;
    let period_end = parse_iso_date(&attrs.dateni)?;
    Reading::new(attrs.consorlv, period_start, period_end).map(Some)
}

impl ProviderAdapter for EauDuPic {
    fn name(&self) -> &'static str {
        "eaudupic"
    }

    fn authenticate(&self) -> Result<Session, ProviderError> {
        let body = serde_json::json!({
            "data": {
                "type": "POICL_Signin",
                "id": "",
                "attributes": {
                    "login": self.email,
                    "password": self.password,
                    "remember": false,
                },
            }
        });
        let resp = self
            .agent
            .post(&format!("{}/signin", self.base_url))
            .set("api-id", API_ID)
            .set("Accept", "application/json")
            .send_json(body);
        match resp {
            Ok(r) => {
                let token = r
                    .header("authorization")
                    .ok_or_else(|| ProviderError::Authentication("response missing authorization header".into()))?
                    .to_string();
                Ok(Session {
                    bearer_token: token,
                    expires_at: None,
                    account_id: None,
                })
            }
            Err(e) => Err(ProviderError::Authentication(describe_request_error(e))),
        }
    }

    fn resolve_account(&self, session: &Session) -> Result<String, ProviderError> {
        let resp = self
            .agent
            .get(&format!("{}/contracts", self.base_url))
            .set("authorization", &session.bearer_token)
            .set("api-id", API_ID)
            .call()
            .map_err(|e| ProviderError::Resolution(describe_request_error(e)))?;
        let list: ContractList = match parse_json(resp) {
            Ok(l) => l,
            Err(e) => return Err(ProviderError::Resolution(e.to_string())),
        };
        match list.data.into_iter().next() {
            Some(contract) => Ok(contract.id),
            None => Err(ProviderError::Resolution("contract listing is empty".into())),
        }
    }

    fn fetch_reading(
        &self,
        session: &Session,
        account_id: &str,
        _date: NaiveDate,
    ) -> Result<Option<Reading>, ProviderError> {
        let resp = self
            .agent
            .get(&format!("{}/contracts/{}", self.base_url, account_id))
            .set("authorization", &session.bearer_token)
            .set("api-id", API_ID)
            .call()
            .map_err(request_error)?;
        extract_reading(parse_json(resp)?)
    }

    fn fallback_days(&self) -> u32 {
        0
    }

    fn default_poll_interval(&self) -> Duration {
        Duration::from_secs(3600)
    }
}
