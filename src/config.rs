//! Minimal runtime configuration helpers.
//! Everything comes from the environment (optionally seeded from a .env file
//! by `main` before this runs).

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    EauDuPic,
    Saur,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "eaudupic" | "eau_du_pic" => Ok(ProviderKind::EauDuPic),
            "saur" => Ok(ProviderKind::Saur),
            other => Err(format!(
                "unknown METER_PROVIDER {:?} (expected \"eaudupic\" or \"saur\")",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderKind,
    pub email: String,
    pub password: String,
    /// Polling cadence override; the provider default applies when unset.
    pub poll_interval: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let provider = ProviderKind::parse(&require("METER_PROVIDER")?)?;
        let email = require("METER_EMAIL")?;
        let password = require("METER_PASSWORD")?;

        let poll_interval = match std::env::var("POLL_INTERVAL_SECS") {
            Ok(s) if !s.trim().is_empty() => {
                let secs = s
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| "POLL_INTERVAL_SECS must be a positive integer".to_string())?;
                if secs == 0 {
                    return Err("POLL_INTERVAL_SECS must be greater than zero".to_string());
                }
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        Ok(Config {
            provider,
            email,
            password,
            poll_interval,
        })
    }
}

fn require(name: &str) -> Result<String, String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!("Missing required environment variable {}", name)),
    }
}
