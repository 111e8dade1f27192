//! Refresh coordinator: owns the session and the cached reading.
//!
//! One refresh cycle runs authenticate (when the session is absent or past
//! its known expiry), account resolution (when the session does not carry an
//! identifier yet), then the date-fallback fetch. Every failure is wrapped
//! into a single `RefreshError`; the cached reading is only replaced on a
//! fully successful cycle, so a failed tick leaves the last good value
//! readable.

use crate::error::{ProviderError, RefreshError};
use crate::provider::{ProviderAdapter, Session};
use crate::reading::Reading;
use chrono::{Local, NaiveDate};
use log::debug;
use std::time::Duration;

pub struct Coordinator {
    adapter: Box<dyn ProviderAdapter>,
    session: Option<Session>,
    reading: Option<Reading>,
}

impl Coordinator {
    /// Create the coordinator and run one blocking refresh. A failure here
    /// yields no coordinator at all, so callers never hold one without data.
    pub fn start(adapter: Box<dyn ProviderAdapter>) -> Result<Self, RefreshError> {
        let mut coordinator = Coordinator {
            adapter,
            session: None,
            reading: None,
        };
        coordinator.refresh()?;
        Ok(coordinator)
    }

    pub fn provider_name(&self) -> &'static str {
        self.adapter.name()
    }

    pub fn default_poll_interval(&self) -> Duration {
        self.adapter.default_poll_interval()
    }

    /// Run one refresh cycle as of the local calendar date.
    pub fn refresh(&mut self) -> Result<(), RefreshError> {
        self.refresh_as_of(Local::now().date_naive())
    }

    /// Run one refresh cycle, probing `today` and up to `fallback_days()`
    /// earlier dates until one yields a reading.
    pub fn refresh_as_of(&mut self, today: NaiveDate) -> Result<(), RefreshError> {
        if !self.session.as_ref().is_some_and(Session::is_valid) {
            debug!("{}: session absent or expired, authenticating", self.adapter.name());
            self.session = Some(self.adapter.authenticate()?);
        }
        let Some(session) = self.session.as_mut() else {
            // Assigned just above; kept total rather than unwrapping.
            return Err(ProviderError::Authentication("no session after authentication".into()).into());
        };

        let account_id = match session.account_id.clone() {
            Some(id) => id,
            None => {
                let id = self.adapter.resolve_account(session)?;
                debug!("{}: resolved account {}", self.adapter.name(), id);
                session.account_id = Some(id.clone());
                id
            }
        };

        for days_back in 0..=i64::from(self.adapter.fallback_days()) {
            let date = today - chrono::Duration::days(days_back);
            if let Some(reading) = self.adapter.fetch_reading(session, &account_id, date)? {
                if days_back > 0 {
                    debug!("{}: reading found {} day(s) back on {}", self.adapter.name(), days_back, date);
                }
                self.reading = Some(reading);
                return Ok(());
            }
        }
        Err(ProviderError::NoData.into())
    }

    pub fn reading(&self) -> Option<&Reading> {
        self.reading.as_ref()
    }

    pub fn value(&self) -> Option<&serde_json::Number> {
        self.reading.as_ref().map(|r| &r.value)
    }

    pub fn period(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.reading.as_ref().map(|r| (r.period_start, r.period_end))
    }
}
