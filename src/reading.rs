//! The normalized consumption record cached between refreshes.

use crate::error::ProviderError;
use chrono::NaiveDate;
use serde_json::Number;

/// One meter reading: consumption in cubic meters over a billing period.
///
/// The value is kept as the server sent it (`serde_json::Number`), so an
/// integer reading stays an integer and a fractional one keeps its exact
/// decimal representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: Number,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl Reading {
    /// Build a reading, rejecting inverted periods.
    pub fn new(value: Number, period_start: NaiveDate, period_end: NaiveDate) -> Result<Self, ProviderError> {
        if period_start > period_end {
            return Err(ProviderError::Malformed(format!(
                "period start {} after period end {}",
                period_start, period_end
            )));
        }
        Ok(Reading {
            value,
            period_start,
            period_end,
        })
    }
}
