//! Date-like input normalization.
//!
//! # Responsibility
//! - Accept dates either as epoch milliseconds or as calendar strings.
//! - Store every date as UTC-midnight epoch milliseconds so the local store
//!   can compare and range-scan them as numbers.
//! - Format stored dates back to `YYYY-MM-DD` for the remote boundary.
//!
//! # Invariants
//! - Calendar strings drop any time-of-day suffix before conversion.
//! - Numeric input is truncated to its UTC calendar day.

use crate::model::validation::ModelError;
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ].*)?$").expect("valid iso date regex")
});
static DMY_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid day-month-year regex")
});

/// Date value as supplied by callers: epoch milliseconds or a calendar string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    EpochMs(i64),
    Calendar(String),
}

impl DateInput {
    /// Normalizes to UTC-midnight epoch milliseconds.
    pub fn to_epoch_ms(&self, field: &'static str) -> Result<i64, ModelError> {
        match self {
            Self::EpochMs(value) => Ok(value.div_euclid(MILLIS_PER_DAY) * MILLIS_PER_DAY),
            Self::Calendar(value) => parse_calendar_date(value).ok_or_else(|| {
                ModelError::InvalidDate {
                    field,
                    value: value.clone(),
                }
            }),
        }
    }
}

impl From<i64> for DateInput {
    fn from(value: i64) -> Self {
        Self::EpochMs(value)
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        Self::Calendar(value.to_string())
    }
}

/// Parses `YYYY-MM-DD[...]` or `DD/MM/YYYY` into UTC-midnight epoch ms.
pub fn parse_calendar_date(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    let (year, month, day) = if let Some(captures) = ISO_DATE_RE.captures(trimmed) {
        (
            captures[1].parse::<i32>().ok()?,
            captures[2].parse::<u32>().ok()?,
            captures[3].parse::<u32>().ok()?,
        )
    } else if let Some(captures) = DMY_DATE_RE.captures(trimmed) {
        (
            captures[3].parse::<i32>().ok()?,
            captures[2].parse::<u32>().ok()?,
            captures[1].parse::<u32>().ok()?,
        )
    } else {
        return None;
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

/// Formats epoch milliseconds as a `YYYY-MM-DD` UTC calendar date.
pub fn to_calendar_date(epoch_ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|moment| moment.date_naive().format("%Y-%m-%d").to_string())
}

pub(crate) fn normalize_optional(
    field: &'static str,
    value: Option<&DateInput>,
) -> Result<Option<i64>, ModelError> {
    value.map(|input| input.to_epoch_ms(field)).transpose()
}

/// Serde helper for stored/remote date fields that may arrive in either shape.
pub(crate) fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<DateInput>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(DateInput::Calendar(value)) if value.trim().is_empty() => Ok(None),
        Some(input) => input
            .to_epoch_ms("date")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
