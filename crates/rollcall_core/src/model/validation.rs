//! Record validation errors and shared field checks.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static TIME_OF_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)(?::[0-5]\d)?$").expect("valid time-of-day regex")
});

/// Validation and normalization failures for domain records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A required text field is empty.
    MissingField(&'static str),
    /// A date-like value could not be read as a calendar date.
    InvalidDate { field: &'static str, value: String },
    /// A time-of-day value is not `HH:MM` (optionally `HH:MM:SS`).
    InvalidTime { field: &'static str, value: String },
    /// `end_time` is earlier than `start_time`.
    TimeRangeReversed { start: String, end: String },
    /// A counter field is negative.
    NegativeCount(&'static str),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::InvalidDate { field, value } => {
                write!(f, "{field} is not a calendar date: `{value}`")
            }
            Self::InvalidTime { field, value } => {
                write!(f, "{field} is not a HH:MM time: `{value}`")
            }
            Self::TimeRangeReversed { start, end } => {
                write!(f, "end_time {end} is earlier than start_time {start}")
            }
            Self::NegativeCount(field) => write!(f, "{field} cannot be negative"),
        }
    }
}

impl Error for ModelError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ModelError> {
    if value.trim().is_empty() {
        return Err(ModelError::MissingField(field));
    }
    Ok(())
}

/// Checks optional `HH:MM` bounds and their ordering.
pub(crate) fn check_time_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), ModelError> {
    let start_minutes = start.map(|value| minutes_of_day("start_time", value)).transpose()?;
    let end_minutes = end.map(|value| minutes_of_day("end_time", value)).transpose()?;

    if let (Some(start_at), Some(end_at)) = (start_minutes, end_minutes) {
        if end_at < start_at {
            return Err(ModelError::TimeRangeReversed {
                start: start.unwrap_or_default().to_string(),
                end: end.unwrap_or_default().to_string(),
            });
        }
    }

    Ok(())
}

fn minutes_of_day(field: &'static str, value: &str) -> Result<u32, ModelError> {
    let invalid = || ModelError::InvalidTime {
        field,
        value: value.to_string(),
    };
    let captures = TIME_OF_DAY_RE.captures(value.trim()).ok_or_else(invalid)?;
    let hours: u32 = captures[1].parse().map_err(|_| invalid())?;
    let minutes: u32 = captures[2].parse().map_err(|_| invalid())?;
    Ok(hours * 60 + minutes)
}
