use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::date_range::DateRange;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid date range: start {start} must be before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid occupancy: {occupants} occupants, at least 1 required")]
    InvalidOccupancy { occupants: u32 },

    #[error("Stay too short: {nights} nights booked, minimum is {min_nights}")]
    StayTooShort { nights: u32, min_nights: u32 },

    #[error("Unit {unit_id} is unavailable: conflicts with {}", format_ranges(.conflicts))]
    UnitUnavailable {
        unit_id: String,
        conflicts: Vec<DateRange>,
    },

    #[error("Price overflow: {nights} nights for {occupants} occupants exceeds the representable total")]
    PriceOverflow { nights: u32, occupants: u32 },

    #[error("Invalid date '{input}': {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("Unit not found: {id}")]
    UnitNotFound { id: String },

    #[error("Rate limit exceeded, try again later")]
    RateLimited,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

fn format_ranges(ranges: &[DateRange]) -> String {
    ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, BookingError>;
