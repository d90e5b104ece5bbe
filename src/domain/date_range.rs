use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

/// A half-open span of calendar days, `[start, end)`.
///
/// `start` is the arrival day and `end` the checkout day, which is not a paid
/// night. A range always has `start < end`: the only way to build one is
/// [`DateRange::new`], and deserialisation goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = BookingError;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(BookingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of paid nights. The checkout day is not counted.
    pub fn nights(&self) -> u32 {
        u32::try_from((self.end - self.start).num_days()).unwrap_or(u32::MAX)
    }

    /// Every night in the range, arrival day first.
    pub fn nights_iter(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }

    /// Two half-open ranges overlap iff each starts before the other ends.
    /// A stay ending on day X and one starting on day X do not overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// A date as it arrives from the document store or a request.
///
/// Exports mix plain `YYYY-MM-DD` strings, RFC 3339 timestamps, epoch
/// milliseconds and `{seconds, nanoseconds}` timestamp objects. They are all
/// turned into a [`NaiveDate`] once, by [`DateInput::to_calendar_day`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Timestamp {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    EpochMillis(i64),
    Text(String),
}

impl DateInput {
    /// Normalise to a calendar day.
    ///
    /// RFC 3339 strings keep the day of their own offset. Epoch-based inputs
    /// carry no offset and are read in `offset`.
    pub fn to_calendar_day(&self, offset: FixedOffset) -> Result<NaiveDate> {
        match self {
            Self::Text(text) => parse_day(text),
            Self::EpochMillis(ms) => DateTime::<Utc>::from_timestamp_millis(*ms)
                .map(|dt| dt.with_timezone(&offset).date_naive())
                .ok_or_else(|| BookingError::InvalidDate {
                    input: ms.to_string(),
                    reason: "epoch milliseconds out of range".into(),
                }),
            Self::Timestamp {
                seconds,
                nanoseconds,
            } => DateTime::<Utc>::from_timestamp(*seconds, *nanoseconds)
                .map(|dt| dt.with_timezone(&offset).date_naive())
                .ok_or_else(|| BookingError::InvalidDate {
                    input: format!("{{seconds: {seconds}, nanoseconds: {nanoseconds}}}"),
                    reason: "timestamp out of range".into(),
                }),
        }
    }
}

impl From<NaiveDate> for DateInput {
    fn from(day: NaiveDate) -> Self {
        Self::Text(day.format("%Y-%m-%d").to_string())
    }
}

/// Parse a `YYYY-MM-DD` day or an RFC 3339 timestamp.
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.date_naive())
        .map_err(|_| BookingError::InvalidDate {
            input: input.to_string(),
            reason: "expected YYYY-MM-DD or an RFC 3339 timestamp".into(),
        })
}

/// Parse a checkin/checkout pair into a stay range.
pub fn parse_stay(checkin: &str, checkout: &str) -> Result<DateRange> {
    DateRange::new(parse_day(checkin)?, parse_day(checkout)?)
}

/// Fixed offset east of UTC, in minutes.
pub fn utc_offset(minutes: i32) -> Result<FixedOffset> {
    if minutes == 0 {
        return Ok(Utc.fix());
    }
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| BookingError::Config(format!("utc offset of {minutes} minutes is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{day, range};

    #[test]
    fn new_rejects_empty_and_reversed_ranges() {
        let same = DateRange::new(day("2025-07-01"), day("2025-07-01"));
        assert!(matches!(same, Err(BookingError::InvalidRange { .. })));
        let reversed = DateRange::new(day("2025-07-05"), day("2025-07-01"));
        assert!(matches!(reversed, Err(BookingError::InvalidRange { .. })));
    }

    #[test]
    fn nights_excludes_checkout_day() {
        let stay = range("2025-06-10", "2025-06-13");
        assert_eq!(stay.nights(), 3);
        let nights: Vec<_> = stay.nights_iter().collect();
        assert_eq!(
            nights,
            vec![day("2025-06-10"), day("2025-06-11"), day("2025-06-12")]
        );
    }

    #[test]
    fn nights_across_month_and_year_boundaries() {
        assert_eq!(range("2025-12-30", "2026-01-02").nights(), 3);
        assert_eq!(range("2024-02-28", "2024-03-01").nights(), 2);
    }

    #[test]
    fn overlap_on_shared_night() {
        let candidate = range("2025-07-01", "2025-07-05");
        let existing = range("2025-07-04", "2025-07-10");
        assert!(candidate.overlaps(&existing));
        assert!(existing.overlaps(&candidate));
    }

    #[test]
    fn same_day_turnover_is_not_overlap() {
        let candidate = range("2025-07-01", "2025-07-05");
        let existing = range("2025-07-05", "2025-07-10");
        assert!(!candidate.overlaps(&existing));
        assert!(!existing.overlaps(&candidate));
    }

    #[test]
    fn contained_range_overlaps() {
        let outer = range("2025-07-01", "2025-07-31");
        let inner = range("2025-07-10", "2025-07-12");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn contains_is_half_open() {
        let r = range("2025-07-01", "2025-07-05");
        assert!(r.contains(day("2025-07-01")));
        assert!(r.contains(day("2025-07-04")));
        assert!(!r.contains(day("2025-07-05")));
        assert!(!r.contains(day("2025-06-30")));
    }

    #[test]
    fn deserialize_validates_order() {
        let ok: DateRange =
            serde_json::from_str(r#"{"start":"2025-07-01","end":"2025-07-03"}"#).unwrap();
        assert_eq!(ok.nights(), 2);
        let bad = serde_json::from_str::<DateRange>(r#"{"start":"2025-07-03","end":"2025-07-01"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn parse_day_accepts_plain_and_rfc3339() {
        assert_eq!(parse_day("2025-07-01").unwrap(), day("2025-07-01"));
        assert_eq!(parse_day(" 2025-07-01 ").unwrap(), day("2025-07-01"));
        // Late evening west of UTC is still the local day.
        assert_eq!(
            parse_day("2025-07-01T23:30:00-05:00").unwrap(),
            day("2025-07-01")
        );
        assert!(matches!(
            parse_day("07/01/2025"),
            Err(BookingError::InvalidDate { .. })
        ));
    }

    #[test]
    fn epoch_inputs_use_configured_offset() {
        // 2025-07-01T22:00:00Z
        let ms = 1_751_407_200_000_i64;
        let utc = utc_offset(0).unwrap();
        let plus_three = utc_offset(180).unwrap();
        assert_eq!(
            DateInput::EpochMillis(ms).to_calendar_day(utc).unwrap(),
            day("2025-07-01")
        );
        assert_eq!(
            DateInput::EpochMillis(ms).to_calendar_day(plus_three).unwrap(),
            day("2025-07-02")
        );
        let ts = DateInput::Timestamp {
            seconds: ms / 1000,
            nanoseconds: 0,
        };
        assert_eq!(ts.to_calendar_day(utc).unwrap(), day("2025-07-01"));
    }

    #[test]
    fn date_input_deserializes_all_shapes() {
        let inputs: Vec<DateInput> = serde_json::from_str(
            r#"["2025-07-01", 1751407200000, {"seconds": 1751407200}, {"_seconds": 1751407200, "_nanoseconds": 5}]"#,
        )
        .unwrap();
        let utc = utc_offset(0).unwrap();
        for input in &inputs {
            assert_eq!(input.to_calendar_day(utc).unwrap(), day("2025-07-01"));
        }
    }

    #[test]
    fn utc_offset_out_of_range() {
        assert!(utc_offset(24 * 60).is_err());
        assert!(utc_offset(-120).is_ok());
    }

    #[test]
    fn parse_stay_rejects_reversed() {
        assert!(parse_stay("2025-07-05", "2025-07-01").is_err());
        assert_eq!(parse_stay("2025-07-01", "2025-07-05").unwrap().nights(), 4);
    }
}
