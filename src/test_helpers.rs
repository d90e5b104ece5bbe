use async_trait::async_trait;
use chrono::{NaiveDate, Offset as _, Utc};

use crate::adapters::snapshot_store::{Snapshot, SnapshotStore};
use crate::domain::availability::{MinimumStayRule, OccupancyKind, UnitOccupancy};
use crate::domain::date_range::DateRange;
use crate::domain::pricing::{PricingConfig, SeasonRate};
use crate::error::{BookingError, Result};
use crate::ports::booking_store::{BookingStore, Unit};

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn range(start: &str, end: &str) -> DateRange {
    DateRange::new(day(start), day(end)).unwrap()
}

pub fn season(id: &str, name: &str, start: &str, end: &str, nightly_rate: u64) -> SeasonRate {
    SeasonRate {
        id: id.into(),
        name: name.into(),
        start_date: day(start),
        end_date: day(end),
        nightly_rate,
    }
}

/// Base 250 for 4 guests, 50 per extra guest per night, low season in June
/// at 300 and high season in July-August at 500.
pub fn sample_pricing() -> PricingConfig {
    PricingConfig {
        base_rate: 250,
        base_occupancy: 4,
        extra_occupant_rate: 50,
        seasons: vec![
            season("low", "Low season", "2025-06-01", "2025-06-30", 300),
            season("high", "High season", "2025-07-01", "2025-08-31", 500),
        ],
    }
}

pub fn booking(unit_id: &str, start: &str, end: &str) -> UnitOccupancy {
    UnitOccupancy {
        unit_id: unit_id.into(),
        range: range(start, end),
        kind: OccupancyKind::Booking,
        reference: None,
    }
}

pub fn block(unit_id: &str, start: &str, end: &str) -> UnitOccupancy {
    UnitOccupancy {
        unit_id: unit_id.into(),
        range: range(start, end),
        kind: OccupancyKind::Block,
        reference: None,
    }
}

pub fn rule(unit_id: &str, start: &str, end: &str, min_nights: u32, priority: i32) -> MinimumStayRule {
    MinimumStayRule {
        unit_id: unit_id.into(),
        range: range(start, end),
        min_nights,
        priority,
        active: true,
    }
}

/// Same pricing as [`sample_pricing`], two units, and occupancy dates in each
/// of the shapes the document store exports.
pub const SNAPSHOT_YAML: &str = r#"pricing:
  base_rate: 250
  base_occupancy: 4
  extra_occupant_rate: 50
  seasons:
    - id: low
      name: Low season
      start_date: 2025-06-01
      end_date: 2025-06-30
      nightly_rate: 300
    - id: high
      name: High season
      start_date: 2025-07-01
      end_date: 2025-08-31
      nightly_rate: 500
units:
  - id: lakeside
    name: Lakeside Cottage
  - id: forest
    name: Forest Cabin
occupancies:
  - unit_id: lakeside
    start: 2025-07-04
    end: 2025-07-10
    reference: BK-1001
  - unit_id: lakeside
    start: 1752278400000
    end: 1752451200000
    kind: block
  - unit_id: forest
    start: { seconds: 1751328000, nanoseconds: 0 }
    end: "2025-07-08T10:00:00+00:00"
    reference: BK-1002
minimum_stay_rules:
  - unit_id: lakeside
    start: 2025-07-01
    end: 2025-08-01
    min_nights: 2
  - unit_id: lakeside
    start: 2025-07-15
    end: 2025-08-01
    min_nights: 5
    priority: 5
"#;

pub fn snapshot_store() -> SnapshotStore {
    SnapshotStore::from_snapshot(Snapshot::from_yaml(SNAPSHOT_YAML, Utc.fix(), false).unwrap())
}

/// Store whose every read fails, for error-path tests.
pub struct FailingStore;

fn offline<T>() -> Result<T> {
    Err(BookingError::Config("store offline".into()))
}

#[async_trait]
impl BookingStore for FailingStore {
    async fn pricing(&self) -> Result<PricingConfig> {
        offline()
    }

    async fn units(&self) -> Result<Vec<Unit>> {
        offline()
    }

    async fn occupancies(&self, _unit_id: &str) -> Result<Vec<UnitOccupancy>> {
        offline()
    }

    async fn minimum_stay_rules(&self, _unit_id: &str) -> Result<Vec<MinimumStayRule>> {
        offline()
    }
}
