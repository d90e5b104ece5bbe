use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::availability::{MinimumStayRule, UnitOccupancy, conflicts, resolve_minimum_stay};
use crate::domain::date_range::DateRange;
use crate::domain::pricing::{PricedStay, PricingConfig, price_stay};
use crate::error::{BookingError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub unit_id: String,
    pub range: DateRange,
    pub occupants: u32,
    /// Admin force-through: accept the dates even if they clash with an
    /// existing booking or block.
    #[serde(default)]
    pub override_conflicts: bool,
}

/// Data read for one unit before validating a request.
#[derive(Debug, Clone, Copy)]
pub struct BookingSnapshot<'a> {
    pub pricing: &'a PricingConfig,
    pub occupancies: &'a [UnitOccupancy],
    pub rules: &'a [MinimumStayRule],
    pub default_min_nights: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingQuote {
    pub unit_id: String,
    pub range: DateRange,
    pub occupants: u32,
    pub min_nights: u32,
    pub priced: PricedStay,
    /// Ranges the request was allowed to overlap through `override_conflicts`.
    #[serde(default)]
    pub overridden_conflicts: Vec<DateRange>,
}

/// Check a request against the snapshot and price it.
///
/// Rejects a bad occupant count, then dates that clash with a booking or
/// block, then stays shorter than the minimum in force on arrival.
pub fn validate_booking(snapshot: &BookingSnapshot<'_>, request: &BookingRequest) -> Result<BookingQuote> {
    if request.occupants < 1 {
        return Err(BookingError::InvalidOccupancy {
            occupants: request.occupants,
        });
    }

    let clashes: Vec<DateRange> = conflicts(snapshot.occupancies, &request.unit_id, &request.range)
        .into_iter()
        .map(|o| o.range)
        .collect();
    if !clashes.is_empty() {
        if !request.override_conflicts {
            return Err(BookingError::UnitUnavailable {
                unit_id: request.unit_id.clone(),
                conflicts: clashes,
            });
        }
        warn!(
            unit_id = %request.unit_id,
            range = %request.range,
            conflicts = clashes.len(),
            "Accepting overlapping dates on admin override"
        );
    }

    let min_nights = resolve_minimum_stay(
        snapshot.rules,
        &request.unit_id,
        &request.range,
        snapshot.default_min_nights,
    );
    let nights = request.range.nights();
    if nights < min_nights {
        return Err(BookingError::StayTooShort { nights, min_nights });
    }

    let priced = price_stay(snapshot.pricing, &request.range, request.occupants)?;
    debug!(
        unit_id = %request.unit_id,
        range = %request.range,
        total = priced.total_price,
        "Booking request priced"
    );

    Ok(BookingQuote {
        unit_id: request.unit_id.clone(),
        range: request.range,
        occupants: request.occupants,
        min_nights,
        priced,
        overridden_conflicts: clashes,
    })
}

impl std::fmt::Display for BookingQuote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Quote for unit {}", self.unit_id)?;
        writeln!(
            f,
            "Stay: {} ({} nights, minimum {})",
            self.range,
            self.range.nights(),
            self.min_nights
        )?;
        writeln!(f, "Occupants: {}", self.occupants)?;
        if !self.overridden_conflicts.is_empty() {
            let ranges: Vec<String> = self
                .overridden_conflicts
                .iter()
                .map(ToString::to_string)
                .collect();
            writeln!(f, "Overrides conflicts with: {}", ranges.join(", "))?;
        }
        write!(f, "{}", self.priced)
    }
}
