//! Seasonal nightly rates and stay pricing.
//!
//! Everything here is a pure function of a [`PricingConfig`] snapshot. Money
//! is whole currency units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::date_range::DateRange;
use crate::error::{BookingError, Result};

/// Label reported for nights that fall in no configured season.
pub const BASE_SEASON: &str = "base";

/// A named window with its own nightly rate. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRate {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nightly_rate: u64,
}

impl SeasonRate {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    fn intersects(&self, other: &SeasonRate) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub base_rate: u64,
    /// Headcount included in the nightly rate.
    pub base_occupancy: u32,
    /// Per occupant beyond `base_occupancy`, per night.
    #[serde(default)]
    pub extra_occupant_rate: u64,
    /// Checked in declaration order; the first season containing a night wins.
    #[serde(default)]
    pub seasons: Vec<SeasonRate>,
}

impl PricingConfig {
    /// Check the rate table an operator entered.
    ///
    /// Overlapping seasons are logged. They only fail validation when
    /// `reject_overlaps` is set, since first-match resolution still gives a
    /// deterministic answer.
    pub fn validate(&self, reject_overlaps: bool) -> Result<()> {
        if self.base_rate == 0 {
            return Err(BookingError::Config("base_rate must be positive".into()));
        }
        for season in &self.seasons {
            if season.start_date > season.end_date {
                return Err(BookingError::Config(format!(
                    "season '{}' starts {} after it ends {}",
                    season.id, season.start_date, season.end_date
                )));
            }
            if season.nightly_rate == 0 {
                return Err(BookingError::Config(format!(
                    "season '{}' has a zero nightly rate",
                    season.id
                )));
            }
        }

        let overlaps = self.overlapping_seasons();
        for (first, second) in &overlaps {
            warn!(
                first = %first.id,
                second = %second.id,
                "Seasons overlap; nights in both are priced by '{}'",
                first.id
            );
        }
        if reject_overlaps && let Some((first, second)) = overlaps.first() {
            return Err(BookingError::Config(format!(
                "seasons '{}' and '{}' overlap",
                first.id, second.id
            )));
        }
        Ok(())
    }

    /// Pairs of seasons whose windows intersect, earlier-declared first.
    pub fn overlapping_seasons(&self) -> Vec<(&SeasonRate, &SeasonRate)> {
        let mut pairs = Vec::new();
        for (i, first) in self.seasons.iter().enumerate() {
            for second in &self.seasons[i + 1..] {
                if first.intersects(second) {
                    pairs.push((first, second));
                }
            }
        }
        pairs
    }
}

/// The rate that applies to one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightlyRate<'a> {
    pub rate: u64,
    pub season_name: &'a str,
}

/// Rate for a single night: the first declared season containing `date`,
/// otherwise the base rate.
pub fn resolve_rate(config: &PricingConfig, date: NaiveDate) -> NightlyRate<'_> {
    config
        .seasons
        .iter()
        .find(|season| season.contains(date))
        .map_or(
            NightlyRate {
                rate: config.base_rate,
                season_name: BASE_SEASON,
            },
            |season| NightlyRate {
                rate: season.nightly_rate,
                season_name: &season.name,
            },
        )
}

/// Nights of one season within a stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCharge {
    pub season_name: String,
    pub nights: u32,
    /// Rate of the first night seen for this season.
    pub nightly_rate: u64,
    pub extra_occupant_charge: u64,
    /// Room charge for all nights plus `extra_occupant_charge`.
    pub subtotal: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedStay {
    /// One entry per season, in order of first night.
    pub breakdown: Vec<SeasonCharge>,
    pub nights: u32,
    pub total_extra_occupants: u32,
    pub total_price: u64,
}

/// Price every night of `range` for `occupants` guests.
pub fn price_stay(config: &PricingConfig, range: &DateRange, occupants: u32) -> Result<PricedStay> {
    if occupants < 1 {
        return Err(BookingError::InvalidOccupancy { occupants });
    }

    let overflow = || BookingError::PriceOverflow {
        nights: range.nights(),
        occupants,
    };

    let mut breakdown: Vec<SeasonCharge> = Vec::new();
    for night in range.nights_iter() {
        let NightlyRate { rate, season_name } = resolve_rate(config, night);
        if let Some(charge) = breakdown.iter_mut().find(|c| c.season_name == season_name) {
            charge.nights += 1;
            charge.subtotal = charge.subtotal.checked_add(rate).ok_or_else(overflow)?;
        } else {
            breakdown.push(SeasonCharge {
                season_name: season_name.to_string(),
                nights: 1,
                nightly_rate: rate,
                extra_occupant_charge: 0,
                subtotal: rate,
            });
        }
    }

    let extra_occupants = occupants.saturating_sub(config.base_occupancy);
    let mut total_price: u64 = 0;
    for charge in &mut breakdown {
        charge.extra_occupant_charge = u64::from(extra_occupants)
            .checked_mul(config.extra_occupant_rate)
            .and_then(|per_night| per_night.checked_mul(u64::from(charge.nights)))
            .ok_or_else(overflow)?;
        charge.subtotal = charge
            .subtotal
            .checked_add(charge.extra_occupant_charge)
            .ok_or_else(overflow)?;
        total_price = total_price.checked_add(charge.subtotal).ok_or_else(overflow)?;
    }

    Ok(PricedStay {
        total_price,
        nights: range.nights(),
        total_extra_occupants: extra_occupants,
        breakdown,
    })
}

impl std::fmt::Display for PricedStay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} nights, {} extra occupants",
            self.nights, self.total_extra_occupants
        )?;
        writeln!(
            f,
            "{:<20} {:>6} {:>8} {:>8} {:>10}",
            "Season", "Nights", "Rate", "Extra", "Subtotal"
        )?;
        writeln!(f, "{}", "-".repeat(56))?;
        for charge in &self.breakdown {
            writeln!(
                f,
                "{:<20} {:>6} {:>8} {:>8} {:>10}",
                charge.season_name,
                charge.nights,
                charge.nightly_rate,
                charge.extra_occupant_charge,
                charge.subtotal
            )?;
        }
        writeln!(f, "{}", "-".repeat(56))?;
        write!(f, "Total: {}", self.total_price)
    }
}
