use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::date_range::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyKind {
    /// A confirmed guest reservation.
    Booking,
    /// Dates the owner closed by hand.
    Block,
}

impl std::fmt::Display for OccupancyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Booking => write!(f, "Booking"),
            Self::Block => write!(f, "Blocked"),
        }
    }
}

/// A booking or a block holding a unit for a range of nights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOccupancy {
    pub unit_id: String,
    pub range: DateRange,
    pub kind: OccupancyKind,
    /// Booking number or block note, if the store has one.
    #[serde(default)]
    pub reference: Option<String>,
}

/// Entries for `unit_id` that overlap `candidate`.
pub fn conflicts<'a>(
    existing: &'a [UnitOccupancy],
    unit_id: &str,
    candidate: &DateRange,
) -> Vec<&'a UnitOccupancy> {
    existing
        .iter()
        .filter(|o| o.unit_id == unit_id && o.range.overlaps(candidate))
        .collect()
}

pub fn is_range_free(existing: &[UnitOccupancy], unit_id: &str, candidate: &DateRange) -> bool {
    !existing
        .iter()
        .any(|o| o.unit_id == unit_id && o.range.overlaps(candidate))
}

/// The units from `unit_ids` that are free for `candidate`, in input order.
pub fn free_units<'a>(
    existing: &[UnitOccupancy],
    unit_ids: &'a [String],
    candidate: &DateRange,
) -> Vec<&'a str> {
    unit_ids
        .iter()
        .filter(|id| is_range_free(existing, id, candidate))
        .map(String::as_str)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumStayRule {
    pub unit_id: String,
    /// Arrival window the rule applies to.
    pub range: DateRange,
    pub min_nights: u32,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Minimum nights for a stay arriving on `candidate.start()`.
///
/// Only the arrival day is matched against rule windows, so a stay that
/// starts before a window and runs into it is governed by the rules (or the
/// default) in force on arrival. Among matching active rules the highest
/// priority wins, then the earliest window start, then declaration order.
pub fn resolve_minimum_stay(
    rules: &[MinimumStayRule],
    unit_id: &str,
    candidate: &DateRange,
    global_default: u32,
) -> u32 {
    let arrival = candidate.start();
    let winner = rules
        .iter()
        .filter(|r| r.active && r.unit_id == unit_id && r.range.contains(arrival))
        .min_by_key(|r| (std::cmp::Reverse(r.priority), r.range.start()));

    match winner {
        Some(rule) => {
            debug!(
                unit_id,
                %arrival,
                min_nights = rule.min_nights,
                priority = rule.priority,
                "Minimum stay rule matched"
            );
            rule.min_nights
        }
        None => global_default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{block, booking, range, rule};

    #[test]
    fn overlapping_booking_conflicts() {
        let existing = vec![booking("lakeside", "2025-07-04", "2025-07-10")];
        let candidate = range("2025-07-01", "2025-07-05");
        assert!(!is_range_free(&existing, "lakeside", &candidate));
        assert_eq!(conflicts(&existing, "lakeside", &candidate).len(), 1);
    }

    #[test]
    fn same_day_turnover_is_free() {
        let existing = vec![booking("lakeside", "2025-07-05", "2025-07-10")];
        let candidate = range("2025-07-01", "2025-07-05");
        assert!(is_range_free(&existing, "lakeside", &candidate));
        assert!(conflicts(&existing, "lakeside", &candidate).is_empty());
    }

    #[test]
    fn checkout_on_arrival_day_is_free() {
        let existing = vec![booking("lakeside", "2025-06-25", "2025-07-01")];
        assert!(is_range_free(
            &existing,
            "lakeside",
            &range("2025-07-01", "2025-07-05")
        ));
    }

    #[test]
    fn other_units_are_ignored() {
        let existing = vec![booking("forest", "2025-07-01", "2025-07-10")];
        assert!(is_range_free(
            &existing,
            "lakeside",
            &range("2025-07-02", "2025-07-04")
        ));
    }

    #[test]
    fn blocks_conflict_like_bookings() {
        let existing = vec![
            booking("lakeside", "2025-07-01", "2025-07-03"),
            block("lakeside", "2025-07-08", "2025-07-12"),
        ];
        let candidate = range("2025-07-02", "2025-07-09");
        let found = conflicts(&existing, "lakeside", &candidate);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].kind, OccupancyKind::Block);
    }

    #[test]
    fn empty_snapshot_is_free() {
        assert!(is_range_free(&[], "lakeside", &range("2025-07-01", "2025-07-02")));
    }

    #[test]
    fn free_units_keeps_input_order() {
        let existing = vec![booking("forest", "2025-07-01", "2025-07-10")];
        let units = vec!["meadow".to_string(), "forest".to_string(), "lakeside".to_string()];
        let free = free_units(&existing, &units, &range("2025-07-03", "2025-07-05"));
        assert_eq!(free, vec!["meadow", "lakeside"]);
    }

    #[test]
    fn higher_priority_rule_wins() {
        let rules = vec![
            rule("lakeside", "2025-07-01", "2025-08-01", 2, 0),
            rule("lakeside", "2025-07-15", "2025-08-01", 5, 5),
        ];
        assert_eq!(
            resolve_minimum_stay(&rules, "lakeside", &range("2025-07-20", "2025-07-27"), 1),
            5
        );
        assert_eq!(
            resolve_minimum_stay(&rules, "lakeside", &range("2025-07-10", "2025-07-12"), 1),
            2
        );
    }

    #[test]
    fn priority_tie_broken_by_earliest_start() {
        let rules = vec![
            rule("lakeside", "2025-07-10", "2025-08-01", 4, 1),
            rule("lakeside", "2025-07-01", "2025-08-01", 3, 1),
        ];
        assert_eq!(
            resolve_minimum_stay(&rules, "lakeside", &range("2025-07-15", "2025-07-20"), 1),
            3
        );
    }

    #[test]
    fn full_tie_keeps_first_declared() {
        let rules = vec![
            rule("lakeside", "2025-07-01", "2025-08-01", 4, 1),
            rule("lakeside", "2025-07-01", "2025-08-01", 6, 1),
        ];
        assert_eq!(
            resolve_minimum_stay(&rules, "lakeside", &range("2025-07-15", "2025-07-20"), 1),
            4
        );
    }

    #[test]
    fn inactive_and_foreign_rules_ignored() {
        let mut inactive = rule("lakeside", "2025-07-01", "2025-08-01", 7, 9);
        inactive.active = false;
        let rules = vec![inactive, rule("forest", "2025-07-01", "2025-08-01", 6, 9)];
        assert_eq!(
            resolve_minimum_stay(&rules, "lakeside", &range("2025-07-15", "2025-07-20"), 2),
            2
        );
    }

    #[test]
    fn global_default_when_nothing_matches() {
        assert_eq!(
            resolve_minimum_stay(&[], "lakeside", &range("2025-03-01", "2025-03-02"), 2),
            2
        );
    }

    #[test]
    fn rule_matches_on_arrival_day_only() {
        let rules = vec![rule("lakeside", "2025-07-15", "2025-08-01", 7, 0)];
        // Arrives before the window and runs into it: the rule does not apply.
        assert_eq!(
            resolve_minimum_stay(&rules, "lakeside", &range("2025-07-13", "2025-07-17"), 2),
            2
        );
        // Arrives on the window's last day.
        assert_eq!(
            resolve_minimum_stay(&rules, "lakeside", &range("2025-07-31", "2025-08-02"), 2),
            7
        );
        // The window end is exclusive.
        assert_eq!(
            resolve_minimum_stay(&rules, "lakeside", &range("2025-08-01", "2025-08-03"), 2),
            2
        );
    }

    #[test]
    fn min_stay_rule_defaults_from_yaml() {
        let yaml = "unit_id: lakeside\nrange:\n  start: 2025-07-01\n  end: 2025-08-01\nmin_nights: 3\n";
        let parsed: MinimumStayRule = serde_yml::from_str(yaml).unwrap();
        assert!(parsed.active);
        assert_eq!(parsed.priority, 0);
        assert_eq!(parsed.min_nights, 3);
    }
}
