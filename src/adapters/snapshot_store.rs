//! File-backed [`BookingStore`] over a YAML export of the document store.
//!
//! Dates in the export come in whatever shape the store wrote them; they are
//! normalised to calendar days here, at load, and nowhere else.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, Offset as _};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::availability::{MinimumStayRule, OccupancyKind, UnitOccupancy};
use crate::domain::date_range::{DateInput, DateRange};
use crate::domain::pricing::PricingConfig;
use crate::error::{BookingError, Result};
use crate::ports::booking_store::{BookingStore, Unit};

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    pricing: PricingConfig,
    #[serde(default)]
    units: Vec<Unit>,
    #[serde(default)]
    occupancies: Vec<RawOccupancy>,
    #[serde(default)]
    minimum_stay_rules: Vec<RawMinimumStayRule>,
}

#[derive(Debug, Deserialize)]
struct RawOccupancy {
    unit_id: String,
    start: DateInput,
    end: DateInput,
    #[serde(default = "default_kind")]
    kind: OccupancyKind,
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMinimumStayRule {
    unit_id: String,
    start: DateInput,
    /// Exclusive, like a checkout day.
    end: DateInput,
    min_nights: u32,
    #[serde(default)]
    priority: i32,
    #[serde(default = "default_true")]
    active: bool,
}

fn default_kind() -> OccupancyKind {
    OccupancyKind::Booking
}

fn default_true() -> bool {
    true
}

fn normalise_range(start: &DateInput, end: &DateInput, offset: FixedOffset) -> Result<DateRange> {
    DateRange::new(start.to_calendar_day(offset)?, end.to_calendar_day(offset)?)
}

/// Everything the core reads, with dates already normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub pricing: PricingConfig,
    pub units: Vec<Unit>,
    pub occupancies: Vec<UnitOccupancy>,
    pub minimum_stay_rules: Vec<MinimumStayRule>,
}

impl Snapshot {
    pub fn from_yaml(content: &str, offset: FixedOffset, reject_overlapping_seasons: bool) -> Result<Self> {
        let raw: RawSnapshot = serde_yml::from_str(content)?;
        raw.pricing.validate(reject_overlapping_seasons)?;

        let occupancies = raw
            .occupancies
            .into_iter()
            .enumerate()
            .map(|(i, o)| {
                let range = normalise_range(&o.start, &o.end, offset).map_err(|e| {
                    BookingError::Config(format!("occupancy #{i} for unit {}: {e}", o.unit_id))
                })?;
                Ok(UnitOccupancy {
                    unit_id: o.unit_id,
                    range,
                    kind: o.kind,
                    reference: o.reference,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let minimum_stay_rules = raw
            .minimum_stay_rules
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let range = normalise_range(&r.start, &r.end, offset).map_err(|e| {
                    BookingError::Config(format!(
                        "minimum stay rule #{i} for unit {}: {e}",
                        r.unit_id
                    ))
                })?;
                Ok(MinimumStayRule {
                    unit_id: r.unit_id,
                    range,
                    min_nights: r.min_nights,
                    priority: r.priority,
                    active: r.active,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let snapshot = Self {
            pricing: raw.pricing,
            units: raw.units,
            occupancies,
            minimum_stay_rules,
        };
        snapshot.warn_on_unknown_units();
        Ok(snapshot)
    }

    fn has_unit(&self, unit_id: &str) -> bool {
        self.units.iter().any(|u| u.id == unit_id)
    }

    fn warn_on_unknown_units(&self) {
        let referenced = self
            .occupancies
            .iter()
            .map(|o| o.unit_id.as_str())
            .chain(self.minimum_stay_rules.iter().map(|r| r.unit_id.as_str()));
        for unit_id in referenced {
            if !self.has_unit(unit_id) {
                warn!(unit_id, "Snapshot entry references a unit that is not listed");
            }
        }
    }
}

pub struct SnapshotStore {
    path: Option<PathBuf>,
    offset: FixedOffset,
    reject_overlapping_seasons: bool,
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn open(path: &Path, offset: FixedOffset, reject_overlapping_seasons: bool) -> Result<Self> {
        let snapshot = read_snapshot(path, offset, reject_overlapping_seasons)?;
        info!(
            path = %path.display(),
            units = snapshot.units.len(),
            occupancies = snapshot.occupancies.len(),
            rules = snapshot.minimum_stay_rules.len(),
            "Loaded booking snapshot"
        );
        Ok(Self {
            path: Some(path.to_path_buf()),
            offset,
            reject_overlapping_seasons,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// A store over an in-memory snapshot. `reload` is not available.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            path: None,
            offset: chrono::Utc.fix(),
            reject_overlapping_seasons: false,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Re-read the snapshot file. On failure the previous snapshot stays.
    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Err(BookingError::Config(
                "snapshot store has no backing file to reload".into(),
            ));
        };
        let snapshot = read_snapshot(path, self.offset, self.reject_overlapping_seasons)?;
        let mut current = self
            .current
            .write()
            .map_err(|_| BookingError::Config("snapshot lock poisoned on reload".into()))?;
        *current = Arc::new(snapshot);
        info!(path = %path.display(), "Reloaded booking snapshot");
        Ok(())
    }

    /// Re-read the file every `every` until the task is aborted. File I/O and
    /// parsing run on the blocking pool; a failed reload is logged and the
    /// last good snapshot keeps serving.
    pub fn spawn_reload(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let store = Arc::clone(&store);
                match tokio::task::spawn_blocking(move || store.reload()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Snapshot reload failed, keeping previous data: {e}"),
                    Err(e) => warn!("Snapshot reload task failed: {e}"),
                }
            }
        })
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.current
            .read()
            .map(|s| Arc::clone(&*s))
            .map_err(|_| BookingError::Config("snapshot lock poisoned".into()))
    }

    fn known_unit(&self, unit_id: &str) -> Result<Arc<Snapshot>> {
        let snapshot = self.snapshot()?;
        if !snapshot.has_unit(unit_id) {
            return Err(BookingError::UnitNotFound { id: unit_id.into() });
        }
        Ok(snapshot)
    }
}

fn read_snapshot(path: &Path, offset: FixedOffset, reject_overlapping_seasons: bool) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BookingError::Config(format!(
            "failed to read snapshot file {}: {e}",
            path.display()
        ))
    })?;
    Snapshot::from_yaml(&content, offset, reject_overlapping_seasons)
}

#[async_trait]
impl BookingStore for SnapshotStore {
    async fn pricing(&self) -> Result<PricingConfig> {
        Ok(self.snapshot()?.pricing.clone())
    }

    async fn units(&self) -> Result<Vec<Unit>> {
        Ok(self.snapshot()?.units.clone())
    }

    async fn occupancies(&self, unit_id: &str) -> Result<Vec<UnitOccupancy>> {
        let snapshot = self.known_unit(unit_id)?;
        Ok(snapshot
            .occupancies
            .iter()
            .filter(|o| o.unit_id == unit_id)
            .cloned()
            .collect())
    }

    async fn minimum_stay_rules(&self, unit_id: &str) -> Result<Vec<MinimumStayRule>> {
        let snapshot = self.known_unit(unit_id)?;
        Ok(snapshot
            .minimum_stay_rules
            .iter()
            .filter(|r| r.unit_id == unit_id)
            .cloned()
            .collect())
    }
}
