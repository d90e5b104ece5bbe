use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::availability::{MinimumStayRule, UnitOccupancy};
use crate::domain::pricing::PricingConfig;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub name: String,
}

/// Read-only view of the document store.
///
/// Implementations hand out snapshots; nothing in the core writes back.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn pricing(&self) -> Result<PricingConfig>;
    async fn units(&self) -> Result<Vec<Unit>>;
    /// Bookings and blocks for one unit.
    async fn occupancies(&self, unit_id: &str) -> Result<Vec<UnitOccupancy>>;
    async fn minimum_stay_rules(&self, unit_id: &str) -> Result<Vec<MinimumStayRule>>;
}
