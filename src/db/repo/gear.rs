use crate::db::DbResult;
use crate::models::gear::{Gear, GearFilter, GearPatch, NewGear};
use crate::models::types::{GearId, LocationId};

#[async_trait::async_trait]
pub trait GearRepo: Send + Sync {
    /// Fails with `DbError::ForeignKey` when `location_id` does not resolve
    async fn insert(&self, new: &NewGear) -> DbResult<Gear>;

    async fn get(&self, id: GearId) -> DbResult<Option<Gear>>;

    /// Ordered by id, each item carrying its location snapshot
    async fn list(&self, filter: &GearFilter) -> DbResult<Vec<Gear>>;

    /// Items stored directly in `location_id`; `None` when the location
    /// itself does not exist.
    async fn in_location(&self, location_id: LocationId) -> DbResult<Option<Vec<Gear>>>;

    async fn update(&self, id: GearId, patch: GearPatch) -> DbResult<Option<Gear>>;

    async fn delete(&self, id: GearId) -> DbResult<bool>;
}
