use crate::db::DbResult;
use crate::models::gear::Gear;
use crate::models::location::{Location, LocationFilter, LocationPatch, NewLocation};
use crate::models::types::LocationId;

/// A location, everything below it, and the gear stored anywhere in that
/// set, read from one consistent snapshot. `locations[0]` is the root.
#[derive(Debug, Clone)]
pub struct Subtree {
    pub locations: Vec<Location>,
    pub gear: Vec<Gear>,
}

#[async_trait::async_trait]
pub trait LocationRepo: Send + Sync {
    /// Fails with `DbError::ForeignKey` when `parent_id` does not resolve
    async fn insert(&self, new: &NewLocation) -> DbResult<Location>;

    async fn get(&self, id: LocationId) -> DbResult<Option<Location>>;

    /// Ordered by id
    async fn list(&self, filter: &LocationFilter) -> DbResult<Vec<Location>>;

    /// Applies the supplied fields atomically. `None` when the location does
    /// not exist, `DbError::ForeignKey` for an unknown parent and
    /// `DbError::Cycle` when the new parent sits below this location.
    async fn update(&self, id: LocationId, patch: LocationPatch) -> DbResult<Option<Location>>;

    /// Deletes the location and, in the same transaction, detaches its child
    /// locations and the gear stored in it. `false` when it did not exist.
    async fn delete(&self, id: LocationId) -> DbResult<bool>;

    async fn subtree(&self, id: LocationId) -> DbResult<Option<Subtree>>;
}
