use crate::db::DbResult;
use crate::error::{AppResult, DomainError};
use crate::models::gear::Gear;
use crate::models::patch::Patch;
use crate::models::types::LocationId;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// A place gear can live in: a body slot, a container, or anything else.
/// Locations form a forest through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// Free-form category, e.g. "Body Slot", "Container", "Generic"
    #[serde(rename = "type")]
    pub kind: String,
    pub parent_id: Option<LocationId>,
}

impl Location {
    pub fn try_from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            kind: row.try_get("type")?,
            parent_id: row.try_get("parent_id")?,
        })
    }

    /// Reads the `loc_*` columns of a gear/location join. `None` when the
    /// gear row has no location.
    pub fn try_from_joined_row(row: &Row) -> DbResult<Option<Self>> {
        let Some(id) = row.try_get::<_, Option<LocationId>>("loc_id")? else {
            return Ok(None);
        };
        Ok(Some(Self {
            id,
            name: row.try_get("loc_name")?,
            kind: row.try_get("loc_type")?,
            parent_id: row.try_get("loc_parent_id")?,
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLocation {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parent_id: Option<LocationId>,
}

impl NewLocation {
    pub fn validate(&self) -> AppResult<()> {
        validate_name(&self.name)
    }
}

/// Partial update for a location. PUT and PATCH both use this shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocationPatch {
    pub name: Patch<String>,
    #[serde(rename = "type")]
    pub kind: Patch<String>,
    pub parent_id: Patch<Option<LocationId>>,
}

impl LocationPatch {
    pub fn is_empty(&self) -> bool {
        !(self.name.is_set() || self.kind.is_set() || self.parent_id.is_set())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(DomainError::EmptyUpdate);
        }
        if let Some(name) = self.name.as_set() {
            validate_name(name)?;
        }
        Ok(())
    }

    pub fn apply(self, loc: &mut Location) {
        self.name.apply_to(&mut loc.name);
        self.kind.apply_to(&mut loc.kind);
        self.parent_id.apply_to(&mut loc.parent_id);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    /// Exact type
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl LocationFilter {
    /// Empty strings from a query string mean "no filter".
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.filter(|s| !s.is_empty()),
            kind: self.kind.filter(|s| !s.is_empty()),
        }
    }

    pub fn matches(&self, loc: &Location) -> bool {
        let name_ok = self
            .name
            .as_deref()
            .is_none_or(|n| loc.name.to_lowercase().contains(&n.to_lowercase()));
        let kind_ok = self.kind.as_deref().is_none_or(|k| loc.kind == k);
        name_ok && kind_ok
    }
}

/// A location with everything nested below it.
#[derive(Debug, Clone, Serialize)]
pub struct LocationTree {
    #[serde(flatten)]
    pub location: Location,
    pub items: Vec<Gear>,
    pub children: Vec<LocationTree>,
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name", "cannot be empty"));
    }
    Ok(())
}
