use crate::db::DbResult;
use crate::error::{AppResult, DomainError};
use crate::models::location::Location;
use crate::models::patch::Patch;
use crate::models::types::{GearId, LocationId};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// A gear item as stored, plus a snapshot of its location taken when the
/// row was read. The snapshot is never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gear {
    pub id: GearId,
    pub name: String,
    pub description: Option<String>,
    /// Weight in lbs
    pub weight: f64,
    pub cost: Option<f64>,
    pub value: Option<f64>,
    /// E.g. "Legal", "Restricted"
    pub legality: Option<String>,
    pub category: Option<String>,
    pub location_id: Option<LocationId>,
    pub location: Option<Location>,
}

impl Gear {
    /// Decodes a row of `gear g LEFT JOIN locations l`, see `GEAR_SELECT`.
    pub fn try_from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            weight: row.try_get("weight")?,
            cost: row.try_get("cost")?,
            value: row.try_get("value")?,
            legality: row.try_get("legality")?,
            category: row.try_get("category")?,
            location_id: row.try_get("location_id")?,
            location: Location::try_from_joined_row(row)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGear {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub weight: f64,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub legality: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

impl NewGear {
    pub fn validate(&self) -> AppResult<()> {
        validate_name(&self.name)?;
        validate_amount("weight", self.weight)?;
        if let Some(cost) = self.cost {
            validate_amount("cost", cost)?;
        }
        if let Some(value) = self.value {
            validate_amount("value", value)?;
        }
        Ok(())
    }
}

/// Partial update for a gear item. Nullable columns take `Patch<Option<_>>`
/// so a client can clear them with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GearPatch {
    pub name: Patch<String>,
    pub description: Patch<Option<String>>,
    pub weight: Patch<f64>,
    pub cost: Patch<Option<f64>>,
    pub value: Patch<Option<f64>>,
    pub legality: Patch<Option<String>>,
    pub category: Patch<Option<String>>,
    pub location_id: Patch<Option<LocationId>>,
}

impl GearPatch {
    pub fn is_empty(&self) -> bool {
        !(self.name.is_set()
            || self.description.is_set()
            || self.weight.is_set()
            || self.cost.is_set()
            || self.value.is_set()
            || self.legality.is_set()
            || self.category.is_set()
            || self.location_id.is_set())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(DomainError::EmptyUpdate);
        }
        if let Some(name) = self.name.as_set() {
            validate_name(name)?;
        }
        if let Some(weight) = self.weight.as_set() {
            validate_amount("weight", *weight)?;
        }
        if let Some(Some(cost)) = self.cost.as_set() {
            validate_amount("cost", *cost)?;
        }
        if let Some(Some(value)) = self.value.as_set() {
            validate_amount("value", *value)?;
        }
        Ok(())
    }

    /// Applies the supplied fields. The embedded location snapshot is left
    /// for the store to refresh.
    pub fn apply(self, gear: &mut Gear) {
        self.name.apply_to(&mut gear.name);
        self.description.apply_to(&mut gear.description);
        self.weight.apply_to(&mut gear.weight);
        self.cost.apply_to(&mut gear.cost);
        self.value.apply_to(&mut gear.value);
        self.legality.apply_to(&mut gear.legality);
        self.category.apply_to(&mut gear.category);
        self.location_id.apply_to(&mut gear.location_id);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GearFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    /// Exact category
    pub category: Option<String>,
}

impl GearFilter {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.filter(|s| !s.is_empty()),
            category: self.category.filter(|s| !s.is_empty()),
        }
    }

    pub fn matches(&self, gear: &Gear) -> bool {
        let name_ok = self
            .name
            .as_deref()
            .is_none_or(|n| gear.name.to_lowercase().contains(&n.to_lowercase()));
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|c| gear.category.as_deref() == Some(c));
        name_ok && category_ok
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name", "cannot be empty"));
    }
    Ok(())
}

fn validate_amount(field: &'static str, v: f64) -> AppResult<()> {
    if !v.is_finite() {
        return Err(DomainError::validation(field, "must be a finite number"));
    }
    if v < 0.0 {
        return Err(DomainError::validation(field, "must be greater than or equal to 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rope() -> Gear {
        Gear {
            id: GearId(1),
            name: "Rope".into(),
            description: Some("50ft hemp".into()),
            weight: 2.0,
            cost: Some(1.0),
            value: None,
            legality: Some("Legal".into()),
            category: Some("Adventuring Gear".into()),
            location_id: Some(LocationId(2)),
            location: None,
        }
    }

    #[test]
    fn weight_is_required() {
        assert!(serde_json::from_str::<NewGear>(r#"{"name": "Heavy Rock"}"#).is_err());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let g: NewGear = serde_json::from_str(r#"{"name": "Rock", "weight": -1}"#).unwrap();
        assert!(matches!(g.validate(), Err(DomainError::Validation { field: "weight", .. })));

        let g: NewGear = serde_json::from_str(r#"{"name": "Rock", "weight": 0, "cost": -0.5}"#).unwrap();
        assert!(matches!(g.validate(), Err(DomainError::Validation { field: "cost", .. })));

        let g: NewGear = serde_json::from_str(r#"{"name": "Rock", "weight": 0, "value": 0}"#).unwrap();
        assert!(g.validate().is_ok());
    }

    #[test]
    fn patch_touches_only_supplied_fields() {
        let mut g = rope();
        let before = g.clone();
        let p: GearPatch = serde_json::from_str(r#"{"description": "Patched"}"#).unwrap();
        p.validate().unwrap();
        p.apply(&mut g);

        assert_eq!(g.description.as_deref(), Some("Patched"));
        assert_eq!(g.name, before.name);
        assert_eq!(g.weight.to_bits(), before.weight.to_bits());
        assert_eq!(g.cost, before.cost);
        assert_eq!(g.category, before.category);
        assert_eq!(g.location_id, before.location_id);
    }

    #[test]
    fn patch_can_clear_location_with_null() {
        let mut g = rope();
        let p: GearPatch = serde_json::from_str(r#"{"location_id": null}"#).unwrap();
        p.validate().unwrap();
        p.apply(&mut g);
        assert_eq!(g.location_id, None);
    }

    #[test]
    fn patch_rejects_null_weight_and_empty_body() {
        assert!(serde_json::from_str::<GearPatch>(r#"{"weight": null}"#).is_err());
        let p: GearPatch = serde_json::from_str("{}").unwrap();
        assert!(matches!(p.validate(), Err(DomainError::EmptyUpdate)));
    }

    #[test]
    fn filter_composes_with_and() {
        let g = rope();
        let f = GearFilter {
            name: Some("ROP".into()),
            category: Some("Adventuring Gear".into()),
        };
        assert!(f.matches(&g));
        let f = GearFilter {
            name: Some("rop".into()),
            category: Some("Weapon".into()),
        };
        assert!(!f.matches(&g));
        assert!(GearFilter::default().matches(&g));
    }
}
