use crate::Registry;
use crate::models::gear::NewGear;
use crate::models::location::NewLocation;
use crate::models::types::LocationId;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// A whole inventory as written by hand: nested locations with the gear
/// inside them, plus gear that lives nowhere in particular.
#[derive(Debug, Default, Deserialize)]
pub struct InventoryYaml {
    #[serde(default)]
    pub locations: Vec<LocationYaml>,
    #[serde(default)]
    pub gear: Vec<GearYaml>,
}

#[derive(Debug, Deserialize)]
pub struct LocationYaml {
    pub name: String,                  // "Backpack"
    #[serde(rename = "type", default = "default_location_type")]
    pub kind: String,                  // "Container"
    #[serde(default)]
    pub items: Vec<GearYaml>,
    #[serde(default)]
    pub children: Vec<LocationYaml>,
}

#[derive(Debug, Deserialize)]
pub struct GearYaml {
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
}

impl GearYaml {
    fn to_new_gear(&self, location_id: Option<LocationId>) -> NewGear {
        NewGear {
            name: self.name.clone(),
            description: self.description.clone(),
            weight: self.weight,
            cost: self.cost,
            value: self.value,
            legality: self.legality.clone(),
            category: self.category.clone(),
            location_id,
        }
    }
}

fn default_location_type() -> String {
    "Generic".to_string()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub locations: usize,
    pub gear: usize,
}

pub fn load_inventory_file(path: &Path) -> Result<InventoryYaml> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let doc = serde_yaml::from_str(&text).with_context(|| format!("parsing YAML {}", path.display()))?;
    Ok(doc)
}

/// Creates everything in `doc` through the managers, parents before their
/// children. Stops at the first rejected record; what was created before it
/// stays.
pub async fn import_inventory(registry: &Registry, doc: &InventoryYaml) -> Result<ImportSummary> {
    let locations = &registry.services.location;
    let inventory = &registry.services.inventory;
    let mut summary = ImportSummary::default();

    let mut pending: Vec<(&LocationYaml, Option<LocationId>)> = doc.locations.iter().rev().map(|l| (l, None)).collect();
    while let Some((loc, parent_id)) = pending.pop() {
        let created = locations
            .create(NewLocation {
                name: loc.name.clone(),
                kind: loc.kind.clone(),
                parent_id,
            })
            .await
            .with_context(|| format!("creating location '{}'", loc.name))?;
        summary.locations += 1;

        for item in &loc.items {
            inventory
                .create(item.to_new_gear(Some(created.id)))
                .await
                .with_context(|| format!("creating gear '{}' in '{}'", item.name, loc.name))?;
            summary.gear += 1;
        }

        pending.extend(loc.children.iter().rev().map(|c| (c, Some(created.id))));
    }

    for item in &doc.gear {
        inventory
            .create(item.to_new_gear(None))
            .await
            .with_context(|| format!("creating gear '{}'", item.name))?;
        summary.gear += 1;
    }

    tracing::info!(locations = summary.locations, gear = summary.gear, "inventory imported");
    Ok(summary)
}
