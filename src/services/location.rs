use crate::db::repo::{GearRepo, LocationRepo, Subtree};
use crate::error::{AppResult, DomainError};
use crate::models::gear::Gear;
use crate::models::location::{Location, LocationFilter, LocationPatch, LocationTree, NewLocation};
use crate::models::patch::Patch;
use crate::models::types::LocationId;
use std::collections::HashMap;
use std::sync::Arc;

/// Location hierarchy manager.
pub struct LocationService {
    repo: Arc<dyn LocationRepo>,
    gear_repo: Arc<dyn GearRepo>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepo>, gear_repo: Arc<dyn GearRepo>) -> Self {
        Self { repo, gear_repo }
    }

    pub async fn create(&self, new: NewLocation) -> AppResult<Location> {
        new.validate()?;

        let location = self.repo.insert(&new).await?;
        tracing::debug!(id = %location.id, name = %location.name, "location created");
        Ok(location)
    }

    pub async fn get(&self, id: LocationId) -> AppResult<Location> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Location", id))
    }

    pub async fn list(&self, filter: LocationFilter) -> AppResult<Vec<Location>> {
        Ok(self.repo.list(&filter.normalized()).await?)
    }

    /// Applies only the supplied fields. PUT and PATCH both land here.
    pub async fn update(&self, id: LocationId, patch: LocationPatch) -> AppResult<Location> {
        patch.validate()?;
        if patch.parent_id == Patch::Set(Some(id)) {
            return Err(DomainError::SelfParent(id.get()));
        }

        let location = self
            .repo
            .update(id, patch)
            .await?
            .ok_or_else(|| DomainError::not_found("Location", id))?;
        tracing::debug!(%id, "location updated");
        Ok(location)
    }

    /// Child locations and stored gear are detached, never deleted.
    pub async fn delete(&self, id: LocationId) -> AppResult<bool> {
        let deleted = self.repo.delete(id).await?;
        if deleted {
            tracing::info!(%id, "location deleted");
        }
        Ok(deleted)
    }

    /// Gear stored directly in the location, not in its children.
    pub async fn items_in(&self, id: LocationId) -> AppResult<Vec<Gear>> {
        self.gear_repo
            .in_location(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Location", id))
    }

    pub async fn tree(&self, id: LocationId) -> AppResult<LocationTree> {
        let subtree = self
            .repo
            .subtree(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Location", id))?;

        build_tree(subtree).ok_or_else(|| DomainError::Internal(format!("subtree of location {id} has no root")))
    }
}

/// Assembles the nested view from the flat subtree. `locations` is ordered
/// root first with every parent ahead of its children, so folding it in
/// reverse always finishes a node's children before the node itself.
fn build_tree(subtree: Subtree) -> Option<LocationTree> {
    let Subtree { locations, gear } = subtree;

    let index: HashMap<LocationId, usize> = locations.iter().enumerate().map(|(i, l)| (l.id, i)).collect();

    let mut items: Vec<Vec<Gear>> = vec![Vec::new(); locations.len()];
    for g in gear {
        if let Some(&slot) = g.location_id.and_then(|l| index.get(&l)) {
            items[slot].push(g);
        }
    }

    let parents: Vec<Option<usize>> = locations
        .iter()
        .enumerate()
        .map(|(i, l)| if i == 0 { None } else { l.parent_id.and_then(|p| index.get(&p).copied()) })
        .collect();

    let mut nodes: Vec<Option<LocationTree>> = locations
        .into_iter()
        .zip(items)
        .map(|(location, items)| {
            Some(LocationTree {
                location,
                items,
                children: Vec::new(),
            })
        })
        .collect();

    for i in (1..nodes.len()).rev() {
        let (Some(parent), Some(node)) = (parents[i], nodes[i].take()) else {
            continue;
        };
        if let Some(p) = nodes[parent].as_mut() {
            p.children.push(node);
        }
    }

    let mut root = nodes.into_iter().next().flatten()?;
    sort_children(&mut root);
    Some(root)
}

fn sort_children(node: &mut LocationTree) {
    node.children.sort_by_key(|c| c.location.id);
    for child in &mut node.children {
        sort_children(child);
    }
}
