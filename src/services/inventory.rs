use crate::db::repo::GearRepo;
use crate::error::{AppResult, DomainError};
use crate::models::gear::{Gear, GearFilter, GearPatch, NewGear};
use crate::models::types::GearId;
use std::sync::Arc;

/// Gear inventory manager.
pub struct InventoryService {
    repo: Arc<dyn GearRepo>,
}

impl InventoryService {
    pub fn new(repo: Arc<dyn GearRepo>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, new: NewGear) -> AppResult<Gear> {
        new.validate()?;

        let gear = self.repo.insert(&new).await?;
        tracing::debug!(id = %gear.id, name = %gear.name, "gear created");
        Ok(gear)
    }

    pub async fn get(&self, id: GearId) -> AppResult<Gear> {
        self.repo.get(id).await?.ok_or_else(|| DomainError::not_found("Gear item", id))
    }

    pub async fn list(&self, filter: GearFilter) -> AppResult<Vec<Gear>> {
        Ok(self.repo.list(&filter.normalized()).await?)
    }

    pub async fn update(&self, id: GearId, patch: GearPatch) -> AppResult<Gear> {
        patch.validate()?;

        let gear = self
            .repo
            .update(id, patch)
            .await?
            .ok_or_else(|| DomainError::not_found("Gear item", id))?;
        tracing::debug!(%id, "gear updated");
        Ok(gear)
    }

    pub async fn delete(&self, id: GearId) -> AppResult<bool> {
        let deleted = self.repo.delete(id).await?;
        if deleted {
            tracing::info!(%id, "gear deleted");
        }
        Ok(deleted)
    }
}
