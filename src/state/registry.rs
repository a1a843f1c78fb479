use crate::config::{Config, StoreKind};
use crate::db::repo::{
    AccountRepo, AccountRepository, GearRepo, GearRepository, LocationRepo, LocationRepository, MemoryStore,
};
use crate::db::{Db, PoolSettings};
use crate::error::InfraError;
use crate::services::{AccountService, AuthService, InventoryService, LocationService};
use std::sync::Arc;

pub struct Repos {
    pub account: Arc<dyn AccountRepo>,
    pub location: Arc<dyn LocationRepo>,
    pub gear: Arc<dyn GearRepo>,
}

impl Repos {
    pub fn postgres(db: Arc<Db>) -> Self {
        Self {
            account: Arc::new(AccountRepository::new(db.clone())),
            location: Arc::new(LocationRepository::new(db.clone())),
            gear: Arc::new(GearRepository::new(db)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            account: store.clone(),
            location: store.clone(),
            gear: store,
        }
    }
}

pub struct Services {
    pub account: Arc<AccountService>,
    pub auth: Arc<AuthService>,
    pub location: Arc<LocationService>,
    pub inventory: Arc<InventoryService>,
}

/// Everything a request needs, built once at startup and shared.
pub struct Registry {
    /// `None` when running on the in-memory store
    pub db: Option<Arc<Db>>,
    pub repos: Arc<Repos>,
    pub services: Arc<Services>,
    pub config: Arc<Config>,
}

impl Registry {
    /// Connects to the configured store. PostgreSQL migrations run here.
    pub async fn connect(config: Arc<Config>) -> Result<Self, InfraError> {
        match config.store {
            StoreKind::Postgres => {
                let settings = PoolSettings {
                    max_size: config.db_pool_size,
                    timeout: config.db_timeout(),
                };
                let db = Arc::new(Db::new(&config.database_url, settings)?);
                db.init().await?;

                let repos = Repos::postgres(db.clone());
                Self::with_repos(Some(db), repos, config)
            }
            StoreKind::Memory => {
                tracing::warn!("using the in-memory store, nothing will be persisted");
                Self::in_memory(config)
            }
        }
    }

    pub fn in_memory(config: Arc<Config>) -> Result<Self, InfraError> {
        Self::with_repos(None, Repos::memory(Arc::new(MemoryStore::new())), config)
    }

    pub fn with_repos(db: Option<Arc<Db>>, repos: Repos, config: Arc<Config>) -> Result<Self, InfraError> {
        let repos = Arc::new(repos);

        let services = Arc::new(Services {
            account: Arc::new(AccountService::with_params(
                repos.account.clone(),
                config.argon2_params()?,
            )),
            auth: Arc::new(AuthService::new(config.jwt_secret_key.as_bytes(), config.token_ttl())),
            location: Arc::new(LocationService::new(repos.location.clone(), repos.gear.clone())),
            inventory: Arc::new(InventoryService::new(repos.gear.clone())),
        });

        Ok(Self {
            db,
            repos,
            services,
            config,
        })
    }
}
