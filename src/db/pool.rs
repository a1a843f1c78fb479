use super::{Db, DbResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime, Timeouts};
use std::str::FromStr;
use std::time::Duration;
use tokio_postgres::NoTls;

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_size: usize,
    /// Upper bound for waiting on a pooled connection and for any statement
    pub timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 16,
            timeout: Duration::from_millis(5000),
        }
    }
}

impl Db {
    pub fn new(url: &str, settings: PoolSettings) -> DbResult<Self> {
        let mut cfg = tokio_postgres::Config::from_str(url)?;
        cfg.connect_timeout(settings.timeout);
        cfg.options(&format!("-c statement_timeout={}", settings.timeout.as_millis()));

        let mgr = Manager::from_config(
            cfg,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(mgr)
            .max_size(settings.max_size)
            .timeouts(Timeouts {
                wait: Some(settings.timeout),
                create: Some(settings.timeout),
                recycle: Some(settings.timeout),
            })
            .runtime(Runtime::Tokio1)
            .build()?;

        Ok(Self { pool })
    }
}
