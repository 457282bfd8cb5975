//! Runtime configuration.
//!
//! The table prefix lets several tenants share one database: every binding is
//! declared against `config.table_name("tags")` instead of the bare name.

use crate::error::{OrmError, OrmResult};
use std::env;

/// Environment variable holding the table prefix.
pub const ENV_TABLE_PREFIX: &str = "RELMAP_TABLE_PREFIX";
/// Environment variable holding the PostgreSQL connection URL.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Environment variable holding the pool size.
pub const ENV_POOL_MAX_SIZE: &str = "RELMAP_POOL_MAX_SIZE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelmapConfig {
    table_prefix: String,
    database_url: Option<String>,
    pool_max_size: usize,
}

impl Default for RelmapConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            database_url: None,
            pool_max_size: 16,
        }
    }
}

impl RelmapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `RELMAP_TABLE_PREFIX`, `DATABASE_URL` and `RELMAP_POOL_MAX_SIZE`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> OrmResult<Self> {
        let mut config = Self::default();
        if let Ok(prefix) = env::var(ENV_TABLE_PREFIX) {
            config.table_prefix = prefix;
        }
        if let Ok(url) = env::var(ENV_DATABASE_URL) {
            config.database_url = Some(url);
        }
        if let Ok(size) = env::var(ENV_POOL_MAX_SIZE) {
            config.pool_max_size = size.trim().parse().map_err(|e| {
                OrmError::configuration(format!("{ENV_POOL_MAX_SIZE}={size:?}: {e}"))
            })?;
        }
        tracing::debug!(
            target: "relmap.repo",
            table_prefix = %config.table_prefix,
            pool_max_size = config.pool_max_size,
            has_database_url = config.database_url.is_some(),
            "loaded configuration from environment"
        );
        Ok(config)
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_pool_max_size(mut self, size: usize) -> Self {
        self.pool_max_size = size;
        self
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn pool_max_size(&self) -> usize {
        self.pool_max_size
    }

    /// `<prefix><name>`.
    pub fn table_name(&self, name: &str) -> String {
        format!("{}{name}", self.table_prefix)
    }

    /// Build a pool from the configured URL and size.
    #[cfg(feature = "pool")]
    pub fn create_pool(&self) -> OrmResult<deadpool_postgres::Pool> {
        let url = self
            .database_url
            .as_deref()
            .ok_or_else(|| OrmError::configuration(format!("{ENV_DATABASE_URL} is not set")))?;
        crate::pool::create_pool_with_config(url, self.pool_max_size)
    }
}
