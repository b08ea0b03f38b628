//! # multiattach-db
//!
//! PostgreSQL persistence layer for multiattach.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgUnitOfWork`], implementing every store trait of `multiattach-core`
//!   over one transaction
//! - Schema migrations (behind the `migrations` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use multiattach_db::{Backend, Database, RegistryManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/multiattach").await?;
//!
//!     let uow = db.begin().await?;
//!     let entry = RegistryManager::new(uow.as_ref()).create("party.party").await?;
//!     RegistryManager::new(uow.as_ref()).create_wizard(&[entry.id]).await?;
//!     uow.commit().await?;
//!     Ok(())
//! }
//! ```

mod action_keywords;
mod attachments;
mod catalog;
mod entries;
pub mod pool;
pub mod unit_of_work;
mod views;

// Always compiled so integration tests (in tests/) can use the fixtures.
pub mod test_fixtures;

use async_trait::async_trait;
use tracing::debug;

// Re-export core types
pub use multiattach_core::*;

pub use pool::{create_pool, log_pool_metrics, PoolConfig};
pub use unit_of_work::PgUnitOfWork;

/// Escape LIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// PostgreSQL [`Backend`].
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self { pool }
    }

    /// Connect with the default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, PoolConfig::default()).await
    }

    /// Connect with a custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool(url, &config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

#[async_trait]
impl Backend for Database {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(Error::Database)?;
        debug!(
            subsystem = "database",
            component = "unit_of_work",
            op = "begin",
            "Transaction started"
        );
        Ok(Box::new(PgUnitOfWork::new(tx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("party.party"), "party.party");
        assert_eq!(escape_like("sale_line"), "sale\\_line");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
