//! PostgreSQL unit of work.
//!
//! One [`PgUnitOfWork`] wraps one database transaction. Every store trait is
//! implemented on it (see the sibling modules), so a whole registry or wizard
//! operation reads and writes through the same transaction. Dropping the unit
//! without calling [`UnitOfWork::commit`] rolls the transaction back.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

use multiattach_core::{Error, Result, UnitOfWork};

pub(crate) type PgTransaction = Transaction<'static, Postgres>;

/// Unit of work backed by a single `sqlx` transaction.
pub struct PgUnitOfWork {
    tx: Mutex<Option<PgTransaction>>,
}

impl PgUnitOfWork {
    pub(crate) fn new(tx: PgTransaction) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, Option<PgTransaction>> {
        self.tx.lock().await
    }
}

/// The open transaction behind a locked unit of work.
pub(crate) fn active(slot: &mut Option<PgTransaction>) -> Result<&mut PgTransaction> {
    slot.as_mut()
        .ok_or_else(|| Error::Internal("unit of work already committed".to_string()))
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(&self) -> Result<()> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Internal("unit of work already committed".to_string()))?;
        tx.commit().await.map_err(Error::Database)?;
        debug!(
            subsystem = "database",
            component = "unit_of_work",
            op = "commit",
            "Transaction committed"
        );
        Ok(())
    }
}
