//! Registry store over `multiple_attachment`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use multiattach_core::{
    map_unique_violation, ActionKeywordId, EntryId, Error, RegistryEntry, RegistryStore, Result,
};

use crate::unit_of_work::{active, PgUnitOfWork};

const ENTRY_COLUMNS: &str = "id, model, action_keyword_id, created_at, updated_at";

fn entry_from_row(row: &PgRow) -> RegistryEntry {
    RegistryEntry {
        id: row.get("id"),
        model: row.get("model"),
        action: row.get("action_keyword_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl RegistryStore for PgUnitOfWork {
    async fn insert_entry(&self, model: &str) -> Result<RegistryEntry> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let row = sqlx::query(&format!(
            "INSERT INTO multiple_attachment (model) VALUES ($1) RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(model)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_unique_violation(e, model))?;

        Ok(entry_from_row(&row))
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<RegistryEntry>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM multiple_attachment WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(entry_from_row))
    }

    async fn find_entry_by_model(&self, model: &str) -> Result<Option<RegistryEntry>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM multiple_attachment WHERE model = $1"
        ))
        .bind(model)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(entry_from_row))
    }

    async fn list_entries(&self) -> Result<Vec<RegistryEntry>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM multiple_attachment ORDER BY id"
        ))
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(entry_from_row).collect())
    }

    async fn update_entry_model(&self, id: EntryId, model: &str) -> Result<RegistryEntry> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE multiple_attachment
            SET model = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(model)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_unique_violation(e, model))?;

        row.as_ref()
            .map(entry_from_row)
            .ok_or_else(|| Error::NotFound(format!("registry entry {id}")))
    }

    async fn set_entry_action(&self, id: EntryId, action: Option<ActionKeywordId>) -> Result<()> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let result = sqlx::query(
            r#"
            UPDATE multiple_attachment
            SET action_keyword_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(action)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("registry entry {id}")));
        }
        Ok(())
    }

    async fn delete_entries(&self, ids: &[EntryId]) -> Result<()> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query("DELETE FROM multiple_attachment WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
