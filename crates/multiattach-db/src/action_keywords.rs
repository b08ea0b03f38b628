//! Action keyword store over `ir_action_keyword` and `ir_action_wizard`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use multiattach_core::{
    ActionId, ActionKeyword, ActionKeywordId, ActionKeywordStore, Error, NewActionKeyword,
    ResourceRef, Result,
};

use crate::unit_of_work::{active, PgUnitOfWork};

fn keyword_from_row(row: &PgRow) -> Result<ActionKeyword> {
    let binding: String = row.get("binding");
    Ok(ActionKeyword {
        id: row.get("id"),
        keyword: row.get("keyword"),
        binding: binding.parse()?,
        action: row.get("action_id"),
    })
}

#[async_trait]
impl ActionKeywordStore for PgUnitOfWork {
    async fn resolve_action(&self, name: &str) -> Result<Option<ActionId>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM ir_action_wizard WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)
    }

    async fn create_keyword(&self, req: NewActionKeyword) -> Result<ActionKeyword> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let row = sqlx::query(
            r#"
            INSERT INTO ir_action_keyword (keyword, binding, action_id)
            VALUES ($1, $2, $3)
            RETURNING id, keyword, binding, action_id
            "#,
        )
        .bind(&req.keyword)
        .bind(req.binding.to_string())
        .bind(req.action)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

        keyword_from_row(&row)
    }

    async fn get_keyword(&self, id: ActionKeywordId) -> Result<Option<ActionKeyword>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let row = sqlx::query(
            "SELECT id, keyword, binding, action_id FROM ir_action_keyword WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(keyword_from_row).transpose()
    }

    async fn rebind_keyword(&self, id: ActionKeywordId, binding: &ResourceRef) -> Result<()> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let result = sqlx::query("UPDATE ir_action_keyword SET binding = $2 WHERE id = $1")
            .bind(id)
            .bind(binding.to_string())
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("action keyword {id}")));
        }
        Ok(())
    }

    async fn delete_keywords(&self, ids: &[ActionKeywordId]) -> Result<()> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        // multiple_attachment.action_keyword_id is ON DELETE SET NULL
        sqlx::query("DELETE FROM ir_action_keyword WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_for_binding(&self, binding: &ResourceRef) -> Result<Vec<ActionKeyword>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let rows = sqlx::query(
            r#"
            SELECT id, keyword, binding, action_id
            FROM ir_action_keyword
            WHERE binding = $1
            ORDER BY id
            "#,
        )
        .bind(binding.to_string())
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(keyword_from_row).collect()
    }
}
