//! Attachment store over `ir_attachment`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use multiattach_core::{
    Attachment, AttachmentId, AttachmentStore, Error, NewAttachment, ResourceRef, Result,
};

use crate::escape_like;
use crate::unit_of_work::{active, PgTransaction, PgUnitOfWork};

const ATTACHMENT_COLUMNS: &str = "id, resource, name, content, link, description, created_at";

fn attachment_from_row(row: &PgRow) -> Result<Attachment> {
    let resource: String = row.get("resource");
    Ok(Attachment {
        id: row.get("id"),
        resource: resource.parse()?,
        name: row.get("name"),
        content: row.get("content"),
        link: row.get("link"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    })
}

async fn insert(tx: &mut PgTransaction, req: NewAttachment) -> Result<Attachment> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO ir_attachment (resource, name, content, link, description)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ATTACHMENT_COLUMNS}
        "#
    ))
    .bind(req.resource.to_string())
    .bind(&req.name)
    .bind(&req.content)
    .bind(&req.link)
    .bind(&req.description)
    .fetch_one(&mut **tx)
    .await
    .map_err(Error::Database)?;

    attachment_from_row(&row)
}

#[async_trait]
impl AttachmentStore for PgUnitOfWork {
    async fn get_attachment(&self, id: AttachmentId) -> Result<Option<Attachment>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let row = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM ir_attachment WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(attachment_from_row).transpose()
    }

    async fn create_attachment(&self, req: NewAttachment) -> Result<Attachment> {
        let mut guard = self.lock().await;
        insert(active(&mut guard)?, req).await
    }

    async fn copy_attachment(
        &self,
        source: &Attachment,
        resource: &ResourceRef,
    ) -> Result<Attachment> {
        let mut guard = self.lock().await;
        insert(
            active(&mut guard)?,
            NewAttachment::copy_of(source, resource.clone()),
        )
        .await
    }

    async fn list_for_model(&self, model: &str) -> Result<Vec<Attachment>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let rows = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM ir_attachment WHERE resource LIKE $1 ORDER BY id"
        ))
        .bind(format!("{},%", escape_like(model)))
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(attachment_from_row).collect()
    }
}
