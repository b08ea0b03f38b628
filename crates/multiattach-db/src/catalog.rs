//! Model catalog over `ir_model`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use multiattach_core::{Error, ModelCatalog, ModelDescriptor, Result};

use crate::unit_of_work::{active, PgUnitOfWork};

fn descriptor_from_row(row: &PgRow) -> Result<ModelDescriptor> {
    let storage: String = row.get("storage");
    Ok(ModelDescriptor {
        name: row.get("name"),
        label: row.get("label"),
        storage: storage.parse()?,
    })
}

#[async_trait]
impl ModelCatalog for PgUnitOfWork {
    async fn describe(&self, model: &str) -> Result<Option<ModelDescriptor>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let row = sqlx::query("SELECT name, label, storage FROM ir_model WHERE name = $1")
            .bind(model)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(descriptor_from_row).transpose()
    }}
