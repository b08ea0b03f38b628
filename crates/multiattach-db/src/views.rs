//! View registry over `ir_ui_view`.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::Row;

use multiattach_core::{Error, FormView, Result, ViewKind, ViewRef, ViewStore};

use crate::unit_of_work::{active, PgUnitOfWork};

#[async_trait]
impl ViewStore for PgUnitOfWork {
    async fn find_views(&self, model: &str, kind: ViewKind, module: &str) -> Result<Vec<ViewRef>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let rows = sqlx::query(
            r#"
            SELECT id, model, kind, module
            FROM ir_ui_view
            WHERE model = $1 AND kind = $2 AND module = $3
            ORDER BY id
            "#,
        )
        .bind(model)
        .bind(kind.to_string())
        .bind(module)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|r| {
                let kind: String = r.get("kind");
                Ok(ViewRef {
                    id: r.get("id"),
                    model: r.get("model"),
                    kind: kind.parse()?,
                    module: r.get("module"),
                })
            })
            .collect()
    }

    async fn form_view(&self, model: &str) -> Result<Option<FormView>> {
        let mut guard = self.lock().await;
        let tx = active(&mut guard)?;

        let arch = sqlx::query_scalar::<_, Json<FormView>>(
            r#"
            SELECT arch
            FROM ir_ui_view
            WHERE model = $1 AND kind = 'form' AND arch IS NOT NULL
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(model)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(arch.map(|Json(form)| form))
    }
}
