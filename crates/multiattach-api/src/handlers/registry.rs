//! Registry HTTP handlers.

use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use multiattach_core::{enabled_operations, EntryId, EntryOperation, RegistryEntry, RegistryManager};

use crate::{ApiError, AppState};

/// Request body for creating or moving a registry entry.
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub model: String,
}

/// A registry entry with the operations the interface may offer for it.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryResponse {
    #[serde(flatten)]
    pub entry: RegistryEntry,
    pub enabled_operations: BTreeSet<EntryOperation>,
}

impl From<RegistryEntry> for EntryResponse {
    fn from(entry: RegistryEntry) -> Self {
        let enabled_operations = enabled_operations(&entry);
        Self {
            entry,
            enabled_operations,
        }
    }
}

pub async fn list_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    let uow = state.backend.begin().await?;
    let entries = uow.list_entries().await?;
    Ok(Json(entries.into_iter().map(EntryResponse::from).collect()))
}

/// Register a model.
///
/// # Returns
/// - 201 Created with the new entry
/// - 400 Bad Request if the model is unknown or has no table storage
/// - 409 Conflict if the model is already registered
pub async fn create_entry(
    State(state): State<AppState>,
    Json(body): Json<EntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let uow = state.backend.begin().await?;
    let entry = RegistryManager::new(uow.as_ref())
        .create(&body.model)
        .await?;
    uow.commit().await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> Result<Json<EntryResponse>, ApiError> {
    let uow = state.backend.begin().await?;
    let entry = uow
        .get_entry(id)
        .await?
        .ok_or_else(|| multiattach_core::Error::NotFound(format!("registry entry {id}")))?;
    Ok(Json(entry.into()))
}

/// Move an entry to another model. Its wizard keyword follows it.
pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
    Json(body): Json<EntryRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let uow = state.backend.begin().await?;
    let entry = RegistryManager::new(uow.as_ref())
        .update(id, &body.model)
        .await?;
    uow.commit().await?;
    Ok(Json(entry.into()))
}

/// Delete an entry together with its wizard keyword.
///
/// # Returns
/// - 204 No Content on success
/// - 404 Not Found if the entry doesn't exist
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> Result<StatusCode, ApiError> {
    let uow = state.backend.begin().await?;
    RegistryManager::new(uow.as_ref()).delete(&[id]).await?;
    uow.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Expose the wizard on the entry's model listing. No-op when already exposed.
pub async fn create_wizard(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> Result<Json<EntryResponse>, ApiError> {
    let uow = state.backend.begin().await?;
    let mut entries = RegistryManager::new(uow.as_ref())
        .with_wizard_action(state.wizard_action)
        .create_wizard(&[id])
        .await?;
    uow.commit().await?;
    single(&mut entries, id)
}

/// Withdraw the wizard from the entry's model listing. No-op when not exposed.
pub async fn remove_wizard(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> Result<Json<EntryResponse>, ApiError> {
    let uow = state.backend.begin().await?;
    let mut entries = RegistryManager::new(uow.as_ref())
        .remove_wizard(&[id])
        .await?;
    uow.commit().await?;
    single(&mut entries, id)
}

fn single(entries: &mut Vec<RegistryEntry>, id: EntryId) -> Result<Json<EntryResponse>, ApiError> {
    entries
        .pop()
        .map(|entry| Json(entry.into()))
        .ok_or_else(|| multiattach_core::Error::NotFound(format!("registry entry {id}")).into())
}
