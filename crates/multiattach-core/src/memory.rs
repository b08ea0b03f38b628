//! In-memory backend for deterministic testing.
//!
//! Implements every store trait over a plain in-process state. Units of work
//! are serialized: [`MemoryBackend::begin`] holds the backend lock until the
//! unit is committed or dropped, and writes go to a private copy that only
//! replaces the shared state on commit.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use multiattach_core::memory::MemoryBackend;
//! use multiattach_core::{Backend, ModelDescriptor, RegistryManager, StorageKind};
//!
//! let backend = MemoryBackend::with_models([
//!     ModelDescriptor::new("party.party", "Party", StorageKind::Table),
//! ]);
//! let uow = backend.begin().await?;
//! let entry = RegistryManager::new(uow.as_ref()).create("party.party").await?;
//! uow.commit().await?;
//! assert!(entry.action.is_none());
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::defaults::{
    ANCHOR_TAG, ATTACHMENT_MODEL, MODULE_NAME, REGISTRY_MODEL, WIZARD_ACTION_NAME,
    WIZARD_START_MODEL,
};
use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::*;
use crate::view::{FormView, ViewElement};

/// Start form installed for the wizard: a four-column form whose separator
/// anchors the injected fields.
pub fn default_start_form() -> FormView {
    FormView::new(
        ViewElement::new("form").attr("col", 4).child(
            ViewElement::new(ANCHOR_TAG)
                .attr("string", "Select the attachment and the records to attach it to")
                .attr("colspan", 4),
        ),
    )
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    models: BTreeMap<String, ModelDescriptor>,
    actions: BTreeMap<String, ActionId>,
    attachments: BTreeMap<AttachmentId, Attachment>,
    keywords: BTreeMap<ActionKeywordId, ActionKeyword>,
    entries: BTreeMap<EntryId, RegistryEntry>,
    views: Vec<ViewRef>,
    forms: BTreeMap<String, FormView>,
    /// Copies allowed before `copy_attachment` starts failing.
    copy_budget: Option<usize>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn installed() -> Self {
        let mut state = Self::default();
        for descriptor in [
            ModelDescriptor::new(ATTACHMENT_MODEL, "Attachment", StorageKind::Table),
            ModelDescriptor::new(REGISTRY_MODEL, "Multiple Attachment", StorageKind::Table),
            ModelDescriptor::new(
                WIZARD_START_MODEL,
                "Multiple Attachment Wizard Start",
                StorageKind::Transient,
            ),
        ] {
            state.models.insert(descriptor.name.clone(), descriptor);
        }

        let action_id = state.allocate_id();
        state.actions.insert(WIZARD_ACTION_NAME.to_string(), action_id);

        let view_id = state.allocate_id();
        state.views.push(ViewRef {
            id: view_id,
            model: ATTACHMENT_MODEL.to_string(),
            kind: ViewKind::Tree,
            module: MODULE_NAME.to_string(),
        });
        state
            .forms
            .insert(WIZARD_START_MODEL.to_string(), default_start_form());
        state
    }

    fn insert_attachment(&mut self, req: NewAttachment) -> Attachment {
        let attachment = Attachment {
            id: self.allocate_id(),
            resource: req.resource,
            name: req.name,
            content: req.content,
            link: req.link,
            description: req.description,
            created_at: Utc::now(),
        };
        self.attachments.insert(attachment.id, attachment.clone());
        attachment
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut RegistryEntry> {
        self.entries
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("registry entry {id}")))
    }
}

/// In-memory [`Backend`].
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<AsyncMutex<MemoryState>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Backend with the module installed and no business models.
    pub fn new() -> Self {
        Self::with_models([])
    }

    /// Backend with the module installed and the given business models.
    pub fn with_models(models: impl IntoIterator<Item = ModelDescriptor>) -> Self {
        let mut state = MemoryState::installed();
        for descriptor in models {
            state.models.insert(descriptor.name.clone(), descriptor);
        }
        Self {
            state: Arc::new(AsyncMutex::new(state)),
        }
    }

    /// Register another model.
    pub async fn add_model(&self, descriptor: ModelDescriptor) {
        let mut state = self.state.lock().await;
        state.models.insert(descriptor.name.clone(), descriptor);
    }

    /// Uninstall every registered view.
    pub async fn clear_views(&self) {
        self.state.lock().await.views.clear();
    }

    /// Make `copy_attachment` fail once `copies` more copies have been made.
    pub async fn fail_copies_after(&self, copies: usize) {
        self.state.lock().await.copy_budget = Some(copies);
    }

    /// Committed attachments ordered by id.
    pub async fn attachments(&self) -> Vec<Attachment> {
        self.state.lock().await.attachments.values().cloned().collect()
    }

    /// Committed keywords ordered by id.
    pub async fn keywords(&self) -> Vec<ActionKeyword> {
        self.state.lock().await.keywords.values().cloned().collect()
    }

    /// Committed registry entries ordered by id.
    pub async fn entries(&self) -> Vec<RegistryEntry> {
        self.state.lock().await.entries.values().cloned().collect()
    }

    /// Id of the installed wizard action.
    pub async fn wizard_action_id(&self) -> Option<ActionId> {
        self.state
            .lock()
            .await
            .actions
            .get(WIZARD_ACTION_NAME)
            .copied()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        debug!(
            subsystem = "database",
            component = "memory_backend",
            op = "begin",
            "Unit of work started"
        );
        Ok(Box::new(MemoryUnitOfWork {
            inner: Mutex::new(Some(Inner {
                committed: guard,
                working,
            })),
        }))
    }
}

struct Inner {
    committed: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

/// Unit of work of the in-memory backend.
pub struct MemoryUnitOfWork {
    inner: Mutex<Option<Inner>>,
}

impl MemoryUnitOfWork {
    fn with<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T>) -> Result<T> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| Error::Internal("memory backend lock poisoned".to_string()))?;
        let inner = inner
            .as_mut()
            .ok_or_else(|| Error::Internal("unit of work already committed".to_string()))?;
        f(&mut inner.working)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(&self) -> Result<()> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| Error::Internal("memory backend lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| Error::Internal("unit of work already committed".to_string()))?;
        let Inner {
            mut committed,
            working,
        } = inner;
        *committed = working;
        Ok(())
    }
}

#[async_trait]
impl ModelCatalog for MemoryUnitOfWork {
    async fn describe(&self, model: &str) -> Result<Option<ModelDescriptor>> {
        self.with(|s| Ok(s.models.get(model).cloned()))
    }
}

#[async_trait]
impl AttachmentStore for MemoryUnitOfWork {
    async fn get_attachment(&self, id: AttachmentId) -> Result<Option<Attachment>> {
        self.with(|s| Ok(s.attachments.get(&id).cloned()))
    }

    async fn create_attachment(&self, req: NewAttachment) -> Result<Attachment> {
        self.with(|s| Ok(s.insert_attachment(req)))
    }

    async fn copy_attachment(
        &self,
        source: &Attachment,
        resource: &ResourceRef,
    ) -> Result<Attachment> {
        self.with(|s| {
            if let Some(budget) = s.copy_budget.as_mut() {
                if *budget == 0 {
                    return Err(Error::Internal("attachment copy rejected".to_string()));
                }
                *budget -= 1;
            }
            Ok(s.insert_attachment(NewAttachment::copy_of(source, resource.clone())))
        })
    }

    async fn list_for_model(&self, model: &str) -> Result<Vec<Attachment>> {
        self.with(|s| {
            Ok(s.attachments
                .values()
                .filter(|a| a.resource.belongs_to(model))
                .cloned()
                .collect())
        })
    }
}

#[async_trait]
impl ActionKeywordStore for MemoryUnitOfWork {
    async fn resolve_action(&self, name: &str) -> Result<Option<ActionId>> {
        self.with(|s| Ok(s.actions.get(name).copied()))
    }

    async fn create_keyword(&self, req: NewActionKeyword) -> Result<ActionKeyword> {
        self.with(|s| {
            let keyword = ActionKeyword {
                id: s.allocate_id(),
                keyword: req.keyword,
                binding: req.binding,
                action: req.action,
            };
            s.keywords.insert(keyword.id, keyword.clone());
            Ok(keyword)
        })
    }

    async fn get_keyword(&self, id: ActionKeywordId) -> Result<Option<ActionKeyword>> {
        self.with(|s| Ok(s.keywords.get(&id).cloned()))
    }

    async fn rebind_keyword(&self, id: ActionKeywordId, binding: &ResourceRef) -> Result<()> {
        self.with(|s| {
            let keyword = s
                .keywords
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("action keyword {id}")))?;
            keyword.binding = binding.clone();
            Ok(())
        })
    }

    async fn delete_keywords(&self, ids: &[ActionKeywordId]) -> Result<()> {
        self.with(|s| {
            for id in ids {
                s.keywords.remove(id);
                // Same effect as the ON DELETE SET NULL foreign key.
                for entry in s.entries.values_mut() {
                    if entry.action == Some(*id) {
                        entry.action = None;
                    }
                }
            }
            Ok(())
        })
    }

    async fn list_for_binding(&self, binding: &ResourceRef) -> Result<Vec<ActionKeyword>> {
        self.with(|s| {
            Ok(s.keywords
                .values()
                .filter(|k| &k.binding == binding)
                .cloned()
                .collect())
        })
    }
}

#[async_trait]
impl RegistryStore for MemoryUnitOfWork {
    async fn insert_entry(&self, model: &str) -> Result<RegistryEntry> {
        self.with(|s| {
            if s.entries.values().any(|e| e.model == model) {
                return Err(Error::UniquenessViolation(model.to_string()));
            }
            let now = Utc::now();
            let entry = RegistryEntry {
                id: s.allocate_id(),
                model: model.to_string(),
                action: None,
                created_at: now,
                updated_at: now,
            };
            s.entries.insert(entry.id, entry.clone());
            Ok(entry)
        })
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<RegistryEntry>> {
        self.with(|s| Ok(s.entries.get(&id).cloned()))
    }

    async fn find_entry_by_model(&self, model: &str) -> Result<Option<RegistryEntry>> {
        self.with(|s| Ok(s.entries.values().find(|e| e.model == model).cloned()))
    }

    async fn list_entries(&self) -> Result<Vec<RegistryEntry>> {
        self.with(|s| Ok(s.entries.values().cloned().collect()))
    }

    async fn update_entry_model(&self, id: EntryId, model: &str) -> Result<RegistryEntry> {
        self.with(|s| {
            if s.entries.values().any(|e| e.model == model && e.id != id) {
                return Err(Error::UniquenessViolation(model.to_string()));
            }
            let entry = s.entry_mut(id)?;
            entry.model = model.to_string();
            entry.updated_at = Utc::now();
            Ok(entry.clone())
        })
    }

    async fn set_entry_action(&self, id: EntryId, action: Option<ActionKeywordId>) -> Result<()> {
        self.with(|s| {
            let entry = s.entry_mut(id)?;
            entry.action = action;
            entry.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn delete_entries(&self, ids: &[EntryId]) -> Result<()> {
        self.with(|s| {
            for id in ids {
                s.entries.remove(id);
            }
            Ok(())
        })
    }
}

#[async_trait]
impl ViewStore for MemoryUnitOfWork {
    async fn find_views(&self, model: &str, kind: ViewKind, module: &str) -> Result<Vec<ViewRef>> {
        self.with(|s| {
            Ok(s.views
                .iter()
                .filter(|v| v.model == model && v.kind == kind && v.module == module)
                .cloned()
                .collect())
        })
    }

    async fn form_view(&self, model: &str) -> Result<Option<FormView>> {
        self.with(|s| Ok(s.forms.get(model).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let backend = MemoryBackend::new();
        {
            let uow = backend.begin().await.unwrap();
            uow.create_attachment(NewAttachment::new(ResourceRef::new("M", 1), "a"))
                .await
                .unwrap();
        }
        assert!(backend.attachments().await.is_empty());
    }

    #[tokio::test]
    async fn test_committed_writes_are_visible() {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        uow.create_attachment(NewAttachment::new(ResourceRef::new("M", 1), "a"))
            .await
            .unwrap();
        uow.commit().await.unwrap();
        drop(uow);
        assert_eq!(backend.attachments().await.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_twice_fails() {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        uow.commit().await.unwrap();
        assert!(matches!(uow.commit().await, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_installed_defaults() {
        let backend = MemoryBackend::new();
        assert!(backend.wizard_action_id().await.is_some());

        let uow = backend.begin().await.unwrap();
        let views = uow
            .find_views(ATTACHMENT_MODEL, ViewKind::Tree, MODULE_NAME)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert!(uow.form_view(WIZARD_START_MODEL).await.unwrap().is_some());
        let start = uow.describe(WIZARD_START_MODEL).await.unwrap().unwrap();
        assert!(!start.supports_durable_storage());
    }

    #[tokio::test]
    async fn test_duplicate_model_rejected() {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        uow.insert_entry("M").await.unwrap();
        let err = uow.insert_entry("M").await.unwrap_err();
        assert!(matches!(err, Error::UniquenessViolation(m) if m == "M"));
    }

    #[tokio::test]
    async fn test_copy_budget() {
        let backend = MemoryBackend::new();
        backend.fail_copies_after(1).await;
        let uow = backend.begin().await.unwrap();
        let a = uow
            .create_attachment(NewAttachment::new(ResourceRef::new("M", 1), "a"))
            .await
            .unwrap();
        uow.copy_attachment(&a, &ResourceRef::new("M", 2)).await.unwrap();
        assert!(uow.copy_attachment(&a, &ResourceRef::new("M", 3)).await.is_err());
    }
}
