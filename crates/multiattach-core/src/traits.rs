//! Core traits for multiattach abstractions.
//!
//! The registry manager, the form augmenter and the replication engine only
//! talk to persistence through these traits. Backends implement all of them
//! on a [`UnitOfWork`] so one operation commits or rolls back as a whole.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;
use crate::view::FormView;

// =============================================================================
// MODEL CATALOG
// =============================================================================

/// Injected lookup of model capabilities by identifier.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Describe a model, or `None` if it is not installed.
    async fn describe(&self, model: &str) -> Result<Option<ModelDescriptor>>;
}

// =============================================================================
// ATTACHMENT STORE
// =============================================================================

/// Storage of attachments.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Fetch an attachment by id.
    async fn get_attachment(&self, id: AttachmentId) -> Result<Option<Attachment>>;

    /// Persist a new attachment.
    async fn create_attachment(&self, req: NewAttachment) -> Result<Attachment>;

    /// Persist a structural copy of `source` owned by `resource`.
    async fn copy_attachment(
        &self,
        source: &Attachment,
        resource: &ResourceRef,
    ) -> Result<Attachment>;

    /// Attachments owned by any record of `model`.
    async fn list_for_model(&self, model: &str) -> Result<Vec<Attachment>>;
}

// =============================================================================
// ACTION KEYWORD STORE
// =============================================================================

/// Storage of action keywords, the bindings that expose actions on models.
#[async_trait]
pub trait ActionKeywordStore: Send + Sync {
    /// Resolve a registered action id by name.
    async fn resolve_action(&self, name: &str) -> Result<Option<ActionId>>;

    /// Persist a new keyword.
    async fn create_keyword(&self, req: NewActionKeyword) -> Result<ActionKeyword>;

    /// Fetch a keyword by id.
    async fn get_keyword(&self, id: ActionKeywordId) -> Result<Option<ActionKeyword>>;

    /// Rebind an existing keyword.
    async fn rebind_keyword(&self, id: ActionKeywordId, binding: &ResourceRef) -> Result<()>;

    /// Delete keywords; unknown ids are ignored.
    async fn delete_keywords(&self, ids: &[ActionKeywordId]) -> Result<()>;

    /// Keywords bound to `binding`.
    async fn list_for_binding(&self, binding: &ResourceRef) -> Result<Vec<ActionKeyword>>;
}

// =============================================================================
// REGISTRY STORE
// =============================================================================

/// Storage of registry entries.
///
/// Implementations enforce one entry per model and report conflicts as
/// [`crate::Error::UniquenessViolation`].
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Insert an entry without an action.
    async fn insert_entry(&self, model: &str) -> Result<RegistryEntry>;

    /// Fetch an entry by id.
    async fn get_entry(&self, id: EntryId) -> Result<Option<RegistryEntry>>;

    /// Fetch the entry registered for `model`.
    async fn find_entry_by_model(&self, model: &str) -> Result<Option<RegistryEntry>>;

    /// List all entries ordered by id.
    async fn list_entries(&self) -> Result<Vec<RegistryEntry>>;

    /// Change the model of an entry.
    async fn update_entry_model(&self, id: EntryId, model: &str) -> Result<RegistryEntry>;

    /// Set or clear the action keyword of an entry.
    async fn set_entry_action(&self, id: EntryId, action: Option<ActionKeywordId>) -> Result<()>;

    /// Delete entries; unknown ids are ignored.
    async fn delete_entries(&self, ids: &[EntryId]) -> Result<()>;
}

// =============================================================================
// VIEW STORE
// =============================================================================

/// Registry of installed views.
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Views registered for `model` of `kind` by `module`.
    async fn find_views(&self, model: &str, kind: ViewKind, module: &str) -> Result<Vec<ViewRef>>;

    /// The default form description of `model`.
    async fn form_view(&self, model: &str) -> Result<Option<FormView>>;
}

// =============================================================================
// UNIT OF WORK
// =============================================================================

/// All stores scoped to one atomic unit.
///
/// Nothing written through a unit of work is visible to other units until
/// [`UnitOfWork::commit`] succeeds. Dropping it without committing discards
/// every write.
#[async_trait]
pub trait UnitOfWork:
    ModelCatalog + AttachmentStore + ActionKeywordStore + RegistryStore + ViewStore
{
    /// Make every write of this unit durable. Further calls fail.
    async fn commit(&self) -> Result<()>;
}

/// Source of units of work.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Begin a new unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}
