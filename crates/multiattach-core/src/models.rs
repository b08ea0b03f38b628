//! Core data models for multiattach.
//!
//! These types are shared across the multiattach crates and represent the
//! registry, attachment and wizard entities.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::{FORM_ACTION_KEYWORD, LISTING_RECORD_ID};
use crate::error::{Error, Result};

/// Identifier of a record in any model.
pub type RecordId = i64;

/// Identifier of an attachment.
pub type AttachmentId = i64;

/// Identifier of an action keyword.
pub type ActionKeywordId = i64;

/// Identifier of a registered action (e.g. the wizard action).
pub type ActionId = i64;

/// Identifier of a registry entry.
pub type EntryId = i64;

/// Identifier of a registered view.
pub type ViewId = i64;

// =============================================================================
// RESOURCE REFERENCE
// =============================================================================

/// Pairs a model identifier with a record id.
///
/// Serialized as `"<model>,<id>"`. The record id `-1` addresses the listing
/// of the model instead of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceRef {
    pub model: String,
    pub id: RecordId,
}

impl ResourceRef {
    pub fn new(model: impl Into<String>, id: RecordId) -> Self {
        Self {
            model: model.into(),
            id,
        }
    }

    /// Reference to the listing of `model`, used for keyword bindings.
    pub fn listing(model: impl Into<String>) -> Self {
        Self::new(model, LISTING_RECORD_ID)
    }

    pub fn is_listing(&self) -> bool {
        self.id == LISTING_RECORD_ID
    }

    /// `LIKE` pattern matching every record of `model`: `"<model>,%"`.
    pub fn model_pattern(model: &str) -> String {
        format!("{},%", model)
    }

    /// Whether this reference points at any record of `model`.
    pub fn belongs_to(&self, model: &str) -> bool {
        self.model == model
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.model, self.id)
    }
}

impl FromStr for ResourceRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (model, id) = s
            .rsplit_once(',')
            .ok_or_else(|| Error::InvalidInput(format!("malformed resource reference: {s}")))?;
        if model.is_empty() {
            return Err(Error::InvalidInput(format!(
                "resource reference without model: {s}"
            )));
        }
        let id = id
            .trim()
            .parse::<RecordId>()
            .map_err(|_| Error::InvalidInput(format!("malformed record id in resource: {s}")))?;
        Ok(Self::new(model, id))
    }
}

impl TryFrom<String> for ResourceRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResourceRef> for String {
    fn from(value: ResourceRef) -> Self {
        value.to_string()
    }
}

// =============================================================================
// ATTACHMENT TYPES
// =============================================================================

/// An attachment owned by exactly one record.
///
/// Content is opaque to multiattach; only `resource` is ever inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub resource: ResourceRef,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    /// Whether `self` and `other` carry the same payload, ignoring identity
    /// and ownership.
    pub fn same_content(&self, other: &Attachment) -> bool {
        self.name == other.name
            && self.content == other.content
            && self.link == other.link
            && self.description == other.description
    }
}

/// Request for creating a new attachment.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub resource: ResourceRef,
    pub name: String,
    pub content: Option<Vec<u8>>,
    pub link: Option<String>,
    pub description: Option<String>,
}

impl NewAttachment {
    pub fn new(resource: ResourceRef, name: impl Into<String>) -> Self {
        Self {
            resource,
            name: name.into(),
            content: None,
            link: None,
            description: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Structural copy of `source` owned by `resource`.
    pub fn copy_of(source: &Attachment, resource: ResourceRef) -> Self {
        Self {
            resource,
            name: source.name.clone(),
            content: source.content.clone(),
            link: source.link.clone(),
            description: source.description.clone(),
        }
    }
}

// =============================================================================
// ACTION KEYWORD TYPES
// =============================================================================

/// Binds a registered action to a model listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionKeyword {
    pub id: ActionKeywordId,
    pub keyword: String,
    pub binding: ResourceRef,
    pub action: ActionId,
}

/// Request for creating an action keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActionKeyword {
    pub keyword: String,
    pub binding: ResourceRef,
    pub action: ActionId,
}

impl NewActionKeyword {
    /// `form_action` keyword exposing `action` on the listing of `model`.
    pub fn form_action(model: &str, action: ActionId) -> Self {
        Self {
            keyword: FORM_ACTION_KEYWORD.to_string(),
            binding: ResourceRef::listing(model),
            action,
        }
    }
}

// =============================================================================
// REGISTRY TYPES
// =============================================================================

/// One row per model that opted into bulk attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub id: EntryId,
    pub model: String,
    /// Keyword exposing the wizard; `None` while the wizard is not installed.
    pub action: Option<ActionKeywordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistryEntry {
    pub fn has_wizard(&self) -> bool {
        self.action.is_some()
    }
}

/// Interface operations available on a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOperation {
    CreateWizard,
    RemoveWizard,
}

impl fmt::Display for EntryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateWizard => write!(f, "create_wizard"),
            Self::RemoveWizard => write!(f, "remove_wizard"),
        }
    }
}

// =============================================================================
// MODEL CATALOG TYPES
// =============================================================================

/// How a model keeps its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Records are stored durably in a table.
    Table,
    /// Records only live for the duration of an interaction (wizard states).
    Transient,
    /// Records are computed and never stored.
    Virtual,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Transient => write!(f, "transient"),
            Self::Virtual => write!(f, "virtual"),
        }
    }
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(Self::Table),
            "transient" => Ok(Self::Transient),
            "virtual" => Ok(Self::Virtual),
            other => Err(Error::InvalidInput(format!("unknown storage kind: {other}"))),
        }
    }
}

/// Capabilities of one model, as reported by the model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub label: String,
    pub storage: StorageKind,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>, storage: StorageKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            storage,
        }
    }

    pub fn supports_durable_storage(&self) -> bool {
        self.storage == StorageKind::Table
    }
}

// =============================================================================
// VIEW REGISTRY TYPES
// =============================================================================

/// Kind of a registered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Form,
    Tree,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form => write!(f, "form"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for ViewKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "form" => Ok(Self::Form),
            "tree" => Ok(Self::Tree),
            other => Err(Error::InvalidInput(format!("unknown view kind: {other}"))),
        }
    }
}

/// A view registered for a model by an installed module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRef {
    pub id: ViewId,
    pub model: String,
    pub kind: ViewKind,
    pub module: String,
}

// =============================================================================
// WIZARD TYPES
// =============================================================================

/// Invocation context supplied by the client that triggered the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardContext {
    #[serde(default)]
    pub active_model: Option<String>,
    #[serde(default)]
    pub active_id: Option<RecordId>,
    #[serde(default)]
    pub active_ids: Vec<RecordId>,
}

impl WizardContext {
    pub fn new(model: impl Into<String>, active_id: RecordId, active_ids: Vec<RecordId>) -> Self {
        Self {
            active_model: Some(model.into()),
            active_id: Some(active_id),
            active_ids,
        }
    }
}

/// Operator input collected by the wizard's start state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardStart {
    #[serde(default)]
    pub attachment: Option<AttachmentId>,
    #[serde(default)]
    pub records: Vec<RecordId>,
}

impl WizardStart {
    /// Defaults for a new invocation: the operator's current selection.
    pub fn defaults(context: &WizardContext) -> Self {
        Self {
            attachment: None,
            records: context.active_ids.clone(),
        }
    }
}
