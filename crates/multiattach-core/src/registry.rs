//! Registry of models that expose the bulk-attach wizard.
//!
//! Each [`RegistryEntry`] enables the wizard for one model. Its `action`
//! tracks the `form_action` keyword that binds the wizard to the model's
//! listing; [`RegistryManager`] keeps the two in sync.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::defaults::WIZARD_ACTION_NAME;
use crate::error::{Error, Result};
use crate::models::{
    ActionId, EntryId, EntryOperation, ModelDescriptor, NewActionKeyword, RegistryEntry,
    ResourceRef,
};
use crate::traits::{ActionKeywordStore, ModelCatalog, RegistryStore};

/// Operations the interface may offer for `entry`.
///
/// "Create wizard" is only offered while no keyword exists, "remove wizard"
/// only while one does.
pub fn enabled_operations(entry: &RegistryEntry) -> BTreeSet<EntryOperation> {
    let mut ops = BTreeSet::new();
    if entry.has_wizard() {
        ops.insert(EntryOperation::RemoveWizard);
    } else {
        ops.insert(EntryOperation::CreateWizard);
    }
    ops
}

/// Lifecycle operations on registry entries, run against one store.
pub struct RegistryManager<'a, S: ?Sized> {
    store: &'a S,
    wizard_action: Option<ActionId>,
}

impl<'a, S> RegistryManager<'a, S>
where
    S: ModelCatalog + RegistryStore + ActionKeywordStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            wizard_action: None,
        }
    }

    /// Use a fixed wizard action id instead of resolving it by name.
    pub fn with_wizard_action(mut self, action: Option<ActionId>) -> Self {
        self.wizard_action = action;
        self
    }

    /// Check that `model` exists and stores its records in a table.
    pub async fn validate_model(&self, model: &str) -> Result<ModelDescriptor> {
        let descriptor = self
            .store
            .describe(model)
            .await?
            .ok_or_else(|| Error::UnknownModel(model.to_string()))?;
        if !descriptor.supports_durable_storage() {
            debug!(
                subsystem = "registry",
                op = "validate",
                model = %model,
                storage = %descriptor.storage,
                "Model rejected"
            );
            return Err(Error::UnsupportedModel(descriptor.label));
        }
        Ok(descriptor)
    }

    /// Register `model`.
    pub async fn create(&self, model: &str) -> Result<RegistryEntry> {
        self.validate_model(model).await?;
        let entry = self.store.insert_entry(model).await?;
        info!(
            subsystem = "registry",
            op = "create",
            entry_id = entry.id,
            model = %model,
            "Registry entry created"
        );
        Ok(entry)
    }

    /// Move an entry to another model, keeping its keyword bound to it.
    pub async fn update(&self, id: EntryId, model: &str) -> Result<RegistryEntry> {
        let entry = self.load_one(id).await?;
        if entry.model == model {
            return Ok(entry);
        }
        self.validate_model(model).await?;
        let updated = self.store.update_entry_model(id, model).await?;
        if let Some(keyword_id) = updated.action {
            self.store
                .rebind_keyword(keyword_id, &ResourceRef::listing(model))
                .await?;
        }
        info!(
            subsystem = "registry",
            op = "update",
            entry_id = id,
            from = %entry.model,
            model = %model,
            "Registry entry updated"
        );
        Ok(updated)
    }

    /// Install the wizard keyword on every entry that has none.
    ///
    /// Entries that already have a keyword are left unchanged.
    pub async fn create_wizard(&self, ids: &[EntryId]) -> Result<Vec<RegistryEntry>> {
        let entries = self.load(ids).await?;
        let mut result = Vec::with_capacity(entries.len());
        let mut action: Option<ActionId> = None;

        for mut entry in entries {
            if !enabled_operations(&entry).contains(&EntryOperation::CreateWizard) {
                debug!(
                    subsystem = "registry",
                    op = "create_wizard",
                    entry_id = entry.id,
                    "Wizard already installed, skipping"
                );
                result.push(entry);
                continue;
            }

            let action_id = match action {
                Some(id) => id,
                None => {
                    let id = self.wizard_action_id().await?;
                    action = Some(id);
                    id
                }
            };

            let keyword = self
                .store
                .create_keyword(NewActionKeyword::form_action(&entry.model, action_id))
                .await?;
            self.store.set_entry_action(entry.id, Some(keyword.id)).await?;
            entry.action = Some(keyword.id);

            info!(
                subsystem = "registry",
                op = "create_wizard",
                entry_id = entry.id,
                keyword_id = keyword.id,
                model = %entry.model,
                binding = %keyword.binding,
                "Wizard created"
            );
            result.push(entry);
        }

        Ok(result)
    }

    /// Remove the wizard keyword of every entry that has one.
    pub async fn remove_wizard(&self, ids: &[EntryId]) -> Result<Vec<RegistryEntry>> {
        let mut entries = self.load(ids).await?;
        let keyword_ids: Vec<_> = entries.iter().filter_map(|e| e.action).collect();

        if !keyword_ids.is_empty() {
            self.store.delete_keywords(&keyword_ids).await?;
        }

        for entry in entries.iter_mut().filter(|e| e.has_wizard()) {
            self.store.set_entry_action(entry.id, None).await?;
            entry.action = None;
        }

        info!(
            subsystem = "registry",
            op = "remove_wizard",
            entry_count = entries.len(),
            keyword_count = keyword_ids.len(),
            "Wizards removed"
        );
        Ok(entries)
    }

    /// Delete entries, removing their wizard keywords first.
    pub async fn delete(&self, ids: &[EntryId]) -> Result<()> {
        self.remove_wizard(ids).await?;
        self.store.delete_entries(ids).await?;
        info!(
            subsystem = "registry",
            op = "delete",
            entry_count = ids.len(),
            "Registry entries deleted"
        );
        Ok(())
    }

    async fn load_one(&self, id: EntryId) -> Result<RegistryEntry> {
        self.store
            .get_entry(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("registry entry {id}")))
    }

    async fn load(&self, ids: &[EntryId]) -> Result<Vec<RegistryEntry>> {
        let mut entries = Vec::with_capacity(ids.len());
        for &id in ids {
            entries.push(self.load_one(id).await?);
        }
        Ok(entries)
    }

    async fn wizard_action_id(&self) -> Result<ActionId> {
        if let Some(id) = self.wizard_action {
            return Ok(id);
        }
        self.store
            .resolve_action(WIZARD_ACTION_NAME)
            .await?
            .ok_or_else(|| {
                Error::Config(format!("action {WIZARD_ACTION_NAME} is not registered"))
            })
    }
}
