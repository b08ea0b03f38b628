//! Registry lifecycle tests against the in-memory backend.
//!
//! Covers per-model uniqueness, model eligibility, and keeping wizard
//! keywords in sync with registry entries across create/remove/delete.

use multiattach_core::memory::MemoryBackend;
use multiattach_core::{
    enabled_operations, Backend, EntryOperation, Error, ModelDescriptor, RegistryEntry,
    RegistryManager, ResourceRef, Result, StorageKind,
};

fn backend() -> MemoryBackend {
    MemoryBackend::with_models([
        ModelDescriptor::new("party.party", "Party", StorageKind::Table),
        ModelDescriptor::new("sale.sale", "Sale", StorageKind::Table),
        ModelDescriptor::new("party.merge.start", "Merge Parties", StorageKind::Transient),
        ModelDescriptor::new("report.summary", "Summary", StorageKind::Virtual),
    ])
}

async fn register(backend: &MemoryBackend, model: &str) -> Result<RegistryEntry> {
    let uow = backend.begin().await?;
    let entry = RegistryManager::new(uow.as_ref()).create(model).await?;
    uow.commit().await?;
    Ok(entry)
}

async fn create_wizard(backend: &MemoryBackend, id: i64) -> Result<Vec<RegistryEntry>> {
    let uow = backend.begin().await?;
    let entries = RegistryManager::new(uow.as_ref()).create_wizard(&[id]).await?;
    uow.commit().await?;
    Ok(entries)
}

#[tokio::test]
async fn test_second_entry_for_same_model_is_rejected() {
    let backend = backend();
    register(&backend, "party.party").await.unwrap();

    let err = register(&backend, "party.party").await.unwrap_err();
    assert!(matches!(err, Error::UniquenessViolation(_)));
    assert_eq!(backend.entries().await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_registration_has_one_winner() {
    let backend = backend();

    let (a, b) = tokio::join!(
        register(&backend, "sale.sale"),
        register(&backend, "sale.sale")
    );

    let outcomes = [a, b];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(Error::UniquenessViolation(_))))
        .count();
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(backend.entries().await.len(), 1);
}

#[tokio::test]
async fn test_models_without_table_storage_are_rejected() {
    let backend = backend();

    for model in ["party.merge.start", "report.summary"] {
        let err = register(&backend, model).await.unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedModel(_)),
            "{model} should be rejected, got {err:?}"
        );
    }
    assert!(backend.entries().await.is_empty());
}

#[tokio::test]
async fn test_unknown_model_is_rejected() {
    let backend = backend();
    let err = register(&backend, "no.such.model").await.unwrap_err();
    assert!(matches!(err, Error::UnknownModel(_)));
}

#[tokio::test]
async fn test_update_revalidates_model() {
    let backend = backend();
    let entry = register(&backend, "party.party").await.unwrap();

    let uow = backend.begin().await.unwrap();
    let err = RegistryManager::new(uow.as_ref())
        .update(entry.id, "party.merge.start")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedModel(_)));
}

#[tokio::test]
async fn test_update_to_registered_model_conflicts() {
    let backend = backend();
    register(&backend, "party.party").await.unwrap();
    let sale = register(&backend, "sale.sale").await.unwrap();

    let uow = backend.begin().await.unwrap();
    let err = RegistryManager::new(uow.as_ref())
        .update(sale.id, "party.party")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UniquenessViolation(_)));
}

#[tokio::test]
async fn test_create_wizard_binds_listing() {
    let backend = backend();
    let entry = register(&backend, "party.party").await.unwrap();
    let action_id = backend.wizard_action_id().await.unwrap();

    let entries = create_wizard(&backend, entry.id).await.unwrap();
    let keyword_id = entries[0].action.expect("wizard keyword should be set");

    let keywords = backend.keywords().await;
    assert_eq!(keywords.len(), 1);
    assert_eq!(keywords[0].id, keyword_id);
    assert_eq!(keywords[0].keyword, "form_action");
    assert_eq!(keywords[0].binding.to_string(), "party.party,-1");
    assert_eq!(keywords[0].action, action_id);
    assert_eq!(backend.entries().await[0].action, Some(keyword_id));
}

#[tokio::test]
async fn test_create_wizard_twice_is_noop() {
    let backend = backend();
    let entry = register(&backend, "party.party").await.unwrap();

    let first = create_wizard(&backend, entry.id).await.unwrap();
    let second = create_wizard(&backend, entry.id).await.unwrap();

    assert_eq!(first[0].action, second[0].action);
    assert_eq!(backend.keywords().await.len(), 1);
}

#[tokio::test]
async fn test_fixed_wizard_action_overrides_lookup() {
    let backend = backend();
    let entry = register(&backend, "party.party").await.unwrap();

    let uow = backend.begin().await.unwrap();
    RegistryManager::new(uow.as_ref())
        .with_wizard_action(Some(4242))
        .create_wizard(&[entry.id])
        .await
        .unwrap();
    uow.commit().await.unwrap();
    drop(uow);

    assert_eq!(backend.keywords().await[0].action, 4242);
}

#[tokio::test]
async fn test_create_then_remove_restores_null_action() {
    let backend = backend();
    let entry = register(&backend, "party.party").await.unwrap();
    create_wizard(&backend, entry.id).await.unwrap();

    let uow = backend.begin().await.unwrap();
    let entries = RegistryManager::new(uow.as_ref())
        .remove_wizard(&[entry.id])
        .await
        .unwrap();
    uow.commit().await.unwrap();
    drop(uow);

    assert!(entries[0].action.is_none());
    assert!(backend.keywords().await.is_empty());
    assert!(backend.entries().await[0].action.is_none());
}

#[tokio::test]
async fn test_remove_wizard_accepts_entries_without_action() {
    let backend = backend();
    let party = register(&backend, "party.party").await.unwrap();
    let sale = register(&backend, "sale.sale").await.unwrap();
    create_wizard(&backend, sale.id).await.unwrap();

    let uow = backend.begin().await.unwrap();
    let entries = RegistryManager::new(uow.as_ref())
        .remove_wizard(&[party.id, sale.id])
        .await
        .unwrap();
    uow.commit().await.unwrap();
    drop(uow);

    assert!(entries.iter().all(|e| e.action.is_none()));
    assert!(backend.keywords().await.is_empty());
}

#[tokio::test]
async fn test_delete_removes_wizard_keyword() {
    let backend = backend();
    let entry = register(&backend, "party.party").await.unwrap();
    create_wizard(&backend, entry.id).await.unwrap();

    let uow = backend.begin().await.unwrap();
    RegistryManager::new(uow.as_ref())
        .delete(&[entry.id])
        .await
        .unwrap();
    uow.commit().await.unwrap();
    drop(uow);

    assert!(backend.entries().await.is_empty());
    assert!(backend.keywords().await.is_empty(), "no orphaned keyword");
}

#[tokio::test]
async fn test_delete_unknown_entry_changes_nothing() {
    let backend = backend();
    let entry = register(&backend, "party.party").await.unwrap();
    create_wizard(&backend, entry.id).await.unwrap();

    {
        let uow = backend.begin().await.unwrap();
        let err = RegistryManager::new(uow.as_ref())
            .delete(&[entry.id, 9999])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        // dropped without commit
    }

    assert_eq!(backend.entries().await.len(), 1);
    assert_eq!(backend.keywords().await.len(), 1);
}

#[tokio::test]
async fn test_update_rebinds_existing_keyword() {
    let backend = backend();
    let entry = register(&backend, "party.party").await.unwrap();
    let keyword_id = create_wizard(&backend, entry.id).await.unwrap()[0]
        .action
        .unwrap();

    let uow = backend.begin().await.unwrap();
    RegistryManager::new(uow.as_ref())
        .update(entry.id, "sale.sale")
        .await
        .unwrap();
    let keyword = uow.get_keyword(keyword_id).await.unwrap().unwrap();
    assert_eq!(keyword.binding, ResourceRef::listing("sale.sale"));
    assert!(uow
        .list_for_binding(&ResourceRef::listing("party.party"))
        .await
        .unwrap()
        .is_empty());
    let moved = uow.find_entry_by_model("sale.sale").await.unwrap().unwrap();
    assert_eq!(moved.action, Some(keyword_id));
}

#[tokio::test]
async fn test_enabled_operations_follow_lifecycle() {
    let backend = backend();
    let entry = register(&backend, "party.party").await.unwrap();
    assert!(enabled_operations(&entry).contains(&EntryOperation::CreateWizard));

    let entry = create_wizard(&backend, entry.id).await.unwrap().remove(0);
    let ops = enabled_operations(&entry);
    assert!(ops.contains(&EntryOperation::RemoveWizard));
    assert!(!ops.contains(&EntryOperation::CreateWizard));
}
