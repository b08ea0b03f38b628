//! End-to-end wizard runs against the in-memory backend.

use multiattach_core::memory::MemoryBackend;
use multiattach_core::{
    Attachment, Backend, Error, ModelDescriptor, NewAttachment, ResourceRef, StorageKind,
    WizardButton, WizardContext, WizardSession, WizardState,
};

fn backend() -> MemoryBackend {
    MemoryBackend::with_models([ModelDescriptor::new(
        "party.party",
        "Party",
        StorageKind::Table,
    )])
}

async fn seed(backend: &MemoryBackend, resource: ResourceRef) -> Attachment {
    let uow = backend.begin().await.unwrap();
    let attachment = uow
        .create_attachment(
            NewAttachment::new(resource, "contract.pdf")
                .with_content(b"%PDF-1.7".to_vec())
                .with_description("signed"),
        )
        .await
        .unwrap();
    uow.commit().await.unwrap();
    attachment
}

/// Run one attach submission in its own unit of work, committing on success.
async fn attach(
    backend: &MemoryBackend,
    session: &mut WizardSession,
) -> multiattach_core::Result<usize> {
    let uow = backend.begin().await?;
    let outcome = session.submit(uow.as_ref(), WizardButton::Attach).await?;
    uow.commit().await?;
    Ok(outcome.map(|o| o.copy_count()).unwrap_or(0))
}

#[tokio::test]
async fn test_attach_copies_to_every_other_selected_record() {
    let backend = backend();
    let original = seed(&backend, ResourceRef::new("party.party", 7)).await;

    let mut session = WizardSession::begin(WizardContext::new("party.party", 7, vec![7, 8, 9]));
    session.start.attachment = Some(original.id);
    let copies = attach(&backend, &mut session).await.unwrap();

    assert_eq!(copies, 2);
    assert_eq!(session.state(), WizardState::End);

    let all = backend.attachments().await;
    assert_eq!(all.len(), 3);
    let owners: Vec<String> = all.iter().map(|a| a.resource.to_string()).collect();
    assert_eq!(owners, vec!["party.party,7", "party.party,8", "party.party,9"]);
    for copy in &all[1..] {
        assert_ne!(copy.id, original.id);
        assert!(copy.same_content(&original));
    }
}

#[tokio::test]
async fn test_attach_from_other_model_copies_everything() {
    let backend = backend();
    let original = seed(&backend, ResourceRef::new("sale.sale", 1)).await;

    let mut session = WizardSession::begin(WizardContext::new("party.party", 7, vec![7, 8]));
    session.start.attachment = Some(original.id);
    let copies = attach(&backend, &mut session).await.unwrap();

    assert_eq!(copies, 2);
    assert_eq!(backend.attachments().await.len(), 3);
}

#[tokio::test]
async fn test_rerun_does_not_duplicate_for_owner() {
    let backend = backend();
    let original = seed(&backend, ResourceRef::new("party.party", 7)).await;

    for _ in 0..2 {
        let mut session =
            WizardSession::begin(WizardContext::new("party.party", 7, vec![7, 8]));
        session.start.attachment = Some(original.id);
        attach(&backend, &mut session).await.unwrap();
    }

    let owned_by_7 = backend
        .attachments()
        .await
        .into_iter()
        .filter(|a| a.resource == ResourceRef::new("party.party", 7))
        .count();
    assert_eq!(owned_by_7, 1);
}

#[tokio::test]
async fn test_failed_copy_rolls_back_whole_run() {
    let backend = backend();
    let original = seed(&backend, ResourceRef::new("party.party", 7)).await;
    backend.fail_copies_after(1).await;

    let mut session = WizardSession::begin(WizardContext::new("party.party", 7, vec![7, 8, 9]));
    session.start.attachment = Some(original.id);
    let err = attach(&backend, &mut session).await.unwrap_err();

    assert!(matches!(err, Error::Internal(_)));
    assert_eq!(session.state(), WizardState::Start);
    let all = backend.attachments().await;
    assert_eq!(all.len(), 1, "partial copies must not be committed");
    assert_eq!(all[0].id, original.id);
}

#[tokio::test]
async fn test_cancel_leaves_attachments_untouched() {
    let backend = backend();
    let original = seed(&backend, ResourceRef::new("party.party", 7)).await;

    let mut session = WizardSession::begin(WizardContext::new("party.party", 7, vec![7, 8, 9]));
    session.start.attachment = Some(original.id);

    let uow = backend.begin().await.unwrap();
    let outcome = session.submit(uow.as_ref(), WizardButton::Cancel).await.unwrap();
    uow.commit().await.unwrap();
    drop(uow);

    assert!(outcome.is_none());
    assert_eq!(session.state(), WizardState::End);
    assert_eq!(backend.attachments().await.len(), 1);
}

#[tokio::test]
async fn test_start_form_is_augmented_for_active_model() {
    let backend = backend();
    let session = WizardSession::begin(WizardContext::new("party.party", 7, vec![7]));

    let uow = backend.begin().await.unwrap();
    let form = session.start_form(uow.as_ref()).await.unwrap();

    assert!(form.fields.contains_key("attachment"));
    assert!(form.fields.contains_key("records"));
    assert_eq!(form.tree.children.len(), 4);
}

#[tokio::test]
async fn test_start_form_without_active_model_is_base_form() {
    let backend = backend();
    let session = WizardSession::begin(WizardContext::default());

    let uow = backend.begin().await.unwrap();
    let form = session.start_form(uow.as_ref()).await.unwrap();

    assert!(form.fields.is_empty());
    assert_eq!(form.tree.children.len(), 1);
}

#[tokio::test]
async fn test_start_form_without_reference_view_fails() {
    let backend = backend();
    backend.clear_views().await;
    let session = WizardSession::begin(WizardContext::new("party.party", 7, vec![7]));

    let uow = backend.begin().await.unwrap();
    let err = session.start_form(uow.as_ref()).await.unwrap_err();
    assert!(matches!(err, Error::MissingReferenceView));
}

#[tokio::test]
async fn test_start_form_for_unknown_model_fails() {
    let backend = backend();
    let session = WizardSession::begin(WizardContext::new("no.such", 1, vec![1]));

    let uow = backend.begin().await.unwrap();
    let err = session.start_form(uow.as_ref()).await.unwrap_err();
    assert!(matches!(err, Error::UnknownModel(_)));
}
