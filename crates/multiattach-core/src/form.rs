//! Wizard-start form augmentation.
//!
//! The registered start form only carries a layout skeleton. The attachment
//! picker and the records list depend on the model the wizard was launched
//! from, so they are injected per invocation, right after the form's
//! `separator`.

use tracing::debug;

use crate::defaults::{
    ANCHOR_TAG, ATTACHMENT_COLSPAN, ATTACHMENT_FIELD, ATTACHMENT_MODEL, MODULE_NAME,
    RECORDS_COLSPAN, RECORDS_FIELD, WIZARD_START_MODEL,
};
use crate::error::{Error, Result};
use crate::models::{RecordId, ResourceRef, ViewKind, ViewRef, WizardContext};
use crate::traits::{ModelCatalog, ViewStore};
use crate::view::{DomainClause, FieldSpec, FormView, ViewElement};

/// Metadata of the attachment picker for `model`.
///
/// The picker only offers attachments of `model` records; attachments created
/// from it default to the active record.
pub fn attachment_field(model: &str, active_id: Option<RecordId>) -> FieldSpec {
    let resource = match active_id {
        Some(id) => ResourceRef::new(model, id).to_string(),
        None => format!("{model},"),
    };
    FieldSpec::many2one(ATTACHMENT_FIELD, "Attachment", ATTACHMENT_MODEL)
        .required()
        .with_domain(DomainClause::new(
            "resource",
            "like",
            ResourceRef::model_pattern(model),
        ))
        .with_context("resource", resource)
}

/// Metadata of the free list of target `model` records.
pub fn records_field(model: &str) -> FieldSpec {
    FieldSpec::one2many(RECORDS_FIELD, "Records", model).required()
}

/// Inject the attachment picker and records list into `form`.
///
/// Returns `form` unchanged when the context has no active model.
pub fn augment(
    mut form: FormView,
    context: &WizardContext,
    attachment_view: &ViewRef,
) -> Result<FormView> {
    let Some(model) = context.active_model.as_deref() else {
        return Ok(form);
    };

    let parent = form.tree.parent_of_first_mut(ANCHOR_TAG).ok_or_else(|| {
        Error::InvalidInput(format!("form has no {ANCHOR_TAG} to anchor fields"))
    })?;
    parent.append_children([
        ViewElement::new("label")
            .attr("name", ATTACHMENT_FIELD)
            .attr("colspan", ATTACHMENT_COLSPAN),
        ViewElement::new("field")
            .attr("name", ATTACHMENT_FIELD)
            .attr("colspan", ATTACHMENT_COLSPAN)
            .attr("view_ids", attachment_view.id),
        ViewElement::new("field")
            .attr("name", RECORDS_FIELD)
            .attr("colspan", RECORDS_COLSPAN),
    ]);

    form.fields.insert(
        ATTACHMENT_FIELD.to_string(),
        attachment_field(model, context.active_id),
    );
    form.fields
        .insert(RECORDS_FIELD.to_string(), records_field(model));
    Ok(form)
}

/// Locate the attachment list view installed for the wizard.
pub async fn attachment_view<S>(store: &S) -> Result<ViewRef>
where
    S: ViewStore + ?Sized,
{
    store
        .find_views(ATTACHMENT_MODEL, ViewKind::Tree, MODULE_NAME)
        .await?
        .into_iter()
        .next()
        .ok_or(Error::MissingReferenceView)
}

/// Build the start form for one wizard invocation.
pub async fn start_form<S>(store: &S, context: &WizardContext) -> Result<FormView>
where
    S: ViewStore + ModelCatalog + ?Sized,
{
    let view = attachment_view(store).await?;
    let form = store
        .form_view(WIZARD_START_MODEL)
        .await?
        .ok_or_else(|| Error::NotFound(format!("form view of {WIZARD_START_MODEL}")))?;

    let Some(model) = context.active_model.as_deref() else {
        debug!(subsystem = "form", "No active model, returning base form");
        return Ok(form);
    };
    let descriptor = store
        .describe(model)
        .await?
        .ok_or_else(|| Error::UnknownModel(model.to_string()))?;

    debug!(
        subsystem = "form",
        model = %descriptor.name,
        view_id = view.id,
        "Augmenting start form"
    );
    augment(form, context, &view)
}
