//! Bulk-attach wizard state machine.
//!
//! ```text
//! start --Cancel--> end
//! start --Attach--> attach --> end
//! ```
//!
//! A failed attach returns the session to `start` so the operator can fix the
//! input and submit again.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::form;
use crate::models::{WizardContext, WizardStart};
use crate::replication::{self, ReplicationOutcome};
use crate::traits::{AttachmentStore, ModelCatalog, ViewStore};
use crate::view::FormView;

/// Wizard states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    Start,
    Attach,
    End,
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Attach => write!(f, "attach"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Buttons offered by the start state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardButton {
    Cancel,
    Attach,
}

/// One invocation of the wizard.
#[derive(Debug, Clone)]
pub struct WizardSession {
    context: WizardContext,
    state: WizardState,
    /// Operator input for the start state.
    pub start: WizardStart,
}

impl WizardSession {
    /// Enter `start` with the operator's selection as target records.
    pub fn begin(context: WizardContext) -> Self {
        let start = WizardStart::defaults(&context);
        Self {
            context,
            state: WizardState::Start,
            start,
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn context(&self) -> &WizardContext {
        &self.context
    }

    /// Form shown by the start state.
    pub async fn start_form<S>(&self, store: &S) -> Result<FormView>
    where
        S: ViewStore + ModelCatalog + ?Sized,
    {
        form::start_form(store, &self.context).await
    }

    /// Press `button` in the start state.
    ///
    /// Returns the replication outcome when the attach transition ran.
    pub async fn submit<S>(
        &mut self,
        store: &S,
        button: WizardButton,
    ) -> Result<Option<ReplicationOutcome>>
    where
        S: AttachmentStore + ?Sized,
    {
        if self.state != WizardState::Start {
            return Err(Error::InvalidInput(format!(
                "wizard is in state {}, expected start",
                self.state
            )));
        }

        match button {
            WizardButton::Cancel => {
                self.state = WizardState::End;
                Ok(None)
            }
            WizardButton::Attach => {
                self.state = WizardState::Attach;
                match self.transition_attach(store).await {
                    Ok(outcome) => {
                        self.state = WizardState::End;
                        Ok(Some(outcome))
                    }
                    Err(e) => {
                        warn!(
                            subsystem = "wizard",
                            op = "attach",
                            error = %e,
                            "Attach failed, returning to start"
                        );
                        self.state = WizardState::Start;
                        Err(e)
                    }
                }
            }
        }
    }

    async fn transition_attach<S>(&self, store: &S) -> Result<ReplicationOutcome>
    where
        S: AttachmentStore + ?Sized,
    {
        let model = self
            .context
            .active_model
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("no active model".to_string()))?;
        let attachment_id = self
            .start
            .attachment
            .ok_or_else(|| Error::InvalidInput("no attachment selected".to_string()))?;
        if self.start.records.is_empty() {
            return Err(Error::InvalidInput("no records selected".to_string()));
        }
        let attachment = store
            .get_attachment(attachment_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("attachment {attachment_id}")))?;

        let outcome =
            replication::replicate(store, attachment, model, &self.start.records).await?;
        info!(
            subsystem = "wizard",
            op = "attach",
            model = %model,
            attachment_id = attachment_id,
            copy_count = outcome.copy_count(),
            "Attach completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::models::{NewAttachment, ResourceRef};
    use crate::traits::Backend;

    #[test]
    fn test_begin_seeds_records_from_selection() {
        let session = WizardSession::begin(WizardContext::new("M", 7, vec![7, 8]));
        assert_eq!(session.state(), WizardState::Start);
        assert_eq!(session.start.records, vec![7, 8]);
    }

    #[tokio::test]
    async fn test_cancel_ends_without_side_effects() {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        let mut session = WizardSession::begin(WizardContext::new("M", 7, vec![7, 8]));

        let outcome = session.submit(uow.as_ref(), WizardButton::Cancel).await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(session.state(), WizardState::End);
        assert!(uow.list_for_model("M").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attach_without_selection_stays_at_start() {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        let mut session = WizardSession::begin(WizardContext::new("M", 7, vec![7, 8]));

        let err = session
            .submit(uow.as_ref(), WizardButton::Attach)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(session.state(), WizardState::Start);
    }

    #[tokio::test]
    async fn test_attach_with_empty_records_stays_at_start() {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        let attachment = uow
            .create_attachment(NewAttachment::new(ResourceRef::new("M", 7), "a.txt"))
            .await
            .unwrap();

        let mut session = WizardSession::begin(WizardContext::new("M", 7, vec![7, 8]));
        session.start.attachment = Some(attachment.id);
        session.start.records.clear();

        let err = session
            .submit(uow.as_ref(), WizardButton::Attach)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m.contains("records")));
        assert_eq!(session.state(), WizardState::Start);
        assert_eq!(uow.list_for_model("M").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attach_unknown_attachment_stays_at_start() {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        let mut session = WizardSession::begin(WizardContext::new("M", 7, vec![7]));
        session.start.attachment = Some(999);

        let err = session
            .submit(uow.as_ref(), WizardButton::Attach)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(session.state(), WizardState::Start);
    }

    #[tokio::test]
    async fn test_attach_ends_even_with_zero_copies() {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        let attachment = uow
            .create_attachment(NewAttachment::new(ResourceRef::new("M", 7), "a.txt"))
            .await
            .unwrap();

        let mut session = WizardSession::begin(WizardContext::new("M", 7, vec![7]));
        session.start.attachment = Some(attachment.id);

        let outcome = session
            .submit(uow.as_ref(), WizardButton::Attach)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.copy_count(), 0);
        assert_eq!(session.state(), WizardState::End);
    }

    #[tokio::test]
    async fn test_submit_after_end_is_rejected() {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        let mut session = WizardSession::begin(WizardContext::new("M", 7, vec![7]));
        session.submit(uow.as_ref(), WizardButton::Cancel).await.unwrap();

        let err = session
            .submit(uow.as_ref(), WizardButton::Cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
