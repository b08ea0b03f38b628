//! Bulk-attach wizard HTTP handlers.
//!
//! The wizard is stateless over HTTP: `start` returns the form and the
//! defaults for one invocation, `attach` replays the invocation context with
//! the operator's input and runs the pressed button.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use multiattach_core::{
    AttachmentId, Error, FormView, RecordId, ReplicationOutcome, ResourceRef, WizardButton,
    WizardContext, WizardSession, WizardStart, WizardState,
};

use crate::{ApiError, AppState};

/// Query parameters of the start form request.
#[derive(Debug, Default, Deserialize)]
pub struct StartQuery {
    pub active_model: Option<String>,
    pub active_id: Option<RecordId>,
    /// Comma-separated record ids of the operator's selection.
    pub active_ids: Option<String>,
}

impl StartQuery {
    fn into_context(self) -> Result<WizardContext, Error> {
        let active_ids = match self.active_ids.as_deref() {
            Some(raw) => parse_ids(raw)?,
            None => Vec::new(),
        };
        Ok(WizardContext {
            active_model: self.active_model.filter(|m| !m.is_empty()),
            active_id: self.active_id,
            active_ids,
        })
    }
}

/// Parse a comma-separated list of record ids, ignoring blanks.
pub fn parse_ids(raw: &str) -> Result<Vec<RecordId>, Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| Error::InvalidInput(format!("invalid record id: {s}")))
        })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub form: FormView,
    pub defaults: WizardStart,
}

/// Build the start form of a new invocation.
pub async fn start(
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
) -> Result<Json<StartResponse>, ApiError> {
    let session = WizardSession::begin(query.into_context()?);
    let uow = state.backend.begin().await?;
    let form = session.start_form(uow.as_ref()).await?;
    Ok(Json(StartResponse {
        form,
        defaults: session.start.clone(),
    }))
}

/// Submission of the start state.
#[derive(Debug, Deserialize)]
pub struct AttachRequest {
    #[serde(flatten)]
    pub context: WizardContext,
    pub attachment: Option<AttachmentId>,
    /// Target records; the selection in the context when omitted.
    pub records: Option<Vec<RecordId>>,
    pub button: WizardButton,
}

/// One copy persisted by an attach run.
#[derive(Debug, Serialize, Deserialize)]
pub struct CopySummary {
    pub id: AttachmentId,
    pub resource: ResourceRef,
}

/// Replication result as returned over HTTP. Attachment content is never
/// echoed back.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttachSummary {
    pub copies: Vec<CopySummary>,
    pub skipped: Vec<RecordId>,
    /// Id of the working attachment after the last record.
    pub current: AttachmentId,
}

impl From<ReplicationOutcome> for AttachSummary {
    fn from(outcome: ReplicationOutcome) -> Self {
        Self {
            copies: outcome
                .copies
                .into_iter()
                .map(|copy| CopySummary {
                    id: copy.id,
                    resource: copy.resource,
                })
                .collect(),
            skipped: outcome.skipped,
            current: outcome.current.id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttachResponse {
    pub state: WizardState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<AttachSummary>,
}

/// Press a button of the start state.
pub async fn attach(
    State(state): State<AppState>,
    Json(body): Json<AttachRequest>,
) -> Result<Json<AttachResponse>, ApiError> {
    let mut session = WizardSession::begin(body.context);
    session.start.attachment = body.attachment;
    if let Some(records) = body.records {
        session.start.records = records;
    }
    debug!(
        subsystem = "api",
        op = "attach",
        button = ?body.button,
        record_count = session.start.records.len(),
        "Wizard submission"
    );

    let uow = state.backend.begin().await?;
    let outcome = session.submit(uow.as_ref(), body.button).await?;
    uow.commit().await?;

    Ok(Json(AttachResponse {
        state: session.state(),
        outcome: outcome.map(AttachSummary::from),
    }))
}
