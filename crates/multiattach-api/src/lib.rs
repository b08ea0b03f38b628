//! # multiattach-api
//!
//! HTTP API for the multiattach registry and bulk-attach wizard.
//!
//! The router only depends on a [`Backend`], so it runs unchanged over the
//! PostgreSQL database or the in-memory backend used in tests.

pub mod config;
pub mod handlers;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::error;
use uuid::Uuid;

use multiattach_core::{ActionId, Backend, Error};

pub use config::ApiConfig;

/// Generates UUIDv7 request IDs for the `x-request-id` header.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    /// Fixed wizard action id; resolved by name when unset.
    pub wizard_action: Option<ActionId>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            wizard_action: None,
        }
    }

    pub fn with_wizard_action(mut self, action: Option<ActionId>) -> Self {
        self.wizard_action = action;
        self
    }
}

/// Library error carried to the HTTP response.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::UnsupportedModel(_) | Error::UnknownModel(_) | Error::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::UniquenessViolation(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            error!(subsystem = "api", error = %self.0, "Request failed");
        }

        let body = Json(serde_json::json!({
            "error": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the application router.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    use handlers::{registry, wizard};

    Router::new()
        .route("/health", get(health_check))
        // Registry
        .route(
            "/api/v1/registry",
            get(registry::list_entries).post(registry::create_entry),
        )
        .route(
            "/api/v1/registry/:id",
            get(registry::get_entry)
                .patch(registry::update_entry)
                .delete(registry::delete_entry),
        )
        .route(
            "/api/v1/registry/:id/create-wizard",
            post(registry::create_wizard),
        )
        .route(
            "/api/v1/registry/:id/remove-wizard",
            post(registry::remove_wizard),
        )
        // Wizard
        .route("/api/v1/wizard/start", get(wizard::start))
        .route("/api/v1/wizard/attach", post(wizard::attach))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}
