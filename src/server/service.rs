use super::health;
use super::request::IncomingRequest;
use crate::dispatcher::Dispatcher;
use crate::forwarder::Forwarder;
use crate::spec::Specification;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json,
};
use once_cell::sync::OnceCell;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// The running gateway: the loaded specification and its dispatch table.
#[derive(Debug, Clone)]
pub struct AppService {
    pub spec: Arc<Specification>,
    pub dispatcher: Dispatcher,
}

impl AppService {
    /// Register every eligible operation of `spec` against `forwarder`.
    #[must_use]
    pub fn new(spec: Arc<Specification>, forwarder: Arc<Forwarder>) -> Self {
        let dispatcher = Dispatcher::from_spec(&spec, forwarder);
        Self { spec, dispatcher }
    }
}

/// Shared state injected into every axum handler via [`State`].
///
/// The listener starts before the specification is loaded; the gateway is
/// installed exactly once afterwards and read without locking.
#[derive(Clone, Default)]
pub struct AppState {
    service: Arc<OnceCell<AppService>>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State with the gateway already installed.
    #[must_use]
    pub fn ready(service: AppService) -> Self {
        let state = Self::new();
        let _installed = state.service.set(service).is_ok();
        state
    }

    /// Install the gateway; fails (returning it) if one is already installed.
    ///
    /// # Errors
    ///
    /// Returns the rejected service when a gateway is already installed.
    pub fn install(&self, service: AppService) -> Result<(), AppService> {
        let entries = service.dispatcher.len();
        self.service.set(service)?;
        info!(entries, "Gateway installed; ready for traffic");
        Ok(())
    }

    #[must_use]
    pub fn service(&self) -> Option<&AppService> {
        self.service.get()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.service.get().is_some()
    }
}

/// Fallback handler: every request that is not `/health` or `/ready`.
async fn gateway(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(service) = state.service() else {
        warn!(method = %method, path = %uri.path(), "Request received before gateway was ready");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "Service Unavailable" })),
        )
            .into_response();
    };

    let request = IncomingRequest::from_parts(method, &uri, headers, body);
    service.dispatcher.dispatch(request).await.into_response()
}

/// Build the axum application around `state`.
///
/// `GET /health` and `GET /ready` are answered locally; any other method on
/// those paths goes through the gateway like every other request. Request
/// bodies above `max_body_bytes` are rejected with 413 before they reach
/// validation.
pub fn build_app(state: AppState, max_body_bytes: usize) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health::health).fallback(gateway))
        .route("/ready", get(health::ready).fallback(gateway))
        .fallback(gateway)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}
