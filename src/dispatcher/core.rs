use crate::error::{ErrorBody, ErrorKind};
use crate::forwarder::{Forwarder, UpstreamResponse};
use crate::ids::RequestId;
use crate::router::{Router, REGISTERED_METHODS};
use crate::sanitizer::sanitize_headers;
use crate::server::IncomingRequest;
use crate::spec::{RouteMeta, Specification};
use crate::validator::validate_request;
use axum::body::{Body, Bytes};
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Response produced by one dispatch: either relayed from the upstream or
/// generated by the gateway itself.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GatewayResponse {
    fn json(status: StatusCode, body: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Bytes::from(body),
        }
    }

    /// Structured failure `{"error": "<kind>", "detail": "<detail>"}` with the kind's status.
    #[must_use]
    pub fn error(kind: ErrorKind, detail: &str) -> Self {
        let body = serde_json::to_vec(&ErrorBody {
            error: kind,
            detail,
        })
        .unwrap_or_else(|e| {
            error!(error = %e, kind = %kind, "Failed to serialize error body");
            Vec::new()
        });
        Self::json(kind.status(), body)
    }

    /// Response for requests no dispatch entry is registered for.
    #[must_use]
    pub fn not_found() -> Self {
        Self::json(StatusCode::NOT_FOUND, br#"{"detail":"Not Found"}"#.to_vec())
    }

    /// Relay an upstream response with sanitized headers.
    #[must_use]
    pub fn from_upstream(upstream: UpstreamResponse) -> Self {
        Self {
            status: upstream.status,
            headers: sanitize_headers(&upstream.headers),
            body: upstream.body,
        }
    }
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Dispatches requests to the operation each registered entry is bound to.
///
/// One entry exists per declared (template, method) pair with a method in
/// [`REGISTERED_METHODS`]. The operation is captured when the entry is
/// registered and never looked up again per request.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    router: Router,
    forwarder: Arc<Forwarder>,
}

impl Dispatcher {
    /// Create an empty dispatcher; entries are added with [`Dispatcher::register`].
    #[must_use]
    pub fn new(forwarder: Arc<Forwarder>) -> Self {
        Self {
            router: Router::default(),
            forwarder,
        }
    }

    /// Register every eligible operation of `spec`, in document order.
    #[must_use]
    pub fn from_spec(spec: &Specification, forwarder: Arc<Forwarder>) -> Self {
        let mut dispatcher = Self::new(forwarder);
        for operation in spec.operations() {
            dispatcher.register(Arc::clone(operation));
        }
        info!(
            entries = dispatcher.len(),
            declared_operations = spec.operation_count(),
            upstream = %dispatcher.forwarder.base_url(),
            "Gateway dispatch table ready"
        );
        dispatcher
    }

    /// Register a dispatch entry bound to `route`.
    ///
    /// Returns `false` (and registers nothing) for methods outside
    /// [`REGISTERED_METHODS`].
    pub fn register(&mut self, route: Arc<RouteMeta>) -> bool {
        if !REGISTERED_METHODS.contains(&route.method) {
            debug!(
                method = %route.method,
                path = %route.path_pattern,
                "Skipping operation with unregistered method"
            );
            return false;
        }

        let method = route.method.clone();
        let path = route.path_pattern.clone();
        let operation = route.display_name();
        if let Some(previous) = self.router.insert(route) {
            warn!(
                method = %method,
                path = %path,
                replaced = %previous.display_name(),
                "Replaced existing dispatch entry"
            );
        }
        info!(
            method = %method,
            path = %path,
            operation = %operation,
            total_entries = self.router.len(),
            "Registering route"
        );
        true
    }

    /// Registered entries in document order.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<RouteMeta>> {
        self.router.routes()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.router.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }

    /// Run one request through match → validate → forward → sanitize.
    pub async fn dispatch(&self, request: IncomingRequest) -> GatewayResponse {
        let request_id = RequestId::from_headers(&request.headers);
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %request.method,
            path = %request.path
        );
        self.dispatch_inner(request).instrument(span).await
    }

    async fn dispatch_inner(&self, request: IncomingRequest) -> GatewayResponse {
        let Some(route_match) = self.router.route(&request.method, &request.path) else {
            debug!("No dispatch entry; responding 404");
            return GatewayResponse::not_found();
        };
        let route = &route_match.route;

        if let Err(failure) = validate_request(route, &request) {
            debug!(
                operation = %route.display_name(),
                kind = %failure.kind,
                detail = %failure.detail,
                "Request rejected by validation"
            );
            return GatewayResponse::error(failure.kind, &failure.detail);
        }

        match self.forwarder.forward(&request).await {
            Ok(upstream) => GatewayResponse::from_upstream(upstream),
            Err(e) => GatewayResponse::error(e.kind(), e.client_detail()),
        }
    }
}
