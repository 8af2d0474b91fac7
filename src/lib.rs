//! # oasgate
//!
//! **oasgate** is an API gateway driven by an [OpenAPI 3](https://spec.openapis.org/oas/v3.0.3)
//! document. The document is the contract: only the operations it declares are
//! routable, every request is validated against its operation before anything
//! reaches the upstream, and upstream responses are relayed with their framing
//! headers stripped.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Loads the document once at startup and validates its structure
//! - **[`router`]** - Matches a request path and method to a declared operation
//! - **[`validator`]** - Checks query parameters and JSON request bodies
//! - **[`forwarder`]** - Relays valid requests to the single upstream service
//! - **[`sanitizer`]** - Filters upstream response headers
//! - **[`dispatcher`]** - The per-request pipeline tying the above together
//! - **[`server`]** - axum application: `/health`, `/ready` and the gateway fallback
//!
//! ### Request flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as server (axum)
//!     participant Dispatcher as dispatcher
//!     participant Validator as validator
//!     participant Forwarder as forwarder
//!     participant Upstream
//!
//!     Client->>Server: HTTP request
//!     Server->>Dispatcher: IncomingRequest
//!     Dispatcher->>Dispatcher: router.route(method, path)
//!     alt no dispatch entry
//!         Dispatcher-->>Client: 404
//!     end
//!     Dispatcher->>Validator: validate_request(route, request)
//!     alt invalid
//!         Validator-->>Client: 400/415 {"error", "detail"}
//!     end
//!     Dispatcher->>Forwarder: forward(request)
//!     Forwarder->>Upstream: same method, headers (minus host), body
//!     alt connect failure / timeout
//!         Forwarder-->>Client: 504 upstream_unreachable
//!     else other transport failure
//!         Forwarder-->>Client: 502 upstream_error
//!     end
//!     Upstream-->>Forwarder: status, headers, body
//!     Forwarder->>Dispatcher: UpstreamResponse
//!     Dispatcher-->>Client: status, sanitized headers, body
//! ```
//!
//! ## Quick start
//!
//! ```bash
//! export OPENAPI_SPEC_PATH=openapi.yaml
//! export UPSTREAM_SERVER_URL=http://localhost:9000
//! oasgate serve
//! ```
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use oasgate::forwarder::{Forwarder, ForwarderConfig};
//! use oasgate::server::{build_app, AppService, AppState, HttpServer};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let spec = oasgate::spec::load_spec("openapi.yaml")?;
//! let forwarder = Arc::new(Forwarder::new(&ForwarderConfig::new("http://localhost:9000"))?);
//! let state = AppState::ready(AppService::new(spec, forwarder));
//! let server = HttpServer(build_app(state, 2 * 1024 * 1024)).start("127.0.0.1:8000").await?;
//! server.join().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod forwarder;
pub mod ids;
pub mod logging;
pub mod router;
pub mod runtime_config;
pub mod sanitizer;
pub mod server;
pub mod spec;
pub mod validator;

pub use dispatcher::{Dispatcher, GatewayResponse};
pub use error::{ErrorKind, ValidationFailure, ValidationOutcome};
pub use forwarder::{ForwardError, Forwarder, ForwarderConfig, UpstreamResponse};
pub use router::{find_operation, RouteMatch, Router};
pub use spec::{load_spec, RouteMeta, SpecLoadError, Specification};
