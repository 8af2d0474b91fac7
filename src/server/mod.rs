//! HTTP transport: the axum application, its shared state and the listener.

pub mod health;
pub mod http_server;
pub mod request;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_query_params, IncomingRequest};
pub use service::{build_app, AppService, AppState};
