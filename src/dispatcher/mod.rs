//! # Dispatcher Module
//!
//! The dispatcher is the gateway pipeline. At startup it registers one entry
//! per declared (path template, method) pair for GET, POST, PUT, DELETE and
//! PATCH, each bound to its operation. Per request it:
//!
//! 1. Matches the request to an entry (unmatched requests get a plain 404)
//! 2. Validates query parameters and body against the bound operation
//! 3. On failure, responds with the failure's status and
//!    `{"error": "<kind>", "detail": "..."}` without contacting the upstream
//! 4. Otherwise forwards the request and relays the upstream response with
//!    sanitized headers
//!
//! Transport failures are answered with 504 (`upstream_unreachable`) or 502
//! (`upstream_error`); their details only go to the logs.

mod core;

pub use core::{Dispatcher, GatewayResponse};
