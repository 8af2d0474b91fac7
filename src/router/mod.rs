//! # Router Module
//!
//! Resolves a concrete request (method + path) to the declared operation it
//! must be validated against.
//!
//! ## Matching
//!
//! Request paths and templates are split on `/`. A template fits when both
//! have the same number of segments, every literal segment is equal and every
//! `{name}` placeholder binds exactly one request segment. Templates are tried
//! in document order and the first one that fits *and* declares the method
//! wins; overlapping templates are not ranked by specificity.
//!
//! ```rust,ignore
//! use oasgate::router::Router;
//! use oasgate::spec::load_spec;
//!
//! let spec = load_spec("openapi.yaml")?;
//! let router = Router::from_spec(&spec);
//! if let Some(m) = router.route(&http::Method::GET, "/pets/123") {
//!     println!("{} id={:?}", m.route.path_pattern, m.get_path_param("id"));
//! }
//! ```

mod core;

pub use core::{find_operation, RouteMatch, Router, REGISTERED_METHODS};
