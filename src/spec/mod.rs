//! Loading and structural validation of the OpenAPI document.
//!
//! The document is read once at startup into an immutable [`Specification`]
//! whose path items and operations keep document order.

mod build;
mod load;
mod template;
mod types;

pub use build::{
    build_specification, expand_schema_refs, numeric_exclusive_bounds, resolve_ref,
    strip_unknown_verbs, METHODS,
};
pub use load::{load_spec, parse_spec, SpecFormat, SpecLoadError};
pub use template::{ParamVec, PathTemplate, Segment, MAX_INLINE_PARAMS};
pub use types::*;
