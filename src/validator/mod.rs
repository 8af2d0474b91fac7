//! Request validation against the matched operation, plus the issue type used
//! to report structural problems in the specification.

mod issues;
mod request;

pub use issues::{format_issues, ValidationIssue};
pub use request::{method_has_body, validate_body, validate_parameters, validate_request};
