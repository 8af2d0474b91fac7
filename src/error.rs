//! Gateway error taxonomy.
//!
//! Every failure the gateway produces on its own (as opposed to a status relayed
//! from the upstream) is classified by an [`ErrorKind`]. The kind fixes both the
//! machine-readable code returned to clients and the HTTP status.

use http::StatusCode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of gateway-produced failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing specification at startup (fatal, never sent to a client)
    SpecLoadFailure,
    MissingRequiredParameter,
    InvalidParameterValue,
    UnsupportedMediaType,
    MalformedBody,
    SchemaViolation,
    /// Connection could not be established or the upstream call timed out
    UpstreamUnreachable,
    /// Any other failure while talking to the upstream
    UpstreamError,
}

impl ErrorKind {
    /// Wire code used in error bodies and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::SpecLoadFailure => "spec_load_failure",
            ErrorKind::MissingRequiredParameter => "missing_required_parameter",
            ErrorKind::InvalidParameterValue => "invalid_parameter_value",
            ErrorKind::UnsupportedMediaType => "unsupported_media_type",
            ErrorKind::MalformedBody => "malformed_body",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::UpstreamUnreachable => "upstream_unreachable",
            ErrorKind::UpstreamError => "upstream_error",
        }
    }

    /// HTTP status surfaced to the client for this kind.
    ///
    /// `SpecLoadFailure` never reaches a client; it maps to 500 only so the
    /// function stays total.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::MissingRequiredParameter
            | ErrorKind::InvalidParameterValue
            | ErrorKind::MalformedBody
            | ErrorKind::SchemaViolation => StatusCode::BAD_REQUEST,
            ErrorKind::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::UpstreamUnreachable => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorKind::SpecLoadFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request rejected by validation before any upstream I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct ValidationFailure {
    pub kind: ErrorKind,
    /// Human-readable explanation returned to the client
    pub detail: String,
}

impl ValidationFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

/// Result of validating one request against its operation.
pub type ValidationOutcome = Result<(), ValidationFailure>;

/// Body returned to clients for every gateway-produced failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody<'a> {
    pub error: ErrorKind,
    pub detail: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::MissingRequiredParameter.status(), 400);
        assert_eq!(ErrorKind::InvalidParameterValue.status(), 400);
        assert_eq!(ErrorKind::UnsupportedMediaType.status(), 415);
        assert_eq!(ErrorKind::MalformedBody.status(), 400);
        assert_eq!(ErrorKind::SchemaViolation.status(), 400);
        assert_eq!(ErrorKind::UpstreamUnreachable.status(), 504);
        assert_eq!(ErrorKind::UpstreamError.status(), 502);
    }

    #[test]
    fn test_error_body_uses_snake_case_codes() {
        let body = ErrorBody {
            error: ErrorKind::UnsupportedMediaType,
            detail: "nope",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "unsupported_media_type");
        assert_eq!(json["detail"], "nope");
    }
}
