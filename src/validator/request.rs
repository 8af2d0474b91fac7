use crate::error::{ErrorKind, ValidationFailure, ValidationOutcome};
use crate::server::IncomingRequest;
use crate::spec::{RouteMeta, JSON_MEDIA_TYPE};
use http::header::CONTENT_TYPE;
use http::Method;
use serde_json::Value;
use tracing::debug;

/// Whether `method` carries a body that is checked against the operation.
#[must_use]
pub fn method_has_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Check the declared query parameters of `route` against the request.
///
/// Required parameters must be present; present parameters with an `enum`
/// must use one of its members. Parameters in other locations are not checked.
///
/// # Errors
///
/// The first violation, as `missing_required_parameter` or `invalid_parameter_value`.
pub fn validate_parameters(route: &RouteMeta, request: &IncomingRequest) -> ValidationOutcome {
    for param in route.query_parameters() {
        match request.query_param(&param.name) {
            None if param.required => {
                return Err(ValidationFailure::new(
                    ErrorKind::MissingRequiredParameter,
                    format!("Missing required query parameter: {}", param.name),
                ));
            }
            None => {}
            Some(value) if !param.allows(value) => {
                return Err(ValidationFailure::new(
                    ErrorKind::InvalidParameterValue,
                    format!(
                        "Invalid value for {}. Must be one of: {}",
                        param.name,
                        param.allowed_values_display()
                    ),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Check the request body of POST/PUT/PATCH requests whose operation declares
/// an `application/json` request body.
///
/// # Errors
///
/// `unsupported_media_type` when the content type is not exactly
/// `application/json`, `malformed_body` when the body is not JSON and
/// `schema_violation` when it does not satisfy the declared schema.
pub fn validate_body(route: &RouteMeta, request: &IncomingRequest) -> ValidationOutcome {
    if !method_has_body(&request.method) {
        return Ok(());
    }
    let Some(body_meta) = route.request_body.as_ref() else {
        return Ok(());
    };
    if !body_meta.declares_json() {
        return Ok(());
    }

    let content_type = request
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if content_type != Some(JSON_MEDIA_TYPE) {
        return Err(ValidationFailure::new(
            ErrorKind::UnsupportedMediaType,
            format!("Unsupported Media Type. Expected '{JSON_MEDIA_TYPE}'"),
        ));
    }

    let body: Value = serde_json::from_slice(&request.body).map_err(|e| {
        debug!(error = %e, "Request body is not JSON");
        ValidationFailure::new(ErrorKind::MalformedBody, "Invalid JSON body")
    })?;

    if let Some(schema) = &body_meta.json_schema {
        schema.validate(&body).map_err(|message| {
            ValidationFailure::new(
                ErrorKind::SchemaViolation,
                format!("Invalid request body: {message}"),
            )
        })?;
    }
    Ok(())
}

/// Validate a request against its operation: parameters first, then the body.
///
/// # Errors
///
/// The first failure found; later checks are skipped.
pub fn validate_request(route: &RouteMeta, request: &IncomingRequest) -> ValidationOutcome {
    validate_parameters(route, request)?;
    validate_body(route, request)
}
