use super::template::PathTemplate;
use http::Method;
use jsonschema::Draft;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Media type whose request bodies the gateway parses and validates.
pub const JSON_MEDIA_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Parse the value of a parameter's `in` field.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
        }
    }
}

/// A declared operation parameter.
#[derive(Debug, Clone)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// The schema's `enum`, when declared
    pub allowed_values: Option<Vec<Value>>,
}

impl ParameterMeta {
    /// Whether a raw (string) value is a member of the declared enum.
    ///
    /// Always true when no enum is declared. Non-string enum members are
    /// compared by their JSON rendering, so `"1"` is accepted for `enum: [1, 2]`.
    #[must_use]
    pub fn allows(&self, value: &str) -> bool {
        match &self.allowed_values {
            None => true,
            Some(allowed) => allowed.iter().any(|candidate| match candidate {
                Value::String(s) => s == value,
                other => other.to_string() == value,
            }),
        }
    }

    /// Comma-separated allowed values for error messages.
    #[must_use]
    pub fn allowed_values_display(&self) -> String {
        self.allowed_values
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// JSON Schema dialect of the schema objects in an OpenAPI document.
///
/// 3.0 schema objects extend Draft 4 (boolean `exclusiveMinimum` and
/// `exclusiveMaximum`); 3.1 adopts 2020-12.
#[must_use]
pub fn schema_draft(openapi: &str) -> Draft {
    if openapi.starts_with("3.0") {
        Draft::Draft4
    } else {
        Draft::Draft202012
    }
}

/// A JSON Schema compiled once at load time and shared by every request.
#[derive(Clone)]
pub struct CompiledSchema {
    raw: Value,
    validator: Arc<jsonschema::Validator>,
}

impl CompiledSchema {
    /// Compile `raw` under `draft`; the error carries the compiler's message.
    pub fn compile(raw: Value, draft: Draft) -> Result<Self, String> {
        let validator = jsonschema::options()
            .with_draft(draft)
            .build(&raw)
            .map_err(|e| e.to_string())?;
        Ok(Self {
            raw,
            validator: Arc::new(validator),
        })
    }

    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Validate an instance, returning the first violation's message.
    pub fn validate(&self, instance: &Value) -> Result<(), String> {
        self.validator
            .validate(instance)
            .map_err(|error| error.to_string())
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

/// The `requestBody` of an operation.
#[derive(Debug, Clone)]
pub struct RequestBodyMeta {
    /// Declared media types with their raw (ref-expanded) schemas, in document order
    pub content: Vec<(String, Option<Value>)>,
    /// Compiled schema of the `application/json` entry, if it declares one
    pub json_schema: Option<CompiledSchema>,
}

impl RequestBodyMeta {
    #[must_use]
    pub fn declares(&self, media_type: &str) -> bool {
        self.content.iter().any(|(mt, _)| mt == media_type)
    }

    #[must_use]
    pub fn declares_json(&self) -> bool {
        self.declares(JSON_MEDIA_TYPE)
    }
}

/// One declared operation: the contract for a (path template, method) pair.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    pub path_pattern: String,
    pub template: PathTemplate,
    pub operation_id: Option<String>,
    /// Operation parameters merged over the path item's parameters
    pub parameters: Vec<ParameterMeta>,
    pub request_body: Option<RequestBodyMeta>,
}

impl RouteMeta {
    pub fn query_parameters(&self) -> impl Iterator<Item = &ParameterMeta> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Query)
    }

    /// Name used in logs: the operationId, or `METHOD template`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.operation_id {
            Some(id) => id.clone(),
            None => format!("{} {}", self.method, self.path_pattern),
        }
    }
}

/// A path template with the operations declared under it.
#[derive(Debug, Clone)]
pub struct PathItem {
    pub template: PathTemplate,
    /// Operations in document order
    pub operations: Vec<Arc<RouteMeta>>,
}

impl PathItem {
    #[must_use]
    pub fn operation(&self, method: &Method) -> Option<&Arc<RouteMeta>> {
        self.operations.iter().find(|op| op.method == *method)
    }
}

/// The loaded, validated OpenAPI document.
///
/// Immutable once built; shared behind an `Arc` for the process lifetime.
#[derive(Debug, Clone)]
pub struct Specification {
    pub openapi: String,
    pub title: String,
    pub version: String,
    /// Path items in document order
    pub paths: Vec<PathItem>,
}

impl Specification {
    /// Every operation, path items in document order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<RouteMeta>> {
        self.paths.iter().flat_map(|item| item.operations.iter())
    }

    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.paths.iter().map(|item| item.operations.len()).sum()
    }

    /// Look up an operation by its exact template string and method.
    #[must_use]
    pub fn operation(&self, path_pattern: &str, method: &Method) -> Option<&Arc<RouteMeta>> {
        self.paths
            .iter()
            .find(|item| item.template.as_str() == path_pattern)
            .and_then(|item| item.operation(method))
    }
}
