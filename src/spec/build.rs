use super::template::{PathTemplate, Segment};
use super::types::{
    schema_draft, CompiledSchema, ParameterLocation, ParameterMeta, PathItem, RequestBodyMeta,
    RouteMeta, Specification, JSON_MEDIA_TYPE,
};
use crate::validator::ValidationIssue;
use http::Method;
use jsonschema::Draft;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Operation keys of an OpenAPI path item, lower-case as they appear in documents.
pub const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Longest `$ref -> $ref -> ...` chain followed before giving up.
const MAX_REF_HOPS: usize = 16;

/// Remove path item keys the typed OpenAPI model does not know about.
///
/// Keeps the fixed path item fields, the HTTP verbs and `x-` extensions.
pub fn strip_unknown_verbs(val: &mut Value) {
    if let Some(Value::Object(paths_map)) = val.get_mut("paths") {
        for item in paths_map.values_mut() {
            if let Value::Object(obj) = item {
                obj.retain(|k, _| {
                    let lk = k.to_ascii_lowercase();
                    match lk.as_str() {
                        "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                        m if METHODS.contains(&m) => true,
                        _ => k.starts_with("x-"),
                    }
                });
            }
        }
    }
}

/// Resolve a local JSON reference (`#/components/...`) against the document.
#[must_use]
pub fn resolve_ref<'a>(doc: &'a Value, ref_path: &str) -> Option<&'a Value> {
    let pointer = ref_path.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(doc);
    }
    doc.pointer(pointer)
}

/// Follow `$ref` until a concrete object is reached.
///
/// Pushes an issue and returns `None` when a reference does not resolve.
fn resolve_object<'a>(
    doc: &'a Value,
    value: &'a Value,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<&'a Value> {
    let mut current = value;
    for _ in 0..MAX_REF_HOPS {
        let Some(ref_path) = current.get("$ref").and_then(Value::as_str) else {
            return Some(current);
        };
        match resolve_ref(doc, ref_path) {
            Some(target) => current = target,
            None => {
                issues.push(ValidationIssue::new(
                    location,
                    "UnresolvedReference",
                    format!("cannot resolve $ref '{ref_path}'"),
                ));
                return None;
            }
        }
    }
    issues.push(ValidationIssue::new(
        location,
        "UnresolvedReference",
        format!("$ref chain longer than {MAX_REF_HOPS} hops"),
    ));
    None
}

/// Recursively inline every local `$ref` in a schema.
///
/// A reference that is already being expanded further up (a recursive schema)
/// is replaced by the empty (accept-anything) schema `{}`; unresolvable
/// references are reported as issues and left in place.
pub fn expand_schema_refs(
    doc: &Value,
    value: &mut Value,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut stack = Vec::new();
    expand_inner(doc, value, location, issues, &mut stack);
}

fn expand_inner(
    doc: &Value,
    value: &mut Value,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
    stack: &mut Vec<String>,
) {
    match value {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(Value::as_str).map(str::to_string) {
                if stack.contains(&ref_path) {
                    warn!(
                        location = %location,
                        reference = %ref_path,
                        "Recursive schema reference; validation stops at this depth"
                    );
                    *value = Value::Object(Map::new());
                    return;
                }
                match resolve_ref(doc, &ref_path) {
                    Some(target) => {
                        let mut resolved = target.clone();
                        stack.push(ref_path);
                        expand_inner(doc, &mut resolved, location, issues, stack);
                        stack.pop();
                        *value = resolved;
                    }
                    None => issues.push(ValidationIssue::new(
                        location,
                        "UnresolvedReference",
                        format!("cannot resolve $ref '{ref_path}'"),
                    )),
                }
                return;
            }
            for v in obj.values_mut() {
                expand_inner(doc, v, location, issues, stack);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_inner(doc, v, location, issues, stack);
            }
        }
        _ => {}
    }
}

fn openapi_version(doc: &Value) -> &str {
    doc.get("openapi").and_then(Value::as_str).unwrap_or_default()
}

fn check_top_level(doc: &Value, issues: &mut Vec<ValidationIssue>) {
    match doc.get("openapi").and_then(Value::as_str) {
        Some(v) if v.starts_with("3.") => {}
        Some(v) => issues.push(ValidationIssue::new(
            "openapi",
            "UnsupportedVersion",
            format!("unsupported OpenAPI version '{v}', expected 3.x"),
        )),
        None => issues.push(ValidationIssue::new(
            "openapi",
            "MissingField",
            "document has no 'openapi' version string",
        )),
    }

    for field in ["title", "version"] {
        if doc.pointer(&format!("/info/{field}")).and_then(Value::as_str).is_none() {
            issues.push(ValidationIssue::new(
                "info",
                "MissingField",
                format!("'info.{field}' must be a string"),
            ));
        }
    }

    if !matches!(doc.get("paths"), Some(Value::Object(_))) {
        issues.push(ValidationIssue::new(
            "paths",
            "MissingField",
            "'paths' must be an object",
        ));
    }
}

/// Rewrite OpenAPI 3.0 boolean `exclusiveMinimum`/`exclusiveMaximum` into the
/// numeric form used by 3.1 schema objects.
///
/// `{"minimum": 0, "exclusiveMinimum": true}` becomes `{"exclusiveMinimum": 0}`;
/// a `false` flag is dropped.
pub fn numeric_exclusive_bounds(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            let bounds = [("exclusiveMinimum", "minimum"), ("exclusiveMaximum", "maximum")];
            for (flag, bound) in bounds {
                let Some(exclusive) = obj.get(flag).and_then(Value::as_bool) else {
                    continue;
                };
                obj.remove(flag);
                if exclusive {
                    if let Some(limit) = obj.remove(bound) {
                        obj.insert(flag.to_string(), limit);
                    }
                }
            }
            for v in obj.values_mut() {
                numeric_exclusive_bounds(v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                numeric_exclusive_bounds(v);
            }
        }
        _ => {}
    }
}

/// Validate the document against the typed OpenAPI model.
///
/// The model follows 3.1, so 3.0 documents have their boolean exclusive bounds
/// rewritten first.
fn check_typed_model(doc: &Value, issues: &mut Vec<ValidationIssue>) {
    let mut stripped = doc.clone();
    strip_unknown_verbs(&mut stripped);
    if schema_draft(openapi_version(doc)) == Draft::Draft4 {
        numeric_exclusive_bounds(&mut stripped);
    }
    if let Err(e) = serde_json::from_value::<oas3::Spec>(stripped) {
        issues.push(ValidationIssue::new("document", "InvalidDocument", e.to_string()));
    }
}

fn check_template(template: &PathTemplate, issues: &mut Vec<ValidationIssue>) {
    let raw = template.as_str();
    if !raw.starts_with('/') {
        issues.push(ValidationIssue::new(
            raw,
            "InvalidPathTemplate",
            "path templates must start with '/'",
        ));
    }
    for segment in template.segments() {
        match segment {
            Segment::Param(name) => {
                if name.is_empty() || name.contains(['{', '}']) {
                    issues.push(ValidationIssue::new(
                        raw,
                        "InvalidPathTemplate",
                        format!("malformed placeholder '{{{name}}}'"),
                    ));
                }
            }
            Segment::Literal(literal) => {
                if literal.contains(['{', '}']) {
                    warn!(
                        path = %raw,
                        segment = %literal,
                        "Placeholder embedded in a segment is matched literally"
                    );
                }
            }
        }
    }
}

fn build_parameter(
    doc: &Value,
    raw: &Value,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<ParameterMeta> {
    let param = resolve_object(doc, raw, location, issues)?;

    let Some(name) = param.get("name").and_then(Value::as_str) else {
        issues.push(ValidationIssue::new(
            location,
            "InvalidParameter",
            "parameter has no 'name'",
        ));
        return None;
    };
    let in_str = param.get("in").and_then(Value::as_str).unwrap_or_default();
    let Some(param_location) = ParameterLocation::parse(in_str) else {
        issues.push(ValidationIssue::new(
            location,
            "InvalidParameter",
            format!("parameter '{name}' has invalid location '{in_str}'"),
        ));
        return None;
    };
    let required = param
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if param_location == ParameterLocation::Path && !required {
        issues.push(ValidationIssue::new(
            location,
            "InvalidParameter",
            format!("path parameter '{name}' must be required"),
        ));
    }

    let schema = param.get("schema").map(|s| {
        let mut schema = s.clone();
        expand_schema_refs(doc, &mut schema, location, issues);
        schema
    });
    let allowed_values = schema
        .as_ref()
        .and_then(|s| s.get("enum"))
        .and_then(Value::as_array)
        .cloned();

    Some(ParameterMeta {
        name: name.to_string(),
        location: param_location,
        required,
        allowed_values,
    })
}

fn build_parameter_list(
    doc: &Value,
    list: Option<&Value>,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Vec<ParameterMeta> {
    match list {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|raw| build_parameter(doc, raw, location, issues))
            .collect(),
        Some(_) => {
            issues.push(ValidationIssue::new(
                location,
                "InvalidParameter",
                "'parameters' must be an array",
            ));
            Vec::new()
        }
    }
}

/// Operation parameters override path item parameters with the same name and location.
fn merge_parameters(inherited: &[ParameterMeta], own: Vec<ParameterMeta>) -> Vec<ParameterMeta> {
    let mut merged: Vec<ParameterMeta> = inherited
        .iter()
        .filter(|p| {
            !own.iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .cloned()
        .collect();
    merged.extend(own);
    merged
}

fn build_request_body(
    doc: &Value,
    raw: &Value,
    location: &str,
    draft: Draft,
    issues: &mut Vec<ValidationIssue>,
) -> Option<RequestBodyMeta> {
    let body = resolve_object(doc, raw, location, issues)?;
    let Some(content) = body.get("content").and_then(Value::as_object) else {
        issues.push(ValidationIssue::new(
            location,
            "InvalidRequestBody",
            "requestBody has no 'content' object",
        ));
        return None;
    };

    let mut json_schema = None;
    let mut media_types = Vec::with_capacity(content.len());
    for (media_type, media) in content {
        let schema = media.get("schema").map(|s| {
            let mut schema = s.clone();
            expand_schema_refs(doc, &mut schema, location, issues);
            schema
        });
        if media_type == JSON_MEDIA_TYPE {
            if let Some(schema) = &schema {
                match CompiledSchema::compile(schema.clone(), draft) {
                    Ok(compiled) => json_schema = Some(compiled),
                    Err(message) => issues.push(ValidationIssue::new(
                        location,
                        "InvalidSchema",
                        format!("request body schema does not compile: {message}"),
                    )),
                }
            }
        }
        media_types.push((media_type.clone(), schema));
    }

    Some(RequestBodyMeta {
        content: media_types,
        json_schema,
    })
}

fn build_operation(
    doc: &Value,
    template: &PathTemplate,
    method: Method,
    operation: &Map<String, Value>,
    inherited: &[ParameterMeta],
    draft: Draft,
    issues: &mut Vec<ValidationIssue>,
) -> RouteMeta {
    let location = format!("{method} {template}");

    let own = build_parameter_list(doc, operation.get("parameters"), &location, issues);
    let parameters = merge_parameters(inherited, own);

    for placeholder in template.param_names() {
        let declared = parameters
            .iter()
            .any(|p| p.location == ParameterLocation::Path && p.name == placeholder);
        if !declared {
            issues.push(ValidationIssue::new(
                &location,
                "UnresolvedPathParameter",
                format!("path parameter '{placeholder}' is not declared"),
            ));
        }
    }

    let request_body = operation
        .get("requestBody")
        .and_then(|raw| build_request_body(doc, raw, &location, draft, issues));

    RouteMeta {
        method,
        path_pattern: template.as_str().to_string(),
        template: template.clone(),
        operation_id: operation
            .get("operationId")
            .and_then(Value::as_str)
            .map(str::to_string),
        parameters,
        request_body,
    }
}

/// Build the [`Specification`] from a parsed document, collecting structural issues.
///
/// Path items and operations keep document order; the returned value is only
/// meaningful when `issues` is empty afterwards.
pub fn build_specification(doc: &Value, issues: &mut Vec<ValidationIssue>) -> Specification {
    check_top_level(doc, issues);
    check_typed_model(doc, issues);
    let draft = schema_draft(openapi_version(doc));

    let text = |pointer: &str| {
        doc.pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let mut paths = Vec::new();
    if let Some(paths_map) = doc.get("paths").and_then(Value::as_object) {
        for (raw_template, item) in paths_map {
            let template = PathTemplate::parse(raw_template);
            check_template(&template, issues);

            let Some(item) = resolve_object(doc, item, raw_template, issues)
                .and_then(Value::as_object)
            else {
                continue;
            };

            let inherited =
                build_parameter_list(doc, item.get("parameters"), raw_template, issues);

            let mut operations = Vec::new();
            for (key, operation) in item {
                let lower = key.to_ascii_lowercase();
                if !METHODS.contains(&lower.as_str()) {
                    continue;
                }
                let Ok(method) = Method::from_bytes(lower.to_ascii_uppercase().as_bytes()) else {
                    continue;
                };
                let Some(operation) = operation.as_object() else {
                    issues.push(ValidationIssue::new(
                        format!("{} {raw_template}", lower.to_ascii_uppercase()),
                        "InvalidOperation",
                        "operation must be an object",
                    ));
                    continue;
                };
                let route = build_operation(
                    doc,
                    &template,
                    method,
                    operation,
                    &inherited,
                    draft,
                    issues,
                );
                debug!(
                    method = %route.method,
                    path = %route.path_pattern,
                    parameters = route.parameters.len(),
                    has_body = route.request_body.is_some(),
                    "Operation parsed"
                );
                operations.push(Arc::new(route));
            }

            paths.push(PathItem {
                template,
                operations,
            });
        }
    }

    Specification {
        openapi: text("/openapi"),
        title: text("/info/title"),
        version: text("/info/version"),
        paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(doc: Value) -> (Specification, Vec<ValidationIssue>) {
        let mut issues = Vec::new();
        let spec = build_specification(&doc, &mut issues);
        (spec, issues)
    }

    fn minimal(paths: Value) -> Value {
        json!({
            "openapi": "3.0.3",
            "info": { "title": "T", "version": "1" },
            "paths": paths
        })
    }

    #[test]
    fn test_strip_unknown_verbs() {
        let mut v = json!({
            "paths": {
                "/x": { "get": {}, "patch": {}, "unknown": {}, "x-keep": 1 }
            }
        });
        strip_unknown_verbs(&mut v);
        assert!(v["paths"]["/x"].get("unknown").is_none());
        assert!(v["paths"]["/x"].get("x-keep").is_some());
    }

    #[test]
    fn test_document_order_is_preserved() {
        let (spec, issues) = build(minimal(json!({
            "/zeta": { "get": { "responses": {} } },
            "/alpha": { "post": { "responses": {} }, "get": { "responses": {} } }
        })));
        assert!(issues.is_empty(), "{issues:?}");
        let order: Vec<_> = spec
            .operations()
            .map(|op| format!("{} {}", op.method, op.path_pattern))
            .collect();
        assert_eq!(order, vec!["GET /zeta", "POST /alpha", "GET /alpha"]);
    }

    #[test]
    fn test_path_level_parameters_are_inherited_and_overridden() {
        let (spec, issues) = build(minimal(json!({
            "/items/{id}": {
                "parameters": [
                    { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } },
                    { "name": "verbose", "in": "query", "schema": { "type": "boolean" } }
                ],
                "get": {
                    "parameters": [
                        { "name": "verbose", "in": "query", "required": true, "schema": { "type": "boolean" } }
                    ],
                    "responses": {}
                }
            }
        })));
        assert!(issues.is_empty(), "{issues:?}");
        let op = spec.operation("/items/{id}", &Method::GET).unwrap();
        assert_eq!(op.parameters.len(), 2);
        let verbose = op.query_parameters().next().unwrap();
        assert!(verbose.required);
    }

    #[test]
    fn test_parameter_refs_and_enums() {
        let mut doc = minimal(json!({
            "/pets": {
                "get": {
                    "parameters": [ { "$ref": "#/components/parameters/Status" } ],
                    "responses": {}
                }
            }
        }));
        doc["components"] = json!({
            "parameters": {
                "Status": {
                    "name": "status", "in": "query", "required": true,
                    "schema": { "type": "string", "enum": ["a", "b"] }
                }
            }
        });
        let (spec, issues) = build(doc);
        assert!(issues.is_empty(), "{issues:?}");
        let op = spec.operation("/pets", &Method::GET).unwrap();
        let status = &op.parameters[0];
        assert_eq!(status.name, "status");
        assert_eq!(status.allowed_values.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_request_body_schema_refs_are_expanded_and_compiled() {
        let mut doc = minimal(json!({
            "/pets": {
                "post": {
                    "requestBody": {
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } }
                        }
                    },
                    "responses": {}
                }
            }
        }));
        doc["components"] = json!({
            "schemas": {
                "Pet": { "type": "object", "required": ["name"], "properties": { "name": { "type": "string" } } }
            }
        });
        let (spec, issues) = build(doc);
        assert!(issues.is_empty(), "{issues:?}");
        let body = spec
            .operation("/pets", &Method::POST)
            .unwrap()
            .request_body
            .as_ref()
            .unwrap();
        assert!(body.declares_json());
        let schema = body.json_schema.as_ref().unwrap();
        assert_eq!(schema.raw()["required"], json!(["name"]));
        assert!(schema.validate(&json!({})).is_err());
    }

    #[test]
    fn test_recursive_schema_is_cut() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": { "child": { "$ref": "#/components/schemas/Node" } }
                    }
                }
            }
        });
        let mut schema = json!({ "$ref": "#/components/schemas/Node" });
        let mut issues = Vec::new();
        expand_schema_refs(&doc, &mut schema, "test", &mut issues);
        assert!(issues.is_empty());
        assert_eq!(schema["properties"]["child"], json!({}));
    }

    #[test]
    fn test_recursive_body_schema_compiles_under_openapi_30() {
        let mut doc = minimal(json!({
            "/nodes": {
                "post": {
                    "requestBody": {
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Node" } }
                        }
                    },
                    "responses": {}
                }
            }
        }));
        doc["components"] = json!({
            "schemas": {
                "Node": {
                    "type": "object",
                    "properties": { "child": { "$ref": "#/components/schemas/Node" } }
                }
            }
        });
        let (spec, issues) = build(doc);
        assert!(issues.is_empty(), "{issues:?}");
        let op = spec.operation("/nodes", &Method::POST).unwrap();
        let schema = op.request_body.as_ref().unwrap().json_schema.as_ref().unwrap();
        assert!(schema.validate(&json!({ "child": { "child": 1 } })).is_ok());
        assert!(schema.validate(&json!([])).is_err());
    }

    #[test]
    fn test_openapi_30_boolean_exclusive_bounds_are_accepted() {
        let (spec, issues) = build(minimal(json!({
            "/n": {
                "post": {
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "integer",
                                    "minimum": 0,
                                    "exclusiveMinimum": true,
                                    "maximum": 10,
                                    "exclusiveMaximum": false
                                }
                            }
                        }
                    },
                    "responses": {}
                }
            }
        })));
        assert!(issues.is_empty(), "{issues:?}");

        let op = spec.operation("/n", &Method::POST).unwrap();
        let schema = op.request_body.as_ref().unwrap().json_schema.as_ref().unwrap();
        assert!(schema.validate(&json!(0)).is_err());
        assert!(schema.validate(&json!(1)).is_ok());
        assert!(schema.validate(&json!(10)).is_ok());
        assert!(schema.validate(&json!(11)).is_err());
    }

    #[test]
    fn test_openapi_31_numeric_exclusive_bounds() {
        let mut doc = minimal(json!({
            "/n": {
                "post": {
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": { "type": "integer", "exclusiveMinimum": 0 }
                            }
                        }
                    },
                    "responses": {}
                }
            }
        }));
        doc["openapi"] = json!("3.1.0");
        let (spec, issues) = build(doc);
        assert!(issues.is_empty(), "{issues:?}");
        let op = spec.operation("/n", &Method::POST).unwrap();
        let schema = op.request_body.as_ref().unwrap().json_schema.as_ref().unwrap();
        assert!(schema.validate(&json!(0)).is_err());
        assert!(schema.validate(&json!(1)).is_ok());
    }

    #[test]
    fn test_numeric_exclusive_bounds_rewrite() {
        let mut schema = json!({
            "type": "object",
            "properties": {
                "a": { "minimum": 1, "exclusiveMinimum": true },
                "b": { "maximum": 5, "exclusiveMaximum": false },
                "c": { "items": [ { "maximum": 2, "exclusiveMaximum": true } ] }
            }
        });
        numeric_exclusive_bounds(&mut schema);
        assert_eq!(schema["properties"]["a"], json!({ "exclusiveMinimum": 1 }));
        assert_eq!(schema["properties"]["b"], json!({ "maximum": 5 }));
        assert_eq!(
            schema["properties"]["c"]["items"][0],
            json!({ "exclusiveMaximum": 2 })
        );
    }

    #[test]
    fn test_structural_issues_are_collected() {
        let (_, issues) = build(json!({
            "openapi": "2.0",
            "info": { "title": "T" },
            "paths": {
                "items/{id}": {
                    "get": {
                        "parameters": [
                            { "in": "query" },
                            { "name": "x", "in": "body" },
                            { "$ref": "#/components/parameters/Missing" }
                        ],
                        "responses": {}
                    }
                }
            }
        }));
        let kinds: Vec<_> = issues.iter().map(|i| i.kind.as_str()).collect();
        assert!(kinds.contains(&"UnsupportedVersion"));
        assert!(kinds.contains(&"MissingField"));
        assert!(kinds.contains(&"InvalidPathTemplate"));
        assert!(kinds.contains(&"InvalidParameter"));
        assert!(kinds.contains(&"UnresolvedReference"));
        assert!(kinds.contains(&"UnresolvedPathParameter"));
    }

    #[test]
    fn test_optional_path_parameter_is_rejected() {
        let (_, issues) = build(minimal(json!({
            "/items/{id}": {
                "get": {
                    "parameters": [ { "name": "id", "in": "path", "schema": { "type": "string" } } ],
                    "responses": {}
                }
            }
        })));
        assert!(
            issues.iter().any(|i| i.message.contains("must be required")),
            "{issues:?}"
        );
    }

    #[test]
    fn test_uncompilable_body_schema_is_an_issue() {
        let (_, issues) = build(minimal(json!({
            "/pets": {
                "post": {
                    "requestBody": {
                        "content": { "application/json": { "schema": { "type": 42 } } }
                    },
                    "responses": {}
                }
            }
        })));
        assert!(issues.iter().any(|i| i.kind == "InvalidSchema"), "{issues:?}");
    }
}
