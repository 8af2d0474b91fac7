use super::build::build_specification;
use super::types::Specification;
use crate::validator::{format_issues, ValidationIssue};
use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Serialization of a specification document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    /// `.yaml` / `.yml` select YAML; everything else is read as JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                SpecFormat::Yaml
            }
            _ => SpecFormat::Json,
        }
    }
}

/// Why the specification could not be loaded. Always fatal at startup.
#[derive(Debug, Error)]
pub enum SpecLoadError {
    #[error("cannot read specification {file}: {source}", file = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse specification {file}: {message}", file = .path.display())]
    Parse { path: PathBuf, message: String },

    #[error(
        "specification {file} is invalid ({count} issue(s)):\n{details}",
        file = .path.display(),
        count = .issues.len(),
        details = format_issues(.issues)
    )]
    Invalid {
        path: PathBuf,
        issues: Vec<ValidationIssue>,
    },
}

impl SpecLoadError {
    /// Structural issues, empty for I/O and parse failures.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            SpecLoadError::Invalid { issues, .. } => issues,
            SpecLoadError::Io { .. } | SpecLoadError::Parse { .. } => &[],
        }
    }
}

/// Load, parse and structurally validate a specification file.
///
/// # Errors
///
/// Returns [`SpecLoadError`] for a missing/unreadable file, content that does
/// not parse, or a document with structural issues (all of them reported).
pub fn load_spec(path: impl AsRef<Path>) -> Result<Arc<Specification>, SpecLoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| {
        error!(path = %path.display(), error = %source, "Failed to read specification");
        SpecLoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let spec = parse_spec(&content, SpecFormat::from_path(path), path)?;
    info!(
        path = %path.display(),
        title = %spec.title,
        version = %spec.version,
        openapi = %spec.openapi,
        paths = spec.paths.len(),
        operations = spec.operation_count(),
        "Specification loaded"
    );
    Ok(spec)
}

/// Parse and validate specification text; `origin` is only used in errors.
///
/// # Errors
///
/// [`SpecLoadError::Parse`] or [`SpecLoadError::Invalid`].
pub fn parse_spec(
    content: &str,
    format: SpecFormat,
    origin: &Path,
) -> Result<Arc<Specification>, SpecLoadError> {
    let parse_error = |message: String| SpecLoadError::Parse {
        path: origin.to_path_buf(),
        message,
    };

    let document = match format {
        SpecFormat::Json => serde_json::from_str::<Value>(content)
            .map_err(|e| parse_error(e.to_string()))?,
        SpecFormat::Yaml => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
            yaml_to_json(yaml).map_err(parse_error)?
        }
    };

    if !document.is_object() {
        return Err(parse_error("top-level value is not an object".to_string()));
    }

    let mut issues = Vec::new();
    let spec = build_specification(&document, &mut issues);
    if !issues.is_empty() {
        return Err(SpecLoadError::Invalid {
            path: origin.to_path_buf(),
            issues,
        });
    }
    Ok(Arc::new(spec))
}

/// Convert a YAML tree to JSON, keeping mapping order.
///
/// Scalar mapping keys (e.g. the unquoted `200:` of a responses object) are
/// rendered as strings.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Value::Number(
                    Number::from_f64(f).ok_or_else(|| format!("unsupported number {n}"))?,
                )
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    Yaml::Null => "null".to_string(),
                    other => return Err(format!("unsupported mapping key {other:?}")),
                };
                object.insert(key, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}
