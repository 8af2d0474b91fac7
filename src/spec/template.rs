//! Path templates such as `/users/{id}/posts/{post_id}`.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Placeholder bindings produced by a successful match, in template order.
///
/// Names are `Arc<str>` shared with the template; values are per-request data.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// One `/`-delimited piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly
    Literal(String),
    /// `{name}`: matches any single request segment
    Param(Arc<str>),
}

/// A parsed OpenAPI path template.
///
/// Templates and request paths are split the same way (on every `/`, keeping
/// the leading empty segment), so `/items/{id}` has three segments and only
/// matches paths with exactly three segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template. Never fails: a segment is a placeholder only when it
    /// starts with `{` and ends with `}`, anything else is a literal.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .map(|segment| {
                if segment.len() >= 2 && segment.starts_with('{') && segment.ends_with('}') {
                    Segment::Param(Arc::from(&segment[1..segment.len() - 1]))
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_ref()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a concrete request path (without query string).
    ///
    /// Returns the placeholder bindings when the segment counts agree and every
    /// literal segment is equal; `None` otherwise.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let mut parts = path.split('/');
        let mut params = ParamVec::new();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param(name) => params.push((Arc::clone(name), part.to_string())),
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let t = PathTemplate::parse("/items/{id}");
        assert_eq!(
            t.segments(),
            &[
                Segment::Literal(String::new()),
                Segment::Literal("items".to_string()),
                Segment::Param(Arc::from("id")),
            ]
        );
        assert_eq!(t.param_names().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_partial_braces_are_literal() {
        let t = PathTemplate::parse("/files/{name}.json");
        assert_eq!(t.param_names().count(), 0);
        assert!(t.matches("/files/{name}.json").is_some());
        assert!(t.matches("/files/report.json").is_none());
    }

    #[test]
    fn test_root_template() {
        let t = PathTemplate::parse("/");
        assert!(t.matches("/").is_some());
        assert!(t.matches("/x").is_none());
    }

    #[test]
    fn test_trailing_slash_changes_segment_count() {
        let t = PathTemplate::parse("/items/{id}");
        assert!(t.matches("/items/42/").is_none());
    }
}
