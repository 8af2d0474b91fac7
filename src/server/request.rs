use axum::body::Bytes;
use http::{HeaderMap, Method, Uri};
use std::collections::HashMap;

/// An inbound request as seen by the gateway pipeline.
///
/// Scoped to one dispatch: built from the transport request, validated and
/// then handed to the forwarder.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    /// Raw (undecoded) path without the query string
    pub path: String,
    /// Raw query string as received, without the leading `?`
    pub raw_query: Option<String>,
    /// Decoded query parameters; a repeated key keeps its last value
    pub query_params: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IncomingRequest {
    #[must_use]
    pub fn new(
        method: Method,
        path: String,
        raw_query: Option<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        let query_params = raw_query
            .as_deref()
            .map(parse_query_params)
            .unwrap_or_default();
        Self {
            method,
            path,
            raw_query,
            query_params,
            headers,
            body,
        }
    }

    /// Build from the parts axum hands to a handler.
    #[must_use]
    pub fn from_parts(method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self::new(
            method,
            uri.path().to_string(),
            uri.query().map(str::to_string),
            headers,
            body,
        )
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }
}

/// Parse a query string into a map.
///
/// Names and values are URL-decoded; when a key repeats, the last value wins.
///
/// # Arguments
///
/// * `query` - The raw query string without `?` (e.g., `limit=10&offset=20`)
#[must_use]
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params_decodes() {
        let params = parse_query_params("name=a%20b&tag=x+y");
        assert_eq!(params.get("name").map(String::as_str), Some("a b"));
        assert_eq!(params.get("tag").map(String::as_str), Some("x y"));
    }

    #[test]
    fn test_repeated_key_last_value_wins() {
        let params = parse_query_params("limit=1&limit=2");
        assert_eq!(params.get("limit").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_from_parts_splits_path_and_query() {
        let uri: Uri = "/pets/1?status=sold".parse().unwrap();
        let req = IncomingRequest::from_parts(Method::GET, &uri, HeaderMap::new(), Bytes::new());
        assert_eq!(req.path, "/pets/1");
        assert_eq!(req.raw_query.as_deref(), Some("status=sold"));
        assert_eq!(req.query_param("status"), Some("sold"));
    }

    #[test]
    fn test_no_query() {
        let uri: Uri = "/pets".parse().unwrap();
        let req = IncomingRequest::from_parts(Method::GET, &uri, HeaderMap::new(), Bytes::new());
        assert!(req.raw_query.is_none());
        assert!(req.query_params.is_empty());
    }
}
