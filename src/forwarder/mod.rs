//! Upstream forwarding.
//!
//! [`Forwarder`] relays a validated request to the single upstream service and
//! returns whatever the upstream answers, including 4xx/5xx statuses. Only
//! transport failures become errors, classified into the gateway taxonomy.

use crate::error::ErrorKind;
use crate::server::IncomingRequest;
use axum::body::Bytes;
use http::header::{ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, StatusCode};
use reqwest::{redirect, Client};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Upstream call timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirect hops followed before the call fails.
pub const MAX_REDIRECTS: usize = 10;

/// Inbound headers that are not copied to the upstream request.
///
/// `host` must name the upstream; the framing headers are recomputed by the
/// client from the forwarded body. `accept-encoding` is negotiated by the
/// client so relayed bodies always arrive decoded.
const SKIPPED_REQUEST_HEADERS: [HeaderName; 5] =
    [HOST, CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION, ACCEPT_ENCODING];

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Upstream base URL, e.g. `https://example.com/api`
    pub base_url: String,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl ForwarderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            max_redirects: MAX_REDIRECTS,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Response received from the upstream, not yet sanitized.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A transport failure while talking to the upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection refused/failed, or the call did not complete in time
    #[error("upstream unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream call to {url} failed: {source}")]
    Upstream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ForwardError {
    fn classify(url: String, source: reqwest::Error) -> Self {
        if source.is_connect() || source.is_timeout() {
            ForwardError::Unreachable { url, source }
        } else {
            ForwardError::Upstream { url, source }
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForwardError::Unreachable { .. } => ErrorKind::UpstreamUnreachable,
            ForwardError::Upstream { .. } => ErrorKind::UpstreamError,
        }
    }

    /// Fixed detail returned to clients; transport details are only logged.
    #[must_use]
    pub fn client_detail(&self) -> &'static str {
        match self {
            ForwardError::Unreachable { .. } => "Gateway Timeout",
            ForwardError::Upstream { .. } => "Bad Gateway",
        }
    }
}

/// `base_url + path [+ "?" + raw query]`, with one trailing `/` of the base removed.
#[must_use]
pub fn build_upstream_url(base_url: &str, path: &str, raw_query: Option<&str>) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    match raw_query {
        Some(query) if !query.is_empty() => format!("{base}{path}?{query}"),
        _ => format!("{base}{path}"),
    }
}

/// Relays requests to one upstream over a shared, pooled client.
#[derive(Debug, Clone)]
pub struct Forwarder {
    base_url: String,
    client: Client,
}

impl Forwarder {
    /// Build the forwarder and its HTTP client.
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend or client cannot be initialized.
    pub fn new(config: &ForwarderConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward `request` upstream with its method, headers (minus `host` and
    /// framing headers) and raw body.
    ///
    /// # Errors
    ///
    /// [`ForwardError::Unreachable`] on connect failure or timeout,
    /// [`ForwardError::Upstream`] on any other transport failure.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn forward(
        &self,
        request: &IncomingRequest,
    ) -> Result<UpstreamResponse, ForwardError> {
        let url = build_upstream_url(&self.base_url, &request.path, request.raw_query.as_deref());
        debug!(url = %url, "Forwarding to upstream");

        let mut headers = request.headers.clone();
        for name in &SKIPPED_REQUEST_HEADERS {
            headers.remove(name);
        }

        let start = Instant::now();
        let result = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => return Err(log_failure(ForwardError::classify(url, e), start)),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Err(log_failure(ForwardError::classify(url, e), start)),
        };

        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            url = %url,
            final_url = %final_url,
            status = status.as_u16(),
            body_bytes = body.len(),
            latency_ms,
            "Upstream responded"
        );

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

fn log_failure(err: ForwardError, start: Instant) -> ForwardError {
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &err {
        ForwardError::Unreachable { .. } => {
            warn!(error = %err, kind = %err.kind(), latency_ms, "Upstream unreachable");
        }
        ForwardError::Upstream { .. } => {
            error!(error = %err, kind = %err.kind(), latency_ms, "Error forwarding request");
        }
    }
    err
}
