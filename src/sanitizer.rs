//! Upstream response header filtering.
//!
//! The gateway re-frames every relayed body itself, so headers describing the
//! upstream's framing or encoding must not be passed through.

use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, SERVER, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName};

/// Headers never relayed from the upstream.
pub const STRIPPED_HEADERS: [HeaderName; 4] =
    [SERVER, TRANSFER_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH];

/// Return the headers to relay to the client.
///
/// Removes [`STRIPPED_HEADERS`] (all values of each) and keeps everything else,
/// including repeated headers such as `set-cookie`. The upstream's
/// `content-type`, if any, is always carried over.
#[must_use]
pub fn sanitize_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in &STRIPPED_HEADERS {
        headers.remove(name);
    }
    if let Some(content_type) = upstream.get(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, content_type.clone());
    }
    headers
}
