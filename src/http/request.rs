//! Request handling helpers.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Normalize the request path before classification
//! - Extract the session token from the `Cookie` header
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The upstream receives the normalized path, so it serves exactly the
//!   page the policy classified
//! - Encoded separators are refused rather than guessed at

use axum::http::{
    header,
    uri::PathAndQuery,
    HeaderMap, HeaderValue, Request, Uri,
};
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a random UUID v4 for every request lacking an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Request paths the gate refuses to classify.
#[derive(Debug, Error)]
pub enum PathError {
    /// `%2F` or `%5C` inside a segment. Upstreams disagree on whether these
    /// split segments.
    #[error("path `{0}` contains an encoded separator")]
    EncodedSeparator(String),

    #[error("path `{path}` cannot be rebuilt into a URI: {source}")]
    Rebuild {
        path: String,
        #[source]
        source: axum::http::Error,
    },
}

/// Decode escaped unreserved characters, collapse repeated separators,
/// resolve dot segments and drop a trailing slash.
///
/// `/dashboard/`, `/%64ashboard` and `/users/%2e%2e/dashboard` must classify
/// the same way as `/dashboard`, otherwise they would fall through to the
/// default group.
pub fn normalize_path(path: &str) -> Result<String, PathError> {
    let decoded = decode_unreserved(path)?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Ok("/".to_string());
    }

    let mut normalized = String::with_capacity(decoded.len());
    for segment in segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    Ok(normalized)
}

/// Replace `%XX` escapes of unreserved characters (RFC 3986 section 2.3)
/// with the character itself. Other escapes are kept with upper-case hex.
fn decode_unreserved(path: &str) -> Result<String, PathError> {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;

    while i < bytes.len() {
        let escaped = match (bytes[i], bytes.get(i + 1), bytes.get(i + 2)) {
            (b'%', Some(&hi), Some(&lo)) => hex_pair(hi, lo),
            _ => None,
        };

        match escaped {
            Some(b'/') | Some(b'\\') => {
                return Err(PathError::EncodedSeparator(path.to_string()));
            }
            Some(byte) if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') => {
                out.push(byte as char);
                i += 3;
            }
            Some(byte) => {
                out.push_str(&format!("%{:02X}", byte));
                i += 3;
            }
            None => {
                // Request paths are ASCII; anything else is copied through.
                let ch = path[i..].chars().next().unwrap_or('\u{FFFD}');
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    Ok(out)
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Replace the path of `uri`, keeping its query.
pub fn with_path(uri: &Uri, path: &str) -> Result<Uri, PathError> {
    let rebuilt = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let rebuild_error = |source: axum::http::Error| PathError::Rebuild {
        path: path.to_string(),
        source,
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(rebuilt).map_err(|e| rebuild_error(e.into()))?);
    Uri::from_parts(parts).map_err(|e| rebuild_error(e.into()))
}

/// Find the value of cookie `name` across all `Cookie` headers.
///
/// Returns `None` when the cookie is absent; an empty value is returned as
/// `Some("")` and left to the trust resolver.
pub fn session_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}
