//! Response construction for gate decisions.
//!
//! # Responsibilities
//! - Turn redirect decisions into `307 Temporary Redirect` responses
//! - Refuse paths that cannot be classified unambiguously
//! - Map upstream failures to gateway status codes
//!
//! # Design Decisions
//! - Redirect targets are configuration constants, never request-derived
//! - Redirects carry `Cache-Control: no-store` so a stale bounce is never
//!   replayed after the session changes

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};

use crate::config::schema::RedirectConfig;
use crate::policy::Decision;

/// Build the terminating response for a decision, or `None` for `Allow`.
pub fn decision_response(decision: Decision, redirects: &RedirectConfig) -> Option<Response> {
    match decision {
        Decision::Allow => None,
        Decision::RedirectToLogin => Some(redirect(&redirects.login)),
        Decision::RedirectToDefault => Some(redirect(&redirects.default)),
    }
}

/// Temporary redirect to `target`.
pub fn redirect(target: &str) -> Response {
    let mut response = Redirect::temporary(target).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Response sent for a request path the gate will not classify.
pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "Malformed request path").into_response()
}

/// Response sent when the upstream application cannot be reached.
pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}
