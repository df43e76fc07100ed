//! Error responses produced by the router itself.
//!
//! Handler responses pass through untouched. Everything the router answers
//! on its own (404, 405, 401, 403, 500, 504) uses one JSON shape:
//!
//! ```json
//! {"error": "forbidden", "code": 403, "details": "insufficient capability"}
//! ```
//!
//! `details` is only filled in debug mode.

use std::any::Any;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::schema::Mode;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: StatusCode) -> Self {
        Self {
            error: error.into(),
            code: code.as_u16(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// JSON error with the canonical reason phrase as `error`.
pub fn error_response(status: StatusCode, details: Option<String>, mode: Mode) -> Response {
    let phrase = status
        .canonical_reason()
        .unwrap_or("error")
        .to_ascii_lowercase();
    let mut body = ErrorBody::new(phrase, status);
    if mode == Mode::Debug {
        if let Some(details) = details {
            body = body.with_details(details);
        }
    }
    (status, Json(body)).into_response()
}

/// `405` with an `Allow` header listing the methods the path does accept.
pub fn method_not_allowed(allowed: &[Method], mode: Mode) -> Response {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let mut response = error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        Some(format!("allowed: {allow}")),
        mode,
    );
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

/// Response for a handler that panicked. Installed on `CatchPanicLayer`,
/// which has no access to the snapshot, so details are never included.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %message, "Handler panicked");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, None, Mode::Release)
}
