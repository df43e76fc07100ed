//! Per-route credential enforcement.
//!
//! Callers identify themselves with two headers, `X-Caller-Id` and
//! `X-Caller-Secret`. Public routes skip the check entirely.

use axum::http::{HeaderMap, StatusCode};

use crate::routing::RouteDefinition;
use crate::security::credentials::{CallerIdentity, CredentialRegistry, Denied};

pub const X_CALLER_ID: &str = "x-caller-id";
pub const X_CALLER_SECRET: &str = "x-caller-secret";

/// Credentials as presented on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct PresentedCredentials<'a> {
    pub caller_id: &'a str,
    pub secret: &'a str,
}

impl std::fmt::Debug for PresentedCredentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentedCredentials")
            .field("caller_id", &self.caller_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Both headers present, non-empty and valid visible ASCII, or `None`.
pub fn extract_credentials(headers: &HeaderMap) -> Option<PresentedCredentials<'_>> {
    let caller_id = header_str(headers, X_CALLER_ID)?;
    let secret = header_str(headers, X_CALLER_SECRET)?;
    Some(PresentedCredentials { caller_id, secret })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Decide whether the request may reach `route`'s handler.
pub fn authorize_request(
    registry: &CredentialRegistry,
    route: &RouteDefinition,
    headers: &HeaderMap,
) -> Result<CallerIdentity, Denied> {
    if route.public {
        return Ok(CallerIdentity::Anonymous);
    }
    let presented = extract_credentials(headers).ok_or(Denied::MissingCredentials)?;
    registry.authorize(
        presented.caller_id,
        presented.secret,
        &route.required_capabilities,
    )
}

/// `401` for anything that fails to establish who the caller is, `403` when
/// the caller is known but lacks a capability.
pub fn denial_status(denied: Denied) -> StatusCode {
    if denied.is_authentication_failure() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::FORBIDDEN
    }
}
