//! Request authentication: bearer extraction, token introspection,
//! permission lookup, scope checks and service tokens.

use crate::auth::service_token::ServiceTokenError;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::header::{CACHE_CONTROL, PRAGMA, WWW_AUTHENTICATE};
use http::{HeaderValue, StatusCode};
use serde_json::json;
use std::fmt;
use thiserror::Error;

pub mod bearer;
pub mod directory;
pub mod introspection;
pub mod principal;
pub mod scope;
pub mod service_token;

const PERMISSION_DENIED: &str = "Permission Denied";
const TOKEN_MISSING: &str = "Authentication token missing";
const BACKEND_UNAVAILABLE: &str = "Authorization service unavailable";
const INVALID_SERVICE_TOKEN: &str = "Invalid Token";

/// Errors that can occur when calling the introspection or permission services
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Failed to send request: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Request failed with status: {0}")]
    InvalidStatus(StatusCode),
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Response is missing field `{0}`")]
    MissingField(&'static str),
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Why a request was turned away, as reported in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingToken,
    InvalidToken,
    BackendUnavailable,
    ScopeDenied,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingToken => "missing_token",
            RejectReason::InvalidToken => "invalid_token",
            RejectReason::BackendUnavailable => "backend_unavailable",
            RejectReason::ScopeDenied => "scope_denied",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication and authorization failures. Every one of them ends the request.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingToken,
    #[error("Authorization header is not a bearer token")]
    MalformedToken,
    #[error("Token introspection failed: {0}")]
    AuthBackendUnavailable(#[source] UpstreamError),
    #[error("Token is not active")]
    TokenInactive,
    #[error("Permission lookup failed: {0}")]
    PermissionLookupFailed(#[source] UpstreamError),
    #[error("Scope required by route prefix `{prefix}` was not granted")]
    ScopeDenied { prefix: String },
    #[error("Service token rejected: {0}")]
    InvalidServiceToken(#[source] ServiceTokenError),
}

impl AuthError {
    pub fn reason(&self) -> RejectReason {
        match self {
            AuthError::MissingToken => RejectReason::MissingToken,
            AuthError::MalformedToken
            | AuthError::TokenInactive
            | AuthError::InvalidServiceToken(_) => RejectReason::InvalidToken,
            AuthError::AuthBackendUnavailable(_) | AuthError::PermissionLookupFailed(_) => {
                RejectReason::BackendUnavailable
            }
            AuthError::ScopeDenied { .. } => RejectReason::ScopeDenied,
        }
    }

    /// Status code and client-facing message of this error
    pub fn status_and_message(&self, disclosure: Disclosure) -> (StatusCode, &'static str) {
        match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, TOKEN_MISSING),
            AuthError::InvalidServiceToken(_) => (StatusCode::UNAUTHORIZED, INVALID_SERVICE_TOKEN),
            AuthError::AuthBackendUnavailable(_) | AuthError::PermissionLookupFailed(_)
                if disclosure == Disclosure::Transparent =>
            {
                (StatusCode::SERVICE_UNAVAILABLE, BACKEND_UNAVAILABLE)
            }
            _ => (StatusCode::UNAUTHORIZED, PERMISSION_DENIED),
        }
    }

    /// Rejection for user routes
    pub fn into_rejection(self, disclosure: Disclosure) -> AuthRejection {
        AuthRejection {
            error: self,
            disclosure,
            service: false,
        }
    }

    /// Rejection for service routes, which also report `"org": null`
    pub fn into_service_rejection(self) -> AuthRejection {
        AuthRejection {
            error: self,
            disclosure: Disclosure::Opaque,
            service: true,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.into_rejection(Disclosure::Opaque).into_response()
    }
}

/// Whether backend failures are told apart from denials in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disclosure {
    /// Backend failures answer 401 "Permission Denied" like any denial
    #[default]
    Opaque,
    /// Backend failures answer 503
    Transparent,
}

impl Disclosure {
    pub fn from_flag(disclose_backend_errors: bool) -> Self {
        if disclose_backend_errors {
            Disclosure::Transparent
        } else {
            Disclosure::Opaque
        }
    }
}

/// Response sent back for a failed authentication
#[derive(Debug)]
pub struct AuthRejection {
    error: AuthError,
    disclosure: Disclosure,
    service: bool,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = self.error.status_and_message(self.disclosure);
        let body = if self.service {
            json!({ "message": message, "org": null })
        } else {
            json!({ "message": message })
        };

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        if status == StatusCode::UNAUTHORIZED {
            headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
