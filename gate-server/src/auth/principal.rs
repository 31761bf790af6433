//! Authenticated identities attached to requests

use crate::auth::directory::Permission;
use crate::auth::AuthError;
use axum::extract::FromRequestParts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::request::Parts;
use http::{HeaderMap, HeaderName, HeaderValue};
use log::warn;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

pub const PRINCIPAL_HEADER: &str = "x-principal";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";
pub const USERNAME_HEADER: &str = "x-username";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_PERMISSIONS_HEADER: &str = "x-user-permissions";

/// User authenticated through token introspection and the permission directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPrincipal {
    pub id: String,
    pub organization_id: Option<String>,
    pub username: String,
    pub role: Option<String>,
    #[serde(serialize_with = "serialize_sorted")]
    pub permissions: HashSet<String>,
}

impl From<Permission> for UserPrincipal {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.user_id,
            organization_id: permission.organization_id,
            username: permission.username,
            role: permission.role,
            permissions: permission.permissions,
        }
    }
}

impl UserPrincipal {
    /// Permissions in a stable order
    pub fn sorted_permissions(&self) -> Vec<&str> {
        let sorted: BTreeSet<&str> = self.permissions.iter().map(String::as_str).collect();
        sorted.into_iter().collect()
    }
}

fn serialize_sorted<S: Serializer>(
    set: &HashSet<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    set.iter().collect::<BTreeSet<_>>().serialize(serializer)
}

/// Internal service or automation caller authenticated by a signed token.
/// Carries the token claims as they were signed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ServicePrincipal {
    pub claims: Map<String, Value>,
}

impl ServicePrincipal {
    pub fn organization_id(&self) -> Option<String> {
        match self.claims.get("organization_id")? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    pub fn organization_name(&self) -> Option<&str> {
        self.claims.get("organization_name")?.as_str()
    }
}

/// Identity attached to a request once authentication succeeded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "principal", rename_all = "snake_case")]
pub enum Principal {
    User(UserPrincipal),
    Service(ServicePrincipal),
}

impl Principal {
    /// Replaces any principal headers in `headers` with the ones describing
    /// this principal.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        strip_principal_headers(headers);

        match serde_json::to_vec(self) {
            Ok(json) => {
                let encoded = URL_SAFE_NO_PAD.encode(json);
                if let Ok(value) = HeaderValue::from_str(&encoded) {
                    headers.insert(PRINCIPAL_HEADER, value);
                }
            }
            Err(e) => warn!("Failed to serialize principal: {}", e),
        }

        match self {
            Principal::User(user) => {
                insert_header(headers, USER_ID_HEADER, &user.id);
                if let Some(organization_id) = &user.organization_id {
                    insert_header(headers, ORGANIZATION_ID_HEADER, organization_id);
                }
                insert_header(headers, USERNAME_HEADER, &user.username);
                if let Some(role) = &user.role {
                    insert_header(headers, USER_ROLE_HEADER, role);
                }
                insert_header(
                    headers,
                    USER_PERMISSIONS_HEADER,
                    &user.sorted_permissions().join(","),
                );
            }
            Principal::Service(service) => {
                if let Some(organization_id) = service.organization_id() {
                    insert_header(headers, ORGANIZATION_ID_HEADER, &organization_id);
                }
            }
        }
    }
}

/// Whether `name` is a header the gateway derives from the principal
pub fn is_principal_header(name: &HeaderName) -> bool {
    let name = name.as_str();
    name == PRINCIPAL_HEADER || name == ORGANIZATION_ID_HEADER || name.starts_with("x-user")
}

/// Removes principal headers, so clients cannot forge them
pub fn strip_principal_headers(headers: &mut HeaderMap) {
    let forged: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_principal_header(name))
        .cloned()
        .collect();
    for name in forged {
        headers.remove(name);
    }
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!("Skipping header {}: value is not a valid header value", name),
    }
}

/// Extractors for handlers running inside the gateway behind one of the
/// authentication middlewares. The forwarder reads the extension directly;
/// these are for in-process routes that need the caller's identity.
/// Outside the middlewares they reject as if no token was sent.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

impl<S> FromRequestParts<S> for UserPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Principal>() {
            Some(Principal::User(user)) => Ok(user.clone()),
            _ => Err(AuthError::MissingToken),
        }
    }
}
