use crate::auth::AuthError;
use http::header::AUTHORIZATION;
use http::HeaderMap;

const BEARER_PREFIX: &str = "Bearer ";

/// Bearer credentials taken from the `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    authorization: String,
    token: String,
}

impl BearerToken {
    /// The token without the "Bearer " prefix
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The header value exactly as the client sent it
    pub fn authorization(&self) -> &str {
        &self.authorization
    }
}

/// Extracts the bearer token from request headers.
///
/// A missing header is `MissingToken`; anything that is not
/// `Bearer <token>` is `MalformedToken`.
pub fn extract_bearer(headers: &HeaderMap) -> Result<BearerToken, AuthError> {
    let header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let authorization = header.to_str().map_err(|_| AuthError::MalformedToken)?;

    let token = authorization
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty() && !token.contains(char::is_whitespace))
        .ok_or(AuthError::MalformedToken)?;

    Ok(BearerToken {
        token: token.to_string(),
        authorization: authorization.to_string(),
    })
}
