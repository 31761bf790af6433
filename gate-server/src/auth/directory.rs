//! Client of the user directory that resolves a subject to its role,
//! organization and permission scopes.

use crate::auth::UpstreamError;
use http::header::AUTHORIZATION;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

/// Permissions of a user as returned by the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub user_id: String,
    pub organization_id: Option<String>,
    pub username: String,
    pub role: Option<String>,
    pub permissions: HashSet<String>,
}

impl Permission {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.permissions.contains(scope)
    }
}

#[derive(Debug, Deserialize)]
struct PermissionEnvelope {
    #[serde(default)]
    data: Option<PermissionPayload>,
}

#[derive(Debug, Deserialize)]
struct PermissionPayload {
    #[serde(default)]
    user_id: Option<Identifier>,
    #[serde(default)]
    organization_id: Option<Identifier>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    permissions: Option<Vec<String>>,
}

/// Identifiers arrive either as strings or as plain numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Identifier {
    Text(String),
    Number(i64),
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        match id {
            Identifier::Text(text) => text,
            Identifier::Number(number) => number.to_string(),
        }
    }
}

impl TryFrom<PermissionEnvelope> for Permission {
    type Error = UpstreamError;

    fn try_from(envelope: PermissionEnvelope) -> Result<Self, Self::Error> {
        let data = envelope.data.ok_or(UpstreamError::MissingField("data"))?;
        let permissions = data
            .permissions
            .ok_or(UpstreamError::MissingField("data.permissions"))?;
        let user_id = data
            .user_id
            .ok_or(UpstreamError::MissingField("data.user_id"))?;
        let username = data
            .username
            .ok_or(UpstreamError::MissingField("data.username"))?;

        Ok(Permission {
            user_id: user_id.into(),
            organization_id: data.organization_id.map(String::from),
            username,
            role: data.role,
            permissions: permissions.into_iter().collect(),
        })
    }
}

/// Permission directory client
#[derive(Clone)]
pub struct PermissionClient {
    client: Client,
    base_url: Url,
}

impl PermissionClient {
    pub fn new(client: Client, base_url: &str) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        Ok(Self { client, base_url })
    }

    /// URL of the permission record of `username`, kept as a single path segment
    fn permission_url(&self, username: &str) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "user", "permission", username]);
        Ok(url)
    }

    /// Fetches the permissions of `username`, forwarding the caller's
    /// `Authorization` header unchanged
    pub async fn fetch_permission(
        &self,
        username: &str,
        authorization: &str,
    ) -> Result<Permission, UpstreamError> {
        let url = self.permission_url(username)?;
        debug!("Fetching permissions from: {}", url);

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::InvalidStatus(response.status()));
        }

        let body = response.bytes().await?;
        let envelope: PermissionEnvelope = serde_json::from_slice(&body)?;
        let permission = Permission::try_from(envelope)?;
        debug!(
            "Fetched {} permission scopes for user '{}'",
            permission.permissions.len(),
            permission.username
        );
        Ok(permission)
    }
}
