//! OAuth 2.0 token introspection client (RFC 7662)

use crate::auth::UpstreamError;
use crate::config::IntrospectionConfig;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

/// Verdict of the authorization server about a token
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IntrospectionResult {
    pub active: bool,
    /// Subject of the token, the username known to the permission directory
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl IntrospectionResult {
    /// Subject of an active token. Active tokens without a subject are a
    /// broken response from the authorization server.
    pub fn subject(&self) -> Result<&str, UpstreamError> {
        self.sub
            .as_deref()
            .filter(|sub| !sub.is_empty())
            .ok_or(UpstreamError::MissingField("sub"))
    }
}

/// Client of the authorization server's introspection endpoint
#[derive(Clone)]
pub struct IntrospectionClient {
    client: Client,
    endpoint: String,
}

impl IntrospectionClient {
    pub fn new(client: Client, config: &IntrospectionConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint(),
        }
    }

    /// Asks the authorization server whether the token is active
    pub async fn introspect(&self, token: &str) -> Result<IntrospectionResult, UpstreamError> {
        debug!("Introspecting token at: {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("token", token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::InvalidStatus(response.status()));
        }

        let body = response.bytes().await?;
        let result: IntrospectionResult = serde_json::from_slice(&body)?;
        debug!(
            "Introspection result: active={}, client_id={:?}, scope={:?}, exp={:?}",
            result.active, result.client_id, result.scope, result.exp
        );
        Ok(result)
    }
}
