use crate::auth::directory::PermissionClient;
use crate::auth::introspection::IntrospectionClient;
use crate::auth::scope::{ScopeMap, ScopeMapError};
use crate::auth::service_token::ServiceTokenVerifier;
use crate::auth::Disclosure;
use crate::config::GateConfig;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that prevent the gateway from starting
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Invalid directory URL: {0}")]
    DirectoryUrl(#[from] url::ParseError),
    #[error("Invalid scope map: {0}")]
    Scopes(#[from] ScopeMapError),
}

/// Everything handlers need, built once at startup and shared read-only
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub scopes: Arc<ScopeMap>,
    pub introspection: Arc<IntrospectionClient>,
    pub directory: Arc<PermissionClient>,
    pub service_tokens: Arc<ServiceTokenVerifier>,
    pub upstream_client: Arc<Client>,
}

impl AppState {
    fn create_http_client(timeout: u64) -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(2))
            // Configure connection pool
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
    }

    pub fn new(config: &GateConfig) -> Result<Self, StateError> {
        let introspection_client = Self::create_http_client(config.introspection.timeout)?;
        let directory_client = Self::create_http_client(config.directory.timeout)?;
        let upstream_client = Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout))
            .connect_timeout(Duration::from_secs(2))
            // the backend's redirects are relayed to the caller as they are
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            config: Arc::new(config.clone()),
            scopes: Arc::new(ScopeMap::from_config(&config.auth)?),
            introspection: Arc::new(IntrospectionClient::new(
                introspection_client,
                &config.introspection,
            )),
            directory: Arc::new(PermissionClient::new(
                directory_client,
                &config.directory.url,
            )?),
            service_tokens: Arc::new(ServiceTokenVerifier::new(&config.service_token)),
            upstream_client: Arc::new(upstream_client),
        })
    }

    pub fn disclosure(&self) -> Disclosure {
        Disclosure::from_flag(self.config.auth.disclose_backend_errors)
    }
}
