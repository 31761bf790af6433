pub(crate) use crate::config::auth::{AuthConfig, ServiceTokenConfig};
pub(crate) use crate::config::backends::{DirectoryConfig, IntrospectionConfig, UpstreamConfig};
pub(crate) use crate::config::cors::CorsConfig;
use confique::Config;
use std::path::Path;

pub mod auth;
pub mod backends;
pub mod cors;

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_FILE_ENV: &str = "GATE_CONFIG_FILE";

/// Main configuration structure for the gateway
#[derive(Debug, Config, Clone)]
pub struct GateConfig {
    /// The port the gateway will listen to (default: 7780)
    #[config(env = "GATE_PORT", default = 7780)]
    pub port: u16,

    /// Token introspection endpoint configuration
    #[config(nested)]
    pub introspection: IntrospectionConfig,

    /// User permission directory configuration
    #[config(nested)]
    pub directory: DirectoryConfig,

    /// Signed service token configuration
    #[config(nested)]
    pub service_token: ServiceTokenConfig,

    /// Backend the authorized requests are forwarded to
    #[config(nested)]
    pub upstream: UpstreamConfig,

    /// Scope map and rejection behaviour
    #[config(nested)]
    pub auth: AuthConfig,

    /// Cross-origin policy for browser clients
    #[config(nested)]
    pub cors: CorsConfig,
}

impl GateConfig {
    /// Loads the configuration from the environment, layered over the file
    /// named by `GATE_CONFIG_FILE` when it is set.
    pub fn load() -> Result<Self, confique::Error> {
        let file = std::env::var_os(CONFIG_FILE_ENV);
        Self::load_from(file.as_deref().map(Path::new))
    }

    /// Loads the configuration from the environment and an optional file.
    /// Environment variables take precedence over file values.
    pub fn load_from(file: Option<&Path>) -> Result<Self, confique::Error> {
        let mut builder = Self::builder().env();
        if let Some(file) = file {
            builder = builder.file(file);
        }
        builder.load()
    }

    #[cfg(test)]
    pub fn for_test_with_mocks(
        introspection_mock: &wiremock::MockServer,
        directory_mock: &wiremock::MockServer,
        upstream_mock: &wiremock::MockServer,
    ) -> Self {
        Self {
            port: 0, // Let the OS choose a port
            introspection: IntrospectionConfig {
                url: introspection_mock.uri(),
                timeout: 1,
            },
            directory: DirectoryConfig {
                url: directory_mock.uri(),
                timeout: 1,
            },
            service_token: ServiceTokenConfig {
                secret: Some("test_service_secret".to_string()),
                issuer: None,
                audience: None,
                leeway: 0,
            },
            upstream: UpstreamConfig {
                url: upstream_mock.uri(),
                timeout: 5,
                max_body_bytes: 1024 * 1024,
            },
            auth: AuthConfig {
                scopes: None,
                disclose_backend_errors: false,
            },
            cors: CorsConfig {
                enabled: true,
                allowed_origins: None,
            },
        }
    }
}
