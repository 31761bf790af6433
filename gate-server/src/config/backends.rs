//! Configuration of the HTTP backends the gateway talks to

use confique::Config;

/// Configuration for the OAuth 2.0 token introspection server
#[derive(Debug, Config, Clone)]
pub struct IntrospectionConfig {
    /// Base URL of the authorization server admin API (default: http://localhost:4445)
    #[config(env = "GATE_INTROSPECTION_URL", default = "http://localhost:4445")]
    pub url: String,

    /// The timeout for introspection calls in seconds (default: 5)
    #[config(env = "GATE_INTROSPECTION_TIMEOUT", default = 5)]
    pub timeout: u64,
}

impl IntrospectionConfig {
    pub fn endpoint(&self) -> String {
        format!("{}/admin/oauth2/introspect", self.url.trim_end_matches('/'))
    }
}

/// Configuration for the user permission directory service
#[derive(Debug, Config, Clone)]
pub struct DirectoryConfig {
    /// Base URL of the auth service exposing user permissions (default: http://localhost:4000)
    #[config(env = "GATE_DIRECTORY_URL", default = "http://localhost:4000")]
    pub url: String,

    /// The timeout for permission lookups in seconds (default: 5)
    #[config(env = "GATE_DIRECTORY_TIMEOUT", default = 5)]
    pub timeout: u64,
}

/// Configuration for the backend that receives authorized requests
#[derive(Debug, Config, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the organization backend (default: http://localhost:3000)
    #[config(env = "GATE_UPSTREAM_URL", default = "http://localhost:3000")]
    pub url: String,

    /// The timeout for forwarded requests in seconds (default: 30)
    #[config(env = "GATE_UPSTREAM_TIMEOUT", default = 30)]
    pub timeout: u64,

    /// Largest request body relayed to the backend (default: 10 MiB)
    #[config(env = "GATE_UPSTREAM_MAX_BODY_BYTES", default = 10485760)]
    pub max_body_bytes: usize,
}

impl UpstreamConfig {
    /// Returns the backend URL for the given path and query
    pub fn get_url<S: AsRef<str>>(&self, path: S) -> String {
        let base = self.url.trim_end_matches('/');
        let path = path.as_ref();
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}
