//! Authorization behaviour configuration

use confique::Config;

/// Scope map overrides and rejection behaviour
#[derive(Debug, Config, Clone)]
pub struct AuthConfig {
    /// Extra route prefix to scope pairs, e.g. "/campaign=campaign,/pipeline=pipeline".
    /// Entries override the built-in map for the same prefix.
    #[config(env = "GATE_AUTH_SCOPES")]
    pub scopes: Option<String>,

    /// Answer backend failures with 503 instead of the generic 401 (default: false)
    #[config(env = "GATE_AUTH_DISCLOSE_BACKEND_ERRORS", default = false)]
    pub disclose_backend_errors: bool,
}

/// Configuration for locally verified service tokens (EMR and automation callers)
#[derive(Debug, Config, Clone)]
pub struct ServiceTokenConfig {
    /// HMAC secret service tokens are signed with. Service routes reject
    /// every token while it is unset.
    #[config(env = "GATE_SERVICE_TOKEN_SECRET")]
    pub secret: Option<String>,

    /// Required `iss` claim, if any
    #[config(env = "GATE_SERVICE_TOKEN_ISSUER")]
    pub issuer: Option<String>,

    /// Required `aud` claim, if any
    #[config(env = "GATE_SERVICE_TOKEN_AUDIENCE")]
    pub audience: Option<String>,

    /// Clock skew tolerated on `exp`/`nbf` in seconds (default: 0)
    #[config(env = "GATE_SERVICE_TOKEN_LEEWAY", default = 0)]
    pub leeway: u64,
}
