//! Cross-origin settings for browser clients of the admin API

use confique::Config;

#[derive(Debug, Config, Clone)]
pub struct CorsConfig {
    /// Answer preflight requests and add CORS headers (default: true)
    #[config(env = "GATE_CORS_ENABLED", default = true)]
    pub enabled: bool,

    /// Comma-separated origins allowed to call the gateway, e.g.
    /// "https://admin.example.com,https://app.example.com". Any origin when unset.
    #[config(env = "GATE_CORS_ALLOWED_ORIGINS")]
    pub allowed_origins: Option<String>,
}

impl CorsConfig {
    /// Configured origins, or `None` when every origin is allowed
    pub fn origins(&self) -> Option<Vec<&str>> {
        self.allowed_origins.as_deref().map(|origins| {
            origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .collect()
        })
    }
}
