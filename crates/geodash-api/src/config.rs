use std::env;

/// Server-specific knobs that sit outside `geodash_core::config::LayeredConfig` (which governs
/// the store/search core, not where the HTTP listener binds).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3001 }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let host = env::var("GEODASH_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("GEODASH_API_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3001);
        Self { host, port }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
