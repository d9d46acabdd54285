use std::time::Duration;

pub const SECURE_API_URL: &str = "https://api.wordpress.org/plugins/info/1.2/";
pub const PLAIN_API_URL: &str = "http://api.wordpress.org/plugins/info/1.2/";
pub const CATALOG_HOST: &str = "wordpress.org";
const USER_AGENT: &str = concat!("plugin-cards/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub render: RenderConfig,
}

/// How to reach the catalog API and how long to keep its answers.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub secure_url: String,
    /// Used on its own when TLS is off, and as the single fallback otherwise.
    pub plain_url: String,
    pub use_tls: bool,
    pub locale: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub per_page: u32,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            secure_url: SECURE_API_URL.to_string(),
            plain_url: PLAIN_API_URL.to_string(),
            use_tls: true,
            locale: "en_US".to_string(),
            timeout: Duration::from_secs(15),
            cache_ttl: Duration::from_secs(60 * 60),
            per_page: 24,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Host serving the public plugin pages, e.g. `wordpress.org`.
    pub catalog_host: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            catalog_host: CATALOG_HOST.to_string(),
        }
    }
}
