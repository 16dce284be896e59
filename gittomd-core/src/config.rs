use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{DEFAULT_NAMESPACE, DEFAULT_TTL};
use crate::fetch::DEFAULT_CONCURRENCY;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_USER_AGENT: &str = "gittomd";

/// Transport settings for the GitHub collaborators. Built explicitly and injected.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub raw_base_url: String,
    /// Bearer credential for API calls.
    pub token: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            raw_base_url: DEFAULT_RAW_BASE_URL.to_string(),
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("raw_base_url", &self.raw_base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Document cache settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub namespace: String,
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: DEFAULT_TTL,
        }
    }
}

/// Everything the conversion pipeline needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub client: ClientConfig,
    pub fetch_concurrency: usize,
    pub cache: CacheSettings,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            fetch_concurrency: DEFAULT_CONCURRENCY,
            cache: CacheSettings::default(),
        }
    }
}

impl ConvertConfig {
    pub fn trace_loaded(&self) {
        info!(
            api_base_url = %self.client.api_base_url,
            raw_base_url = %self.client.raw_base_url,
            authenticated = self.client.token.is_some(),
            fetch_concurrency = self.fetch_concurrency,
            cache_ttl_secs = self.cache.ttl.as_secs(),
            "Loaded ConvertConfig"
        );
        debug!(?self, "ConvertConfig loaded (full debug)");
    }
}
