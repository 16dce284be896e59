/// `load_config` module: reads the optional YAML config file, injects secrets from the
/// environment and turns the result into the core crate's [`ConvertConfig`] plus the
/// chosen cache store.
///
/// The YAML file never carries secrets. Tokens come from:
/// - `GITHUB_API_TOKEN` (optional bearer credential for the GitHub API)
/// - `UPSTASH_REDIS_REST_URL` / `UPSTASH_REDIS_REST_TOKEN` (required for the `upstash` backend)
///
/// Every section and field is optional; an absent file yields the defaults.
///
/// # Errors
/// All failures are `anyhow::Error`s naming the cause and the file, surfaced at the CLI boundary.
use anyhow::{bail, Context, Result};
use gittomd_core::cache::{MemoryStore, UpstashStore};
use gittomd_core::config::{
    CacheSettings, ClientConfig, ConvertConfig, DEFAULT_API_BASE_URL, DEFAULT_RAW_BASE_URL,
    DEFAULT_USER_AGENT,
};
use gittomd_core::contract::CacheStore;
use gittomd_core::convert::Converter;
use gittomd_core::fetch::DEFAULT_CONCURRENCY;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_API_TOKEN";
pub const UPSTASH_URL_ENV: &str = "UPSTASH_REDIS_REST_URL";
pub const UPSTASH_TOKEN_ENV: &str = "UPSTASH_REDIS_REST_TOKEN";

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub github: GitHubSection,
    pub fetch: FetchSection,
    pub cache: CacheSection,
    pub server: ServerSection,
    #[serde(skip)]
    pub secrets: Secrets,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub api_base_url: String,
    pub raw_base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            raw_base_url: DEFAULT_RAW_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub concurrency: usize,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    None,
    #[default]
    Memory,
    Upstash,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub backend: CacheBackend,
    pub namespace: String,
    pub ttl_secs: u64,
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        let defaults = CacheSettings::default();
        Self {
            backend: CacheBackend::default(),
            namespace: defaults.namespace,
            ttl_secs: defaults.ttl.as_secs(),
            max_entries: 1024,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Values injected from the environment after parsing.
#[derive(Default)]
pub struct Secrets {
    pub github_token: Option<String>,
    pub upstash: Option<UpstashCredentials>,
}

pub struct UpstashCredentials {
    pub url: String,
    pub token: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("upstash_url", &self.upstash.as_ref().map(|c| c.url.as_str()))
            .finish()
    }
}

/// Loads a static YAML config file (no secrets) and injects secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            bail!("Failed to read config file {:?}: {}", path_ref, e);
        }
    };

    // An empty file is a document of defaults, not a YAML error.
    let parsed: CliConfig = if config_content.trim().is_empty() {
        CliConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                bail!("Failed to parse config YAML {:?}: {e}", path_ref);
            }
        }
    };

    finalise(parsed).with_context(|| format!("Invalid configuration in {:?}", path_ref))
}

/// [`load_config`] when a path is given, otherwise defaults plus environment secrets.
pub fn load_config_or_default(path: Option<&Path>) -> Result<CliConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            info!("No config file given, using defaults");
            finalise(CliConfig::default())
        }
    }
}

fn finalise(mut config: CliConfig) -> Result<CliConfig> {
    if config.fetch.concurrency == 0 {
        bail!("fetch.concurrency must be at least 1");
    }
    if config.github.timeout_secs == 0 {
        bail!("github.timeout_secs must be at least 1");
    }

    config.secrets.github_token = read_secret(GITHUB_TOKEN_ENV);
    if config.cache.backend == CacheBackend::Upstash {
        let url = read_secret(UPSTASH_URL_ENV);
        let token = read_secret(UPSTASH_TOKEN_ENV);
        match (url, token) {
            (Some(url), Some(token)) => {
                config.secrets.upstash = Some(UpstashCredentials { url, token });
            }
            _ => {
                error!("Upstash cache backend selected without credentials in the environment");
                bail!(
                    "cache.backend is upstash but {UPSTASH_URL_ENV} and {UPSTASH_TOKEN_ENV} are not both set"
                );
            }
        }
    }
    Ok(config)
}

fn read_secret(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl CliConfig {
    pub fn convert_config(&self) -> ConvertConfig {
        ConvertConfig {
            client: ClientConfig {
                api_base_url: self.github.api_base_url.clone(),
                raw_base_url: self.github.raw_base_url.clone(),
                token: self.secrets.github_token.clone(),
                user_agent: self.github.user_agent.clone(),
                timeout: Duration::from_secs(self.github.timeout_secs),
            },
            fetch_concurrency: self.fetch.concurrency,
            cache: CacheSettings {
                namespace: self.cache.namespace.clone(),
                ttl: Duration::from_secs(self.cache.ttl_secs),
            },
        }
    }

    /// The configured cache store, or `None` for the `none` backend.
    pub fn cache_store(&self) -> Result<Option<Arc<dyn CacheStore>>> {
        let store: Arc<dyn CacheStore> = match self.cache.backend {
            CacheBackend::None => return Ok(None),
            CacheBackend::Memory => Arc::new(MemoryStore::new(self.cache.max_entries)),
            CacheBackend::Upstash => {
                let Some(credentials) = &self.secrets.upstash else {
                    bail!("Upstash credentials were not loaded");
                };
                let store = UpstashStore::new(
                    &credentials.url,
                    credentials.token.clone(),
                    Duration::from_secs(self.github.timeout_secs),
                )
                .context("Failed to construct Upstash cache store")?;
                Arc::new(store)
            }
        };
        info!(backend = ?self.cache.backend, "Cache store ready");
        Ok(Some(store))
    }

    /// GitHub-backed converter; `use_cache = false` skips the cache regardless of backend.
    pub fn build_converter(&self, use_cache: bool) -> Result<Converter> {
        let store = if use_cache { self.cache_store()? } else { None };
        let convert_config = self.convert_config();
        Converter::from_config(&convert_config, store).context("Failed to construct GitHub client")
    }
}
