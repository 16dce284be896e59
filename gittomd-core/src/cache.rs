//! # cache: compressed document cache over a pluggable [`CacheStore`]
//!
//! Documents are zlib-compressed, base64-encoded and stored under
//! `{namespace}:{owner}:{repo}` with a fixed time-to-live. The layer never surfaces an
//! error to the conversion path: failed reads are misses, failed writes are logged.
//!
//! Two stores ship with the crate:
//! - [`MemoryStore`]: process-local, bounded, per-entry expiry (`moka`).
//! - [`UpstashStore`]: Upstash Redis over its REST interface.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use moka::future::Cache;
use moka::Expiry;
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::contract::{CacheStore, StoreError};

pub const DEFAULT_NAMESPACE: &str = "gittomd";
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to compress document: {0}")]
    Compress(#[source] std::io::Error),

    #[error("failed to decode cached value: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to decompress cached value: {0}")]
    Decompress(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Document cache keyed by owner and repository (case-sensitive, not normalised).
#[derive(Clone)]
pub struct DocumentCache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    ttl: Duration,
}

impl DocumentCache {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            ttl,
        }
    }

    pub fn key(&self, owner: &str, repo: &str) -> String {
        format!("{}:{}:{}", self.namespace, owner, repo)
    }

    /// Cached document for `owner/repo`, or `None` on miss, store failure or corrupt value.
    pub async fn get(&self, owner: &str, repo: &str) -> Option<String> {
        let key = self.key(owner, repo);
        let encoded = match self.store.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };
        match unpack(&encoded) {
            Ok(document) => {
                debug!(key = %key, bytes = document.len(), "Cache hit");
                Some(document)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached value unreadable, treating as miss");
                None
            }
        }
    }

    /// Store `document`; failures are logged and returned but never fatal to callers.
    pub async fn put(&self, owner: &str, repo: &str, document: &str) -> Result<(), CacheError> {
        let key = self.key(owner, repo);
        let result = match pack(document) {
            Ok(encoded) => self
                .store
                .set(&key, encoded, self.ttl)
                .await
                .map_err(CacheError::from),
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) => info!(key = %key, ttl_secs = self.ttl.as_secs(), "Document cached"),
            Err(e) => warn!(key = %key, error = %e, "Failed to cache document"),
        }
        result
    }

    /// Run [`DocumentCache::put`] as a detached task. Dropping the handle does not cancel it.
    pub fn spawn_put(&self, owner: &str, repo: &str, document: String) -> JoinHandle<()> {
        let cache = self.clone();
        let owner = owner.to_string();
        let repo = repo.to_string();
        tokio::spawn(async move {
            // Already logged inside put.
            let _ = cache.put(&owner, &repo, &document).await;
        })
    }
}

/// Compress then base64-encode a document for storage.
pub fn pack(document: &str) -> Result<String, CacheError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(document.as_bytes())
        .map_err(CacheError::Compress)?;
    let compressed = encoder.finish().map_err(CacheError::Compress)?;
    Ok(STANDARD.encode(compressed))
}

/// Reverse of [`pack`].
pub fn unpack(encoded: &str) -> Result<String, CacheError> {
    let compressed = STANDARD.decode(encoded.trim().as_bytes())?;
    let mut document = String::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_string(&mut document)
        .map_err(CacheError::Decompress)?;
    Ok(document)
}

#[derive(Clone)]
struct Stored {
    value: String,
    ttl: Duration,
}

struct StoredTtl;

impl Expiry<String, Stored> for StoredTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Stored,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process store with bounded capacity and per-entry expiry.
pub struct MemoryStore {
    entries: Cache<String, Stored>,
}

impl MemoryStore {
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(StoredTtl)
            .build();
        Self { entries }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).await.map(|stored| stored.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_string(), Stored { value, ttl })
            .await;
        Ok(())
    }
}

/// Upstash Redis REST store.
pub struct UpstashStore {
    client: Client,
    base_url: Url,
    token: String,
}

#[derive(Deserialize)]
struct UpstashReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Transport(format!("invalid store URL {base_url:?}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    fn command_url(&self, command: &str, key: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::Transport(format!("store URL {} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .push(command)
            .push(key);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<UpstashReply, StoreError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        let reply: UpstashReply =
            serde_json::from_str(&body).map_err(|e| StoreError::Transport(e.to_string()))?;
        match reply.error {
            Some(message) => Err(StoreError::Rejected(message)),
            None => Ok(reply),
        }
    }
}

#[async_trait]
impl CacheStore for UpstashStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let url = self.command_url("get", key)?;
        let reply = self.send(self.client.get(url)).await?;
        match reply.result {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(value)) => Ok(Some(value)),
            Some(other) => Err(StoreError::Rejected(format!(
                "unexpected GET result type: {other}"
            ))),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let mut url = self.command_url("set", key)?;
        url.query_pairs_mut()
            .append_pair("EX", &ttl.as_secs().max(1).to_string());
        self.send(self.client.post(url).body(value)).await?;
        Ok(())
    }
}
