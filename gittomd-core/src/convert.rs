//! High-level pipeline: repository identifiers in, Markdown document out.
//!
//! Control flow per request:
//!   1. Validate `(owner, repo)`
//!   2. Serve from the [`DocumentCache`] when it has the document
//!   3. Fetch the listing through the [`RepositorySource`]
//!   4. Build the tree, render it, fetch contents and assemble the document
//!   5. Store the document in the cache as a detached, best-effort task
//!
//! # Error Handling
//! Listing failures, truncated listings and structural tree errors end the
//! conversion with a [`ConvertError`]. Per-file fetch failures and cache failures
//! are logged and absorbed further down.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::assemble::Assembler;
use crate::cache::DocumentCache;
use crate::config::ConvertConfig;
use crate::contract::{CacheStore, ContentSource, ListingError, RepositorySource};
use crate::error::ConvertError;
use crate::github::{parse_github_url, GitHubClient};
use crate::tree::build_tree;

pub const MISSING_IDENTIFIERS: &str = "GitHub owner and repository name must be provided as the first two path segments after the base API path.";

/// A validated `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: &str, repo: &str) -> Result<Self, ConvertError> {
        if owner.is_empty() || repo.is_empty() {
            return Err(ConvertError::InvalidRequest(MISSING_IDENTIFIERS.to_string()));
        }
        for identifier in [owner, repo] {
            if !is_valid_identifier(identifier) {
                return Err(ConvertError::InvalidRequest(format!(
                    "Invalid GitHub owner or repository name: {identifier:?}"
                )));
            }
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Accepts `owner/repo` or a `https://github.com/owner/repo` URL.
    pub fn parse(input: &str) -> Result<Self, ConvertError> {
        let input = input.trim();
        if input.contains("://") {
            return match parse_github_url(input) {
                Some((owner, repo)) => Self::new(&owner, &repo),
                None => Err(ConvertError::InvalidRequest(format!(
                    "Not a GitHub repository URL: {input}"
                ))),
            };
        }
        let mut parts = input.trim_matches('/').splitn(2, '/');
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next().unwrap_or_default();
        Self::new(owner, repo)
    }
}

fn is_valid_identifier(identifier: &str) -> bool {
    identifier != "."
        && identifier != ".."
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Where a returned document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Generated,
}

#[derive(Debug)]
pub struct ConversionOutcome {
    pub markdown: String,
    pub origin: Origin,
    /// Handle of the detached cache write, when one was started. Dropping it does
    /// not cancel the write.
    pub cache_write: Option<JoinHandle<()>>,
}

/// Runs conversions against injected collaborators.
pub struct Converter {
    listing: Arc<dyn RepositorySource>,
    assembler: Assembler,
    cache: Option<DocumentCache>,
}

impl Converter {
    pub fn new(
        listing: Arc<dyn RepositorySource>,
        content: Arc<dyn ContentSource>,
        cache: Option<DocumentCache>,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            listing,
            assembler: Assembler::new(content, fetch_concurrency),
            cache,
        }
    }

    /// GitHub-backed converter; `store` enables the document cache.
    pub fn from_config(
        config: &ConvertConfig,
        store: Option<Arc<dyn CacheStore>>,
    ) -> Result<Self, ListingError> {
        config.trace_loaded();
        let github = Arc::new(GitHubClient::new(&config.client)?);
        let cache = store.map(|store| {
            DocumentCache::new(store, config.cache.namespace.clone(), config.cache.ttl)
        });
        Ok(Self::new(
            github.clone(),
            github,
            cache,
            config.fetch_concurrency,
        ))
    }

    pub async fn convert(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<ConversionOutcome, ConvertError> {
        let target = RepoRef::new(owner, repo)?;
        let (owner, repo) = (target.owner.as_str(), target.repo.as_str());
        info!(owner, repo, "[CONVERT] Starting conversion");

        if let Some(cache) = &self.cache {
            if let Some(markdown) = cache.get(owner, repo).await {
                info!(owner, repo, "[CONVERT] Served from cache");
                return Ok(ConversionOutcome {
                    markdown,
                    origin: Origin::Cache,
                    cache_write: None,
                });
            }
        }

        let listing = self
            .listing
            .fetch_listing(owner, repo)
            .await
            .map_err(|e| {
                error!(owner, repo, error = %e, "[CONVERT][ERROR] Listing failed");
                ConvertError::from(e)
            })?;

        let tree = build_tree(&listing.entries, repo).map_err(|e| {
            error!(owner, repo, error = %e, "[CONVERT][ERROR] Tree construction failed");
            ConvertError::from(e)
        })?;

        let document = self
            .assembler
            .assemble(owner, repo, &listing.default_branch, &tree)
            .await
            .map_err(|e| {
                error!(owner, repo, error = %e, "[CONVERT][ERROR] Assembly failed");
                ConvertError::from(e)
            })?;
        let markdown = document.to_markdown();

        let cache_write = self
            .cache
            .as_ref()
            .map(|cache| cache.spawn_put(owner, repo, markdown.clone()));

        info!(
            owner,
            repo,
            branch = %listing.default_branch,
            bytes = markdown.len(),
            "[CONVERT] Conversion complete"
        );
        Ok(ConversionOutcome {
            markdown,
            origin: Origin::Generated,
            cache_write,
        })
    }
}
