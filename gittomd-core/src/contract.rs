//! # contract: collaborator interfaces for the conversion pipeline
//!
//! The pipeline talks to three external systems, each behind one trait:
//! - [`RepositorySource`]: resolves a repository's default branch and flat file listing.
//! - [`ContentSource`]: returns the raw text of one file on one branch.
//! - [`CacheStore`]: a key/value store with per-entry expiry holding finished documents.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the generated `Mock*` types are exported
//!   under the default `test-export-mocks` feature so dependent crates can use them too.
//!
//! ## Adding New Collaborators
//! - Implement the trait for your backend (see [`crate::github`] and [`crate::cache`]).
//! - Convert every upstream failure into the trait's error type; never panic on remote input.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Kind of a listed repository entry, as declared by the listing itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A file ("blob" upstream).
    Text,
    /// A directory ("tree" upstream).
    Directory,
}

/// One `(path, kind)` pair from the repository listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn text(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Text,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// Default branch plus the complete flat listing of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryListing {
    pub default_branch: String,
    pub entries: Vec<TreeEntry>,
}

/// Per-leaf result of content fetching. `fetched == false` marks a tolerated failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub name: String,
    pub path: String,
    pub content: String,
    pub fetched: bool,
}

/// Failures resolving repository metadata or its tree listing.
///
/// The rendered messages are part of the response contract: the status mapping in
/// [`crate::error::status_for_message`] classifies them by content.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Failed to fetch repo details for {owner}/{repo}: {message} (Status: {status})")]
    RepoDetails {
        owner: String,
        repo: String,
        message: String,
        status: u16,
    },

    #[error("Could not determine default branch for {owner}/{repo}. The repository might be empty or uninitialized.")]
    NoDefaultBranch { owner: String, repo: String },

    #[error("Failed to fetch repository tree for {owner}/{repo} (branch: {branch}): {message} (Status: {status})")]
    Tree {
        owner: String,
        repo: String,
        branch: String,
        message: String,
        status: u16,
    },

    #[error("Repository is too large; the file tree was truncated by the GitHub API. Full processing is not possible with this method.")]
    Truncated,

    #[error("Network or parsing error fetching repository data: {0}")]
    Transport(String),
}

/// Failure retrieving one file's raw content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("raw content request for {path} returned status {status}")]
    Status { path: String, status: u16 },

    #[error("raw content request for {path} failed: {message}")]
    Transport { path: String, message: String },
}

/// Failure talking to the cache store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("cache store rejected the command: {0}")]
    Rejected(String),

    #[error("cache store transport failure: {0}")]
    Transport(String),
}

/// Resolves a repository's default branch and flat file listing.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Fetch the default branch and the full recursive listing.
    ///
    /// An empty repository is a valid, empty listing; a truncated listing is
    /// [`ListingError::Truncated`].
    async fn fetch_listing(&self, owner: &str, repo: &str)
        -> Result<RepositoryListing, ListingError>;
}

/// Retrieves raw file content.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_raw(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<String, ContentError>;
}

/// Text key/value store with expiry, used for finished documents.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;
}
