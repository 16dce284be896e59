//! Concurrent retrieval of file contents.
//!
//! One wave of independent fetches per conversion, bounded by a semaphore, joined
//! once. A single file failing is recorded and logged; only a failure of the join
//! itself (a task panicking or being cancelled) fails the batch.

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::contract::{ContentRecord, ContentSource};
use crate::tree::TreeNode;

/// Default number of fetches in flight per conversion.
pub const DEFAULT_CONCURRENCY: usize = 16;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch task for {path} did not complete: {message}")]
    Aggregation { path: String, message: String },
}

/// Branch coordinates shared by every fetch in a batch.
#[derive(Debug, Clone)]
pub struct FetchTarget {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

/// Fetch every leaf the classifier includes, at most `concurrency` at a time.
///
/// Records come back in the order of `leaves`; excluded leaves produce no record.
/// Each file gets exactly one attempt.
pub async fn fetch_all(
    source: Arc<dyn ContentSource>,
    leaves: &[&TreeNode],
    target: &FetchTarget,
    concurrency: usize,
) -> Result<Vec<ContentRecord>, FetchError> {
    let limiter = Arc::new(Semaphore::new(concurrency.max(1)));

    let mut paths = Vec::new();
    let mut tasks = Vec::new();
    for leaf in leaves {
        if !classify(&leaf.path, &leaf.name).is_include() {
            debug!(path = %leaf.path, "Skipping excluded file");
            continue;
        }
        let source = Arc::clone(&source);
        let limiter = Arc::clone(&limiter);
        let target = target.clone();
        let name = leaf.name.clone();
        let path = leaf.path.clone();
        paths.push(path.clone());

        tasks.push(tokio::spawn(async move {
            // The semaphore is never closed, so acquiring cannot fail.
            let _permit = limiter.acquire().await;
            match source
                .fetch_raw(&target.owner, &target.repo, &target.branch, &path)
                .await
            {
                Ok(content) => ContentRecord {
                    name,
                    path,
                    content,
                    fetched: true,
                },
                Err(e) => {
                    warn!(
                        owner = %target.owner,
                        repo = %target.repo,
                        path = %path,
                        error = %e,
                        "Failed to fetch raw content, omitting file"
                    );
                    ContentRecord {
                        name,
                        path,
                        content: String::new(),
                        fetched: false,
                    }
                }
            }
        }));
    }

    let settled = join_all(tasks).await;

    let mut records = Vec::with_capacity(settled.len());
    for (outcome, path) in settled.into_iter().zip(paths) {
        match outcome {
            Ok(record) => records.push(record),
            Err(e) => {
                error!(path = %path, error = %e, "Content fetch task aborted");
                return Err(FetchError::Aggregation {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    let failed = records.iter().filter(|r| !r.fetched).count();
    info!(
        owner = %target.owner,
        repo = %target.repo,
        fetched = records.len() - failed,
        failed,
        "Content fetch wave settled"
    );
    Ok(records)
}
