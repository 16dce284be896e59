//! GitHub-backed [`RepositorySource`] and [`ContentSource`].
//!
//! Metadata and the recursive tree listing come from the REST API; file contents
//! from the raw-content host. All transport settings arrive through
//! [`ClientConfig`], so tests can point the client anywhere.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::contract::{
    ContentError, ContentSource, EntryKind, ListingError, RepositoryListing, RepositorySource,
    TreeEntry,
};

const API_ACCEPT: &str = "application/vnd.github.v3+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

/// HTTP client for the GitHub API and raw-content host.
pub struct GitHubClient {
    client: Client,
    api_base_url: Url,
    raw_base_url: Url,
    token: Option<String>,
}

#[derive(Deserialize)]
struct RepoDetails {
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<RawTreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct RawTreeItem {
    #[serde(default)]
    path: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ListingError> {
        let api_base_url = parse_base(&config.api_base_url)?;
        let raw_base_url = parse_base(&config.raw_base_url)?;

        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ListingError::Transport(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ListingError::Transport(e.to_string()))?;

        info!(
            api = %api_base_url,
            raw = %raw_base_url,
            authenticated = config.token.is_some(),
            "Initialised GitHub client"
        );
        Ok(Self {
            client,
            api_base_url,
            raw_base_url,
            token: config.token.clone(),
        })
    }

    fn api_request(&self, url: Url) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(ACCEPT, API_ACCEPT)
            .header(API_VERSION_HEADER, API_VERSION);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn repo_url(&self, owner: &str, repo: &str) -> Url {
        join_segments(&self.api_base_url, ["repos", owner, repo])
    }

    fn tree_url(&self, owner: &str, repo: &str, branch: &str) -> Url {
        let mut url = join_segments(
            &self.api_base_url,
            ["repos", owner, repo, "git", "trees"]
                .into_iter()
                .chain(branch.split('/')),
        );
        url.query_pairs_mut().append_pair("recursive", "1");
        url
    }

    /// `{raw}/{owner}/{repo}/{branch}/{path...}` with each segment percent-encoded.
    /// Slashes in the branch name stay separators.
    pub fn raw_url(&self, owner: &str, repo: &str, branch: &str, path: &str) -> Url {
        join_segments(
            &self.raw_base_url,
            [owner, repo]
                .into_iter()
                .chain(branch.split('/'))
                .chain(path.split('/')),
        )
    }
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn fetch_listing(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryListing, ListingError> {
        let response = self
            .api_request(self.repo_url(owner, repo))
            .send()
            .await
            .map_err(|e| ListingError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = error_details(response).await;
            return Err(ListingError::RepoDetails {
                owner: owner.to_string(),
                repo: repo.to_string(),
                message,
                status,
            });
        }
        let details: RepoDetails = response
            .json()
            .await
            .map_err(|e| ListingError::Transport(e.to_string()))?;
        let branch = match details.default_branch {
            Some(branch) if !branch.is_empty() => branch,
            _ => {
                return Err(ListingError::NoDefaultBranch {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
        };

        let response = self
            .api_request(self.tree_url(owner, repo, &branch))
            .send()
            .await
            .map_err(|e| ListingError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = error_details(response).await;
            if status == StatusCode::NOT_FOUND.as_u16()
                || (status == StatusCode::CONFLICT.as_u16() && message.contains("empty"))
            {
                warn!(
                    owner,
                    repo,
                    branch = %branch,
                    status,
                    "Repository appears to be empty or has no commit history, using an empty tree"
                );
                return Ok(RepositoryListing {
                    default_branch: branch,
                    entries: Vec::new(),
                });
            }
            return Err(ListingError::Tree {
                owner: owner.to_string(),
                repo: repo.to_string(),
                branch,
                message,
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ListingError::Transport(e.to_string()))?;
        let entries = parse_tree_listing(&body)?;
        info!(owner, repo, branch = %branch, entries = entries.len(), "Fetched repository listing");
        Ok(RepositoryListing {
            default_branch: branch,
            entries,
        })
    }
}

#[async_trait]
impl ContentSource for GitHubClient {
    async fn fetch_raw(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<String, ContentError> {
        let url = self.raw_url(owner, repo, branch, path);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/plain")
            .send()
            .await
            .map_err(|e| ContentError::Transport {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| ContentError::Transport {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

/// Parse a recursive tree response body into entries.
///
/// Items that are not `blob` or `tree` (submodule commits, for instance) or that lack
/// a path are dropped here so the tree builder only sees the two known kinds.
pub fn parse_tree_listing(body: &str) -> Result<Vec<TreeEntry>, ListingError> {
    let response: TreeResponse =
        serde_json::from_str(body).map_err(|e| ListingError::Transport(e.to_string()))?;
    if response.truncated {
        return Err(ListingError::Truncated);
    }
    let entries = response
        .tree
        .into_iter()
        .filter_map(|item| {
            let path = item.path.filter(|p| !p.is_empty())?;
            let kind = match item.kind.as_deref() {
                Some("blob") => EntryKind::Text,
                Some("tree") => EntryKind::Directory,
                other => {
                    debug!(
                        path = %path,
                        kind = ?other,
                        "Dropping listing entry of unsupported type"
                    );
                    return None;
                }
            };
            Some(TreeEntry { path, kind })
        })
        .collect();
    Ok(entries)
}

/// Extract `(owner, repo)` from a `https://github.com/{owner}/{repo}` URL.
///
/// A trailing `.git` on the repository is removed; extra path segments are ignored.
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url).ok()?;
    if parsed.host_str() != Some("github.com") {
        return None;
    }
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

async fn error_details(response: Response) -> (u16, String) {
    let status = response.status();
    let fallback = status.canonical_reason().unwrap_or("Unknown error").to_string();
    let message = response
        .json::<ApiErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or(fallback);
    (status.as_u16(), message)
}

fn parse_base(raw: &str) -> Result<Url, ListingError> {
    let url = Url::parse(raw)
        .map_err(|e| ListingError::Transport(format!("invalid base URL {raw:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ListingError::Transport(format!("invalid base URL {raw:?}")));
    }
    Ok(url)
}

fn join_segments<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new(&ClientConfig::default()).expect("client")
    }

    #[test]
    fn parses_plain_and_dot_git_urls() {
        assert_eq!(
            parse_github_url("https://github.com/octo/hello"),
            Some(("octo".into(), "hello".into()))
        );
        assert_eq!(
            parse_github_url("https://github.com/octo/hello.git"),
            Some(("octo".into(), "hello".into()))
        );
        assert_eq!(
            parse_github_url("https://github.com/octo/hello/tree/main/src"),
            Some(("octo".into(), "hello".into()))
        );
    }

    #[test]
    fn rejects_other_hosts_and_short_paths() {
        assert_eq!(parse_github_url("https://gitlab.com/octo/hello"), None);
        assert_eq!(parse_github_url("https://github.com/octo"), None);
        assert_eq!(parse_github_url("not a url"), None);
    }

    #[test]
    fn raw_url_encodes_each_segment() {
        let url = client().raw_url("octo", "hello", "main", "docs/my notes#1.md");
        assert_eq!(
            url.as_str(),
            "https://raw.githubusercontent.com/octo/hello/main/docs/my%20notes%231.md"
        );
    }

    #[test]
    fn tree_url_requests_recursive_listing() {
        let url = client().tree_url("octo", "hello", "main");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/hello/git/trees/main?recursive=1"
        );
    }

    #[test]
    fn branch_with_slashes_keeps_separators() {
        let client = client();
        assert_eq!(
            client
                .raw_url("octo", "hello", "release/v1", "src/a.rs")
                .as_str(),
            "https://raw.githubusercontent.com/octo/hello/release/v1/src/a.rs"
        );
        assert_eq!(
            client.tree_url("octo", "hello", "release/v1").as_str(),
            "https://api.github.com/repos/octo/hello/git/trees/release/v1?recursive=1"
        );
    }

    #[test]
    fn tree_listing_keeps_blobs_and_trees_only() {
        let body = r#"{
            "sha": "abc",
            "tree": [
                {"path": "README.md", "type": "blob"},
                {"path": "src", "type": "tree"},
                {"path": "vendor/lib", "type": "commit"},
                {"path": "", "type": "blob"}
            ],
            "truncated": false
        }"#;
        let entries = parse_tree_listing(body).expect("listing");
        assert_eq!(
            entries,
            vec![TreeEntry::text("README.md"), TreeEntry::directory("src")]
        );
    }

    #[test]
    fn truncated_listing_is_an_error() {
        let body = r#"{"tree": [{"path": "a", "type": "blob"}], "truncated": true}"#;
        assert!(matches!(parse_tree_listing(body), Err(ListingError::Truncated)));
    }
}
