//! `GitHubClient` against local stub servers standing in for the API and raw hosts.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use gittomd_core::config::ClientConfig;
use gittomd_core::contract::{
    ContentError, ContentSource, ListingError, RepositorySource, TreeEntry,
};
use gittomd_core::github::GitHubClient;
use serde_json::json;
use tokio::net::TcpListener;

const TOKEN: &str = "test-token";

async fn spawn_stub(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    format!("http://{addr}")
}

fn client(api_base_url: &str, raw_base_url: &str) -> GitHubClient {
    GitHubClient::new(&ClientConfig {
        api_base_url: api_base_url.to_string(),
        raw_base_url: raw_base_url.to_string(),
        token: Some(TOKEN.to_string()),
        ..ClientConfig::default()
    })
    .expect("client")
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Rejects requests that lack the API headers the client must send.
fn api_headers_ok(headers: &HeaderMap) -> bool {
    header(headers, "accept") == Some("application/vnd.github.v3+json")
        && header(headers, "x-github-api-version") == Some("2022-11-28")
        && header(headers, "authorization") == Some("Bearer test-token")
}

fn bad_headers() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"message": "missing API headers"})),
    )
        .into_response()
}

fn details_router(details: Response) -> Router {
    let details = std::sync::Arc::new(std::sync::Mutex::new(Some(details)));
    Router::new().route(
        "/repos/octo/hello",
        get(move |headers: HeaderMap| {
            let details = details.clone();
            async move {
                if !api_headers_ok(&headers) {
                    return bad_headers();
                }
                details
                    .lock()
                    .unwrap()
                    .take()
                    .unwrap_or_else(|| StatusCode::GONE.into_response())
            }
        }),
    )
}

fn listing_router(tree_status: StatusCode, tree_body: serde_json::Value) -> Router {
    details_router(Json(json!({"default_branch": "release/v1"})).into_response()).route(
        "/repos/octo/hello/git/trees/release/v1",
        get(
            move |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| {
                let tree_body = tree_body.clone();
                async move {
                    if !api_headers_ok(&headers) {
                        return bad_headers();
                    }
                    if query.get("recursive").map(String::as_str) != Some("1") {
                        return (StatusCode::BAD_REQUEST, "recursive listing expected")
                            .into_response();
                    }
                    (tree_status, Json(tree_body)).into_response()
                }
            },
        ),
    )
}

#[tokio::test]
async fn test_listing_resolves_default_branch_and_tree() {
    let api = spawn_stub(listing_router(
        StatusCode::OK,
        json!({
            "sha": "abc",
            "tree": [
                {"path": "README.md", "type": "blob"},
                {"path": "src", "type": "tree"},
                {"path": "src/a.rs", "type": "blob"},
                {"path": "vendor/lib", "type": "commit"}
            ],
            "truncated": false
        }),
    ))
    .await;

    let listing = client(&api, &api)
        .fetch_listing("octo", "hello")
        .await
        .expect("listing");
    assert_eq!(listing.default_branch, "release/v1");
    assert_eq!(
        listing.entries,
        vec![
            TreeEntry::text("README.md"),
            TreeEntry::directory("src"),
            TreeEntry::text("src/a.rs"),
        ]
    );
}

#[tokio::test]
async fn test_empty_repository_tree_responses_yield_empty_listing() {
    struct TestCase {
        name: &'static str,
        status: StatusCode,
        body: serde_json::Value,
    }

    let cases = vec![
        TestCase {
            name: "tree not found",
            status: StatusCode::NOT_FOUND,
            body: json!({"message": "Not Found"}),
        },
        TestCase {
            name: "conflict mentioning empty",
            status: StatusCode::CONFLICT,
            body: json!({"message": "Git Repository is empty."}),
        },
    ];

    for case in cases {
        let api = spawn_stub(listing_router(case.status, case.body)).await;
        let listing = client(&api, &api)
            .fetch_listing("octo", "hello")
            .await
            .unwrap_or_else(|e| panic!("case '{}': {e}", case.name));
        assert_eq!(listing.default_branch, "release/v1", "case '{}'", case.name);
        assert!(listing.entries.is_empty(), "case '{}'", case.name);
    }
}

#[tokio::test]
async fn test_other_tree_failures_embed_status() {
    let api = spawn_stub(listing_router(
        StatusCode::CONFLICT,
        json!({"message": "Merge conflict"}),
    ))
    .await;
    let err = client(&api, &api)
        .fetch_listing("octo", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, ListingError::Tree { status: 409, .. }), "got {err:?}");
    assert_eq!(
        err.to_string(),
        "Failed to fetch repository tree for octo/hello (branch: release/v1): Merge conflict (Status: 409)"
    );
}

#[tokio::test]
async fn test_truncated_tree_is_an_error() {
    let api = spawn_stub(listing_router(
        StatusCode::OK,
        json!({"tree": [{"path": "a.md", "type": "blob"}], "truncated": true}),
    ))
    .await;
    let err = client(&api, &api)
        .fetch_listing("octo", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, ListingError::Truncated), "got {err:?}");
}

#[tokio::test]
async fn test_repo_details_failures_embed_status_and_message() {
    struct TestCase {
        name: &'static str,
        response: fn() -> Response,
        expected: &'static str,
    }

    let cases = vec![
        TestCase {
            name: "json message",
            response: || {
                (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response()
            },
            expected: "Failed to fetch repo details for octo/hello: Not Found (Status: 404)",
        },
        TestCase {
            name: "canonical reason fallback",
            response: || (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response(),
            expected:
                "Failed to fetch repo details for octo/hello: Internal Server Error (Status: 500)",
        },
    ];

    for case in cases {
        let api = spawn_stub(details_router((case.response)())).await;
        let err = client(&api, &api)
            .fetch_listing("octo", "hello")
            .await
            .unwrap_err();
        assert!(
            matches!(err, ListingError::RepoDetails { .. }),
            "case '{}': {err:?}",
            case.name
        );
        assert_eq!(err.to_string(), case.expected, "case '{}'", case.name);
    }
}

#[tokio::test]
async fn test_missing_default_branch() {
    for body in [json!({}), json!({"default_branch": ""}), json!({"default_branch": null})] {
        let api = spawn_stub(details_router(Json(body.clone()).into_response())).await;
        let err = client(&api, &api)
            .fetch_listing("octo", "hello")
            .await
            .unwrap_err();
        assert!(
            matches!(err, ListingError::NoDefaultBranch { .. }),
            "body {body}: {err:?}"
        );
    }
}

#[tokio::test]
async fn test_raw_content_success_and_status_failure() {
    let raw = spawn_stub(
        Router::new()
            .route(
                "/octo/hello/release/v1/src/a.rs",
                get(|headers: HeaderMap| async move {
                    if header(&headers, "accept") != Some("text/plain") {
                        return (StatusCode::BAD_REQUEST, "text/plain expected").into_response();
                    }
                    "fn main() {}\n".into_response()
                }),
            )
            .fallback(|| async { (StatusCode::NOT_FOUND, "404: Not Found") }),
    )
    .await;
    let client = client("http://127.0.0.1:9", &raw);

    let content = client
        .fetch_raw("octo", "hello", "release/v1", "src/a.rs")
        .await
        .expect("raw content");
    assert_eq!(content, "fn main() {}\n");

    let err = client
        .fetch_raw("octo", "hello", "release/v1", "src/missing.rs")
        .await
        .unwrap_err();
    match err {
        ContentError::Status { path, status } => {
            assert_eq!(path, "src/missing.rs");
            assert_eq!(status, 404);
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}
