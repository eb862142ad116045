//
//  bitbucket-api
//  tests/client.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use bitbucket_api::api::cloud::RepositoryOptions;
use bitbucket_api::api::{ApiError, BitbucketClient};
use bitbucket_api::auth::{Credentials, OAuthClient, OAuthSession, OAuthToken};
use bitbucket_api::config::ClientConfig;
use chrono::{Duration, Utc};
use mockito::{Matcher, Server};
use reqwest::{Method, StatusCode};
use serde_json::json;

fn client(server: &Server, credentials: Credentials) -> BitbucketClient {
    let config = ClientConfig {
        base_url: format!("{}/2.0", server.url()),
        ..Default::default()
    };
    BitbucketClient::from_config(&config)
        .unwrap()
        .with_auth(credentials)
}

#[tokio::test]
async fn merges_pages_and_authenticates_every_request() {
    let mut server = Server::new_async().await;
    let next = format!("{}/2.0/repositories/ws/second-page", server.url());

    let first = server
        .mock("GET", "/2.0/repositories/ws")
        .match_header("authorization", "Bearer tok")
        .with_header("content-type", "application/json")
        .with_body(json!({"pagelen": 2, "size": 3, "values": ["A", "B"], "next": next}).to_string())
        .create_async()
        .await;
    let second = server
        .mock("GET", "/2.0/repositories/ws/second-page")
        .match_header("authorization", "Bearer tok")
        .with_header("content-type", "application/json")
        .with_body(json!({"values": ["C"], "next": ""}).to_string())
        .create_async()
        .await;

    let client = client(&server, Credentials::default().with_bearer("tok"));
    let url = client.request_url("/repositories/ws");
    let merged = client.execute(Method::GET, &url, None).await.unwrap();

    assert_eq!(merged, json!({"values": ["A", "B", "C"]}));
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn sends_basic_auth_and_json_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/2.0/repositories/ws/new-repo")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"is_private": true, "project": {"key": "PROJ"}})))
        .with_status(201)
        .with_body(json!({"type": "repository", "full_name": "ws/new-repo", "is_private": true}).to_string())
        .create_async()
        .await;

    let repo = client(&server, Credentials::default().with_basic("user", "pass"))
        .repositories()
        .create(&RepositoryOptions {
            is_private: Some(true),
            project: Some("PROJ".to_string()),
            ..RepositoryOptions::new("ws", "new-repo")
        })
        .await
        .unwrap();

    assert_eq!(repo.full_name, "ws/new-repo");
    assert!(repo.is_private);
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_carries_status_text() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/2.0/repositories/ws/missing")
        .with_status(404)
        .with_body(r#"{"type": "error", "error": {"message": "Repository ws/missing not found"}}"#)
        .create_async()
        .await;

    let err = client(&server, Credentials::none())
        .repositories()
        .get("ws", "missing")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("404 Not Found"));
}

#[tokio::test]
async fn raw_request_returns_status_error_without_decoding() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/2.0/repositories/ws/repo/src/main/README.md")
        .with_status(403)
        .with_body("<html>Forbidden</html>")
        .create_async()
        .await;

    let client = client(&server, Credentials::none());
    let url = client.request_url("/repositories/ws/repo/src/main/README.md");
    let err = client.execute_raw(Method::GET, &url, None).await.unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body, "<html>Forbidden</html>");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn custom_page_len_is_added_to_collection_requests() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/2\.0/repositories/ws/repo/forks".to_string()))
        .match_query(Matcher::UrlEncoded("pagelen".into(), "50".into()))
        .with_body(json!({"pagelen": 50, "values": [{"full_name": "other/repo"}]}).to_string())
        .create_async()
        .await;

    let forks = client(&server, Credentials::none())
        .with_page_len(50)
        .repositories()
        .list_forks("ws", "repo")
        .await
        .unwrap();

    assert_eq!(forks, json!({"values": [{"full_name": "other/repo"}]}));
    mock.assert_async().await;
}

#[tokio::test]
async fn next_link_is_followed_verbatim_after_page_len() {
    let mut server = Server::new_async().await;
    let next = format!("{}/2.0/repositories/ws?page=2", server.url());

    let first = server
        .mock("GET", "/2.0/repositories/ws")
        .match_query(Matcher::Exact("pagelen=50".to_string()))
        .with_body(json!({"pagelen": 50, "values": ["A"], "next": next}).to_string())
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/2.0/repositories/ws")
        .match_query(Matcher::Exact("page=2".to_string()))
        .with_body(json!({"pagelen": 50, "values": ["B"]}).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = client(&server, Credentials::none()).with_page_len(50);
    let url = client.request_url("/repositories/ws");
    let merged = client.execute(Method::GET, &url, None).await.unwrap();

    assert_eq!(merged, json!({"values": ["A", "B"]}));
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn error_envelope_on_first_page_of_listing_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/2.0/repositories/ws/repo/watchers")
        .with_body(json!({"type": "error", "error": {"message": "Access denied"}}).to_string())
        .create_async()
        .await;

    let err = client(&server, Credentials::none())
        .repositories()
        .list_watchers("ws", "repo")
        .await
        .unwrap_err();

    match err {
        ApiError::Domain(domain) => assert_eq!(domain.message, "Access denied"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn error_envelope_becomes_domain_error() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/2.0/repositories/ws/repo/pipelines_config")
        .with_body(json!({"type": "error", "error": {"message": "Pipelines are not available"}}).to_string())
        .create_async()
        .await;

    let err = client(&server, Credentials::none())
        .repositories()
        .update_pipeline_config("ws", "repo", true)
        .await
        .unwrap_err();

    match err {
        ApiError::Domain(domain) => assert_eq!(domain.message, "Pipelines are not available"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn followed_page_without_values_fails() {
    let mut server = Server::new_async().await;
    let next = format!("{}/2.0/repositories/ws/watchers-2", server.url());
    server
        .mock("GET", "/2.0/repositories/ws/repo/watchers")
        .with_body(json!({"values": [{"display_name": "a"}], "next": next}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/2.0/repositories/ws/watchers-2")
        .with_body(json!({"page": 2}).to_string())
        .create_async()
        .await;

    let err = client(&server, Credentials::none())
        .repositories()
        .list_watchers("ws", "repo")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Pagination(_)));
}

#[tokio::test]
async fn delete_accepts_empty_no_content() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/2.0/repositories/ws/repo")
        .with_status(204)
        .create_async()
        .await;

    client(&server, Credentials::none())
        .repositories()
        .delete("ws", "repo")
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn expired_oauth_token_is_refreshed_before_request() {
    let mut server = Server::new_async().await;
    let token_endpoint = server
        .mock("POST", "/site/oauth2/access_token")
        .match_header("authorization", "Basic aWQ6c2VjcmV0")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
        ]))
        .with_body(json!({"access_token": "fresh", "expires_in": 7200, "token_type": "bearer"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let api = server
        .mock("GET", "/2.0/user")
        .match_header("authorization", "Bearer fresh")
        .with_body(json!({"display_name": "Someone"}).to_string())
        .create_async()
        .await;

    let mut stale = OAuthToken::new("stale");
    stale.refresh_token = Some("refresh-1".to_string());
    stale.expires_at = Some(Utc::now() - Duration::minutes(5));
    let session = OAuthSession::new(
        OAuthClient::new("id", "secret")
            .with_token_url(format!("{}/site/oauth2/access_token", server.url())),
        stale,
    );

    let client = client(&server, Credentials::default().with_oauth(session));
    let url = client.request_url("/user");
    let user = client.execute(Method::GET, &url, None).await.unwrap();

    assert_eq!(user["display_name"], "Someone");
    let token = client.credentials().oauth().unwrap().token();
    assert_eq!(token.access_token, "fresh");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    token_endpoint.assert_async().await;
    api.assert_async().await;
}

#[tokio::test]
async fn failed_refresh_is_reported() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/site/oauth2/access_token")
        .with_status(400)
        .with_body(r#"{"error": "invalid_grant"}"#)
        .create_async()
        .await;

    let mut stale = OAuthToken::new("stale");
    stale.refresh_token = Some("revoked".to_string());
    stale.expires_at = Some(Utc::now() - Duration::minutes(5));
    let session = OAuthSession::new(
        OAuthClient::new("id", "secret")
            .with_token_url(format!("{}/site/oauth2/access_token", server.url())),
        stale,
    );

    let client = client(&server, Credentials::default().with_oauth(session));
    let url = client.request_url("/user");
    let err = client.execute(Method::GET, &url, None).await.unwrap_err();

    match err {
        ApiError::TokenRefresh(message) => assert!(message.contains("invalid_grant")),
        other => panic!("unexpected error: {other}"),
    }
}
