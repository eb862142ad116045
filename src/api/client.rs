//
//  bitbucket-api
//  api/client.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # HTTP Client for the Bitbucket Cloud API
//!
//! [`BitbucketClient`] is the entry point into the request pipeline:
//!
//! ```text
//! URL + body -> authenticate -> transport -> decode -> paginate -> map
//! ```
//!
//! ## Entry Points
//!
//! - [`execute`](BitbucketClient::execute): JSON result, all pages merged
//! - [`execute_raw`](BitbucketClient::execute_raw): raw bytes, never decoded
//! - [`execute_empty`](BitbucketClient::execute_empty): status only, body discarded
//! - [`fetch_entity`](BitbucketClient::fetch_entity) /
//!   [`fetch_collection`](BitbucketClient::fetch_collection): typed results
//!
//! ## Features
//!
//! - Bearer, basic and OAuth 2.0 authentication with token refresh
//! - Transparent pagination of collection envelopes
//! - Configurable page length and base URL
//! - Custom User-Agent header

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::cloud::Repositories;
use super::common::{
    apply_page_len, decode, fetch_all_pages, map_collection, map_entity, ApiError,
    DEFAULT_PAGE_LEN,
};
use super::transport::{classify, ApiRequest, ReqwestTransport, Transport};
use crate::auth::Credentials;
use crate::config::ClientConfig;

/// Base URL of the Bitbucket Cloud REST API.
pub const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// The main HTTP client for the Bitbucket Cloud API.
///
/// The client is `Send + Sync` and can be shared between tasks; every call is
/// independent and the only shared mutable state is the OAuth 2.0 token.
///
/// # Creating a Client
///
/// ```rust,no_run
/// use bitbucket_api::api::BitbucketClient;
/// use bitbucket_api::auth::Credentials;
///
/// let client = BitbucketClient::new(Credentials::default().with_bearer("your-token"))?
///     .with_page_len(50);
/// # Ok::<(), bitbucket_api::api::common::ApiError>(())
/// ```
pub struct BitbucketClient {
    /// Performs the network calls
    transport: Arc<dyn Transport>,
    /// Credentials attached to every request
    credentials: Credentials,
    /// API root, without trailing slash
    base_url: String,
    /// Page length requested on initial collection requests
    page_len: u64,
}

impl std::fmt::Debug for BitbucketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketClient")
            .field("base_url", &self.base_url)
            .field("page_len", &self.page_len)
            .finish_non_exhaustive()
    }
}

impl BitbucketClient {
    /// Creates a client for Bitbucket Cloud with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client could not be built.
    pub fn new(credentials: Credentials) -> Result<Self, ApiError> {
        Self::from_config(&ClientConfig::default()).map(|client| client.with_auth(credentials))
    }

    /// Creates a client from a loaded configuration.
    ///
    /// Base URL, page length, timeout, user agent and credentials all come
    /// from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config.user_agent, config.timeout())?;

        Ok(Self::with_transport(Arc::new(transport), config.credentials())
            .with_base_url(&config.base_url)
            .with_page_len(config.page_len))
    }

    /// Creates a client on top of an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_len: DEFAULT_PAGE_LEN,
        }
    }

    /// Replaces the credentials.
    pub fn with_auth(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Points the client at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the page length requested on initial collection requests.
    pub fn with_page_len(mut self, page_len: u64) -> Self {
        self.page_len = page_len;
        self
    }

    /// Returns the configured page length.
    pub fn page_len(&self) -> u64 {
        self.page_len
    }

    /// Returns the API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the credentials attached to requests.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Joins an API path onto the base URL.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use bitbucket_api::api::BitbucketClient;
    /// use bitbucket_api::auth::Credentials;
    ///
    /// let client = BitbucketClient::new(Credentials::none())?;
    /// assert_eq!(
    ///     client.request_url("/repositories/ws/repo"),
    ///     "https://api.bitbucket.org/2.0/repositories/ws/repo"
    /// );
    /// # Ok::<(), bitbucket_api::api::common::ApiError>(())
    /// ```
    pub fn request_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Returns the repository endpoints.
    pub fn repositories(&self) -> Repositories<'_> {
        Repositories::new(self)
    }

    /// Sends one authenticated request and classifies the response.
    ///
    /// Returns the body bytes, or `None` when `accept_empty` is set.
    ///
    /// # Errors
    ///
    /// - [`ApiError::InvalidUrl`] for a malformed URL
    /// - [`ApiError::TokenRefresh`] if an expired OAuth token could not be refreshed
    /// - [`ApiError::Network`] for connection-level failures
    /// - [`ApiError::Status`] for any non-2xx status
    /// - [`ApiError::EmptyBody`] if no body came back where one was expected
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        accept_empty: bool,
    ) -> Result<Option<Vec<u8>>, ApiError> {
        let mut request = ApiRequest::new(method, url, body)?;

        self.credentials
            .refresh_if_expired(self.transport.as_ref())
            .await?;
        self.credentials.authenticate(&mut request.headers);

        tracing::debug!(method = %request.method, url = %request.url, "Sending request");
        let response = self.transport.round_trip(request).await?;
        tracing::debug!(status = %response.status, "Received response");

        classify(response, accept_empty)
    }

    /// Executes a request and returns its JSON body, merging every page of a
    /// collection envelope.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use bitbucket_api::api::BitbucketClient;
    /// use bitbucket_api::auth::Credentials;
    /// use reqwest::Method;
    ///
    /// # async fn example() -> Result<(), bitbucket_api::api::common::ApiError> {
    /// let client = BitbucketClient::new(Credentials::default().with_bearer("token"))?;
    /// let url = client.request_url("/repositories/myworkspace");
    /// let all = client.execute(Method::GET, &url, None).await?;
    /// println!("{} repositories", all["values"].as_array().map_or(0, Vec::len));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
    ) -> Result<Value, ApiError> {
        let url = apply_page_len(url, self.page_len)?;
        let method = &method;

        fetch_all_pages(url, move |page_url| {
            self.fetch_json(method.clone(), page_url, body)
        })
        .await
    }

    /// Executes a request and returns the body bytes untouched.
    ///
    /// Used for endpoints that return non-JSON content such as raw files.
    /// No JSON decoding is attempted, on success or on failure.
    pub async fn execute_raw(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = apply_page_len(url, self.page_len)?;
        self.send(method, &url, body, false)
            .await?
            .ok_or(ApiError::EmptyBody)
    }

    /// Executes a request whose reply carries nothing of interest.
    ///
    /// Succeeds on any 2xx status and discards the body (e.g. deletions).
    pub async fn execute_empty(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send(method, url, body, true).await.map(|_| ())
    }

    /// Executes a request and maps the result onto `T`.
    pub async fn fetch_entity<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
    ) -> Result<T, ApiError> {
        map_entity(self.execute(method, url, body).await?)
    }

    /// Executes a collection request and maps every element onto `T`.
    ///
    /// Elements that fail to decode are skipped with a warning.
    pub async fn fetch_collection<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
    ) -> Result<Vec<T>, ApiError> {
        map_collection(self.execute(method, url, body).await?)
    }

    async fn fetch_json(
        &self,
        method: Method,
        url: String,
        body: Option<&str>,
    ) -> Result<Value, ApiError> {
        let bytes = self
            .send(method, &url, body, false)
            .await?
            .ok_or(ApiError::EmptyBody)?;
        decode(bytes).into_json()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::transport::RawResponse;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// In-memory transport serving queued responses per URL.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        responses: Mutex<HashMap<String, VecDeque<RawResponse>>>,
        pub(crate) requests: Mutex<Vec<ApiRequest>>,
    }

    impl FakeTransport {
        pub(crate) fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
            self.responses
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(RawResponse {
                    status: StatusCode::from_u16(status).unwrap(),
                    body: Some(body.as_bytes().to_vec()),
                });
            self
        }

        pub(crate) fn respond_json(&self, url: &str, value: Value) -> &Self {
            self.respond(url, 200, &value.to_string())
        }

        pub(crate) fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.url.to_string())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn round_trip(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
            let url = request.url.to_string();
            self.requests.lock().unwrap().push(request);
            let response = self
                .responses
                .lock()
                .unwrap()
                .get_mut(&url)
                .and_then(VecDeque::pop_front);
            Ok(response.unwrap_or(RawResponse {
                status: StatusCode::NOT_FOUND,
                body: Some(format!("no fake response for {url}").into_bytes()),
            }))
        }
    }

    pub(crate) fn client(transport: &Arc<FakeTransport>) -> BitbucketClient {
        BitbucketClient::with_transport(transport.clone(), Credentials::default().with_bearer("tok"))
            .with_base_url("https://api.example.test/2.0")
    }

    const REPOS: &str = "https://api.example.test/2.0/repositories/ws";

    #[tokio::test]
    async fn test_execute_merges_pages_and_authenticates_each() {
        let transport = Arc::new(FakeTransport::default());
        transport
            .respond_json(REPOS, json!({"values": ["A", "B"], "next": "https://api.example.test/2.0/repositories/ws?page=2", "pagelen": 2}))
            .respond_json(
                "https://api.example.test/2.0/repositories/ws?page=2",
                json!({"values": ["C"], "next": ""}),
            );

        let merged = client(&transport)
            .execute(Method::GET, REPOS, None)
            .await
            .unwrap();

        assert_eq!(merged, json!({"values": ["A", "B", "C"]}));
        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        for request in requests.iter() {
            assert_eq!(request.headers["authorization"], "Bearer tok");
        }
    }

    #[tokio::test]
    async fn test_page_len_only_on_initial_request() {
        let transport = Arc::new(FakeTransport::default());
        let next = "https://api.example.test/2.0/repositories/ws?page=2";
        transport
            .respond_json(
                &format!("{REPOS}?pagelen=50"),
                json!({"values": [1], "next": next}),
            )
            .respond_json(next, json!({"values": [2]}));

        let client = client(&transport).with_page_len(50);
        assert_eq!(client.page_len(), 50);
        let merged = client.execute(Method::GET, REPOS, None).await.unwrap();

        assert_eq!(merged["values"], json!([1, 2]));
        let urls = transport.urls();
        assert_eq!(urls[0], format!("{REPOS}?pagelen=50"));
        assert_eq!(urls[1], "https://api.example.test/2.0/repositories/ws?page=2");
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn test_default_page_len_leaves_url_unmodified() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond_json(REPOS, json!({"values": []}));

        client(&transport)
            .execute(Method::GET, REPOS, None)
            .await
            .unwrap();

        assert_eq!(transport.urls(), [REPOS]);
    }

    #[tokio::test]
    async fn test_execute_status_error() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(REPOS, 500, "upstream exploded");

        let err = client(&transport)
            .execute(Method::GET, REPOS, None)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_execute_rejects_non_json() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(REPOS, 200, "<html></html>");

        let err = client(&transport)
            .execute(Method::GET, REPOS, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidJson { ref body, .. } if body == b"<html></html>"));
    }

    #[tokio::test]
    async fn test_execute_raw_does_not_decode_error_body() {
        let transport = Arc::new(FakeTransport::default());
        let url = "https://api.example.test/2.0/repositories/ws/repo/src/main/README.md";
        transport.respond(url, 404, r#"{"type": "error", "error": {"message": "No such file"}}"#);

        let err = client(&transport)
            .execute_raw(Method::GET, url, None)
            .await
            .unwrap_err();

        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert!(body.contains("No such file"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_execute_empty_discards_body() {
        let transport = Arc::new(FakeTransport::default());
        let url = "https://api.example.test/2.0/repositories/ws/repo";
        transport.respond(url, 204, "");

        client(&transport)
            .execute_empty(Method::DELETE, url, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_body_is_sent_as_json() {
        let transport = Arc::new(FakeTransport::default());
        let url = "https://api.example.test/2.0/repositories/ws/repo/pipelines_config";
        transport.respond_json(url, json!({"type": "repository_pipelines_configuration", "enabled": true}));

        client(&transport)
            .execute(Method::PUT, url, Some(r#"{"enabled":true}"#))
            .await
            .unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].method, Method::PUT);
        assert_eq!(requests[0].headers["content-type"], "application/json");
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"enabled":true}"#));
    }

    #[tokio::test]
    async fn test_fetch_entity_error_envelope() {
        #[derive(Debug, serde::Deserialize)]
        struct Anything {}

        let transport = Arc::new(FakeTransport::default());
        transport.respond_json(REPOS, json!({"type": "error", "error": {"message": "Forbidden workspace"}}));

        let err = client(&transport)
            .fetch_entity::<Anything>(Method::GET, REPOS, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Domain(ref domain) if domain.message == "Forbidden workspace"));
    }

    #[tokio::test]
    async fn test_execute_error_envelope_on_first_page() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond_json(REPOS, json!({"type": "error", "error": {"message": "Forbidden workspace"}}));

        let err = client(&transport)
            .execute(Method::GET, REPOS, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Domain(ref domain) if domain.message == "Forbidden workspace"));
        assert_eq!(transport.urls(), [REPOS]);
    }

    #[test]
    fn test_request_url_joins_cleanly() {
        let transport = Arc::new(FakeTransport::default());
        let client = BitbucketClient::with_transport(transport, Credentials::none())
            .with_base_url("https://api.example.test/2.0/");
        assert_eq!(
            client.request_url("/repositories/ws"),
            "https://api.example.test/2.0/repositories/ws"
        );
        assert_eq!(client.request_url("user"), "https://api.example.test/2.0/user");
    }
}
