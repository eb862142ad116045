//
//  bitbucket-api
//  api/transport.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # HTTP Transport
//!
//! The lowest layer of the client: one request in, one response out.
//!
//! The wire call sits behind the [`Transport`] trait so the rest of the
//! pipeline (authentication, pagination, mapping) can be exercised against an
//! in-memory fake. [`ReqwestTransport`] is the production implementation.
//!
//! Status classification is a separate step, see
//! [`classify`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use url::Url;

use super::common::ApiError;

/// An outgoing API request.
///
/// Built by the client, authenticated by [`Credentials`](crate::auth::Credentials),
/// then handed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// The HTTP method
    pub method: Method,
    /// The fully-qualified request URL
    pub url: Url,
    /// Request headers, including authentication once applied
    pub headers: HeaderMap,
    /// Optional request body
    pub body: Option<String>,
}

impl ApiRequest {
    /// Builds a request, tagging non-empty bodies as `application/json`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `url` cannot be parsed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bitbucket_api::api::transport::ApiRequest;
    /// use reqwest::Method;
    ///
    /// let request = ApiRequest::new(
    ///     Method::PUT,
    ///     "https://api.bitbucket.org/2.0/repositories/ws/repo/pipelines_config",
    ///     Some(r#"{"enabled": true}"#),
    /// )?;
    /// assert_eq!(request.headers["content-type"], "application/json");
    /// # Ok::<(), bitbucket_api::api::common::ApiError>(())
    /// ```
    pub fn new(method: Method, url: &str, body: Option<&str>) -> Result<Self, ApiError> {
        let url = Url::parse(url).map_err(|source| ApiError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut headers = HeaderMap::new();
        let body = body.filter(|text| !text.is_empty()).map(str::to_string);
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }

    /// Builds a `POST` request carrying a URL-encoded form body.
    pub fn form(url: &str, body: String) -> Result<Self, ApiError> {
        let mut request = Self::new(Method::POST, url, None)?;
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request.body = Some(body);
        Ok(request)
    }
}

/// A response as it came off the wire, before status classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status
    pub status: StatusCode,
    /// The response body, `None` when the transport received none at all
    pub body: Option<Vec<u8>>,
}

/// Performs the network call for a single request.
///
/// Implementations must be safe to share between concurrent callers and must
/// release the underlying connection before returning, whatever the outcome.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the unclassified response.
    ///
    /// # Errors
    ///
    /// Only network-level failures are errors here; any HTTP status,
    /// including 4xx/5xx, is a successful round trip.
    async fn round_trip(&self, request: ApiRequest) -> Result<RawResponse, ApiError>;
}

/// Classifies a raw response.
///
/// - Any 2xx status succeeds. With `accept_empty` the body is discarded and
///   `None` is returned; otherwise the body bytes are returned.
/// - Any other status fails with [`ApiError::Status`] holding the body text.
/// - A missing body where bytes were expected fails with [`ApiError::EmptyBody`].
pub fn classify(response: RawResponse, accept_empty: bool) -> Result<Option<Vec<u8>>, ApiError> {
    if !response.status.is_success() {
        let body = response
            .body
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        return Err(ApiError::Status {
            status: response.status,
            body,
        });
    }

    if accept_empty {
        return Ok(None);
    }

    response.body.map(Some).ok_or(ApiError::EmptyBody)
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the given user agent and optional timeout.
    ///
    /// The timeout bounds each individual request, including every page of a
    /// paginated fetch; it is the only cancellation mechanism the client offers.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        // Reading to the end hands the connection back to the pool.
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            body: Some(body.to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: Option<&str>) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.map(|text| text.as_bytes().to_vec()),
        }
    }

    #[test]
    fn test_request_without_body_has_no_content_type() {
        let request = ApiRequest::new(Method::GET, "https://api.bitbucket.org/2.0/user", Some(""))
            .unwrap();
        assert!(request.body.is_none());
        assert!(request.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_request_rejects_malformed_url() {
        let err = ApiRequest::new(Method::GET, "not a url", None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));
    }

    #[test]
    fn test_form_request_content_type() {
        let request = ApiRequest::form("https://bitbucket.org/site/oauth2/access_token", "a=b".into())
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.headers[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn test_classify_ok_and_created() {
        assert_eq!(
            classify(response(200, Some("{}")), false).unwrap(),
            Some(b"{}".to_vec())
        );
        assert_eq!(
            classify(response(201, Some("[]")), false).unwrap(),
            Some(b"[]".to_vec())
        );
    }

    #[test]
    fn test_classify_accept_empty_discards_body() {
        assert_eq!(classify(response(204, None), true).unwrap(), None);
        assert_eq!(classify(response(200, Some("ignored")), true).unwrap(), None);
    }

    #[test]
    fn test_classify_missing_body() {
        let err = classify(response(200, None), false).unwrap_err();
        assert!(matches!(err, ApiError::EmptyBody));
    }

    #[test]
    fn test_classify_status_error_keeps_raw_body() {
        let err = classify(response(403, Some("<html>denied</html>")), false).unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body, "<html>denied</html>");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
