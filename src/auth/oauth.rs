//
//  bitbucket-api
//  auth/oauth.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # OAuth 2.0 Token Handling
//!
//! This module covers the token side of OAuth 2.0 for Bitbucket Cloud:
//! obtaining tokens from the token endpoint and keeping them fresh while a
//! client is in use. The interactive consent flow is not part of this crate;
//! callers that go through it hand the resulting authorization code to
//! [`OAuthClient::exchange_code`].
//!
//! ## Supported Grants
//!
//! - **Client credentials**: [`OAuthClient::client_credentials`]
//! - **Authorization code**: [`OAuthClient::exchange_code`]
//! - **Refresh token**: [`OAuthClient::refresh`]
//!
//! ## Refresh Discipline
//!
//! An [`OAuthSession`] may be shared by many concurrent requests. Refreshes
//! are serialized behind an async mutex; a caller that waited for another
//! refresh re-checks the token and skips its own exchange if the token is
//! already fresh.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bitbucket_api::api::transport::ReqwestTransport;
//! use bitbucket_api::auth::{Credentials, OAuthClient, OAuthSession};
//!
//! # async fn example() -> Result<(), bitbucket_api::api::common::ApiError> {
//! let transport = ReqwestTransport::new("bb-api", None)?;
//! let consumer = OAuthClient::new("client-id", "client-secret");
//! let token = consumer.client_credentials(&transport).await?;
//!
//! let credentials = Credentials::default().with_oauth(OAuthSession::new(consumer, token));
//! # Ok(())
//! # }
//! ```

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::basic_header;
use crate::api::common::ApiError;
use crate::api::transport::{classify, ApiRequest, Transport};

/// Bitbucket Cloud OAuth token endpoint.
pub const TOKEN_URL: &str = "https://bitbucket.org/site/oauth2/access_token";

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_LEEWAY_SECS: i64 = 10;

/// An OAuth 2.0 token as issued by the token endpoint.
///
/// # Example
///
/// ```rust
/// use bitbucket_api::auth::OAuthToken;
/// use chrono::{Duration, Utc};
///
/// let token = OAuthToken {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     token_type: "bearer".to_string(),
///     expires_at: Some(Utc::now() - Duration::hours(1)),
///     scopes: vec![],
/// };
///
/// assert!(token.is_expired());
/// assert!(!token.is_valid());
/// assert!(token.can_refresh());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthToken {
    /// The bearer token sent with API requests.
    pub access_token: String,

    /// Token used to obtain a new access token without re-authorization.
    pub refresh_token: Option<String>,

    /// The token type, normally `bearer`.
    pub token_type: String,

    /// When the access token stops being accepted; `None` means unknown.
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes granted to the token.
    pub scopes: Vec<String>,
}

impl OAuthToken {
    /// Creates a token with no expiry and no refresh token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "bearer".to_string(),
            expires_at: None,
            scopes: Vec::new(),
        }
    }

    /// Returns `true` once the token is within the expiry leeway.
    ///
    /// Tokens without an expiry never expire from the client's point of view.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - Duration::seconds(EXPIRY_LEEWAY_SECS) <= Utc::now())
    }

    /// Returns `true` if the token can be attached to a request.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Returns `true` if a refresh token is available.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Raw token endpoint response.
#[derive(Deserialize)]
struct TokenResponseRaw {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    scopes: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl From<TokenResponseRaw> for OAuthToken {
    fn from(raw: TokenResponseRaw) -> Self {
        let scopes = raw
            .scopes
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        Self {
            access_token: raw.access_token,
            refresh_token: raw.refresh_token,
            token_type: raw.token_type,
            expires_at: raw.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            scopes,
        }
    }
}

/// An OAuth consumer: the client id and secret registered with Bitbucket.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// The consumer key.
    pub client_id: String,
    /// The consumer secret.
    pub client_secret: String,
    /// Token endpoint; [`TOKEN_URL`] unless overridden.
    pub token_url: String,
}

impl OAuthClient {
    /// Creates a consumer targeting the Bitbucket Cloud token endpoint.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Points the consumer at a different token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Obtains a token with the client credentials grant.
    pub async fn client_credentials(&self, transport: &dyn Transport) -> Result<OAuthToken, ApiError> {
        self.request_token(transport, &[("grant_type", "client_credentials")])
            .await
    }

    /// Exchanges an authorization code for a token.
    pub async fn exchange_code(
        &self,
        transport: &dyn Transport,
        code: &str,
    ) -> Result<OAuthToken, ApiError> {
        self.request_token(
            transport,
            &[("grant_type", "authorization_code"), ("code", code)],
        )
        .await
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Bitbucket may or may not rotate the refresh token; when the response
    /// carries none, the one that was used is kept.
    pub async fn refresh(
        &self,
        transport: &dyn Transport,
        refresh_token: &str,
    ) -> Result<OAuthToken, ApiError> {
        let mut token = self
            .request_token(
                transport,
                &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
            )
            .await?;

        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }

    async fn request_token(
        &self,
        transport: &dyn Transport,
        params: &[(&str, &str)],
    ) -> Result<OAuthToken, ApiError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();

        let mut request = ApiRequest::form(&self.token_url, body)?;
        if let Some(value) = basic_header(&self.client_id, &self.client_secret) {
            request
                .headers
                .insert(reqwest::header::AUTHORIZATION, value);
        }

        let response = transport.round_trip(request).await?;
        let bytes = match classify(response, false) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(ApiError::EmptyBody),
            Err(ApiError::Status { status, body }) => {
                return Err(ApiError::TokenRefresh(format!("{status}: {body}")))
            }
            Err(err) => return Err(err),
        };

        let raw: TokenResponseRaw = serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::TokenRefresh(format!("Failed to parse token response: {err}")))?;
        Ok(raw.into())
    }
}

/// A live OAuth token together with the consumer able to refresh it.
#[derive(Debug)]
pub struct OAuthSession {
    client: OAuthClient,
    token: RwLock<OAuthToken>,
    refresh_lock: Mutex<()>,
}

impl OAuthSession {
    /// Wraps a token obtained from `client`.
    pub fn new(client: OAuthClient, token: OAuthToken) -> Self {
        Self {
            client,
            token: RwLock::new(token),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Returns a snapshot of the current token.
    pub fn token(&self) -> OAuthToken {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Refreshes the token if it has expired and can be refreshed.
    ///
    /// Expired tokens without a refresh token are left alone; requests then
    /// go out unauthenticated and the server rejects them.
    pub async fn refresh_if_expired(&self, transport: &dyn Transport) -> Result<(), ApiError> {
        if !self.needs_refresh() {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        let refresh_token = {
            let token = self.token.read().unwrap_or_else(PoisonError::into_inner);
            if !token.is_expired() || !token.can_refresh() {
                return Ok(());
            }
            token.refresh_token.clone().unwrap_or_default()
        };

        tracing::debug!("Refreshing expired OAuth access token");
        let fresh = self.client.refresh(transport, &refresh_token).await?;
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(())
    }

    fn needs_refresh(&self) -> bool {
        let token = self.token.read().unwrap_or_else(PoisonError::into_inner);
        token.is_expired() && token.can_refresh()
    }
}
