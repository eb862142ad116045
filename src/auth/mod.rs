//
//  bitbucket-api
//  auth/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Authentication Module
//!
//! This module decides which credential goes on an outgoing request and
//! writes the matching `Authorization` header.
//!
//! ## Supported Authentication Methods
//!
//! - **Bearer token**: a repository, project or workspace access token.
//! - **Basic authentication**: username plus app password.
//! - **OAuth 2.0**: an access token with optional expiry and refresh token,
//!   see [`OAuthSession`].
//!
//! ## Precedence
//!
//! A [`Credentials`] set may hold more than one form (for example a token from
//! the environment and a username from the config file). Exactly one is
//! attached, in this order:
//!
//! 1. bearer token, if non-empty
//! 2. basic auth, if both username and password are non-empty
//! 3. the OAuth 2.0 access token, if it is still valid
//!
//! Nothing is attached when none applies; the server then rejects the request.
//!
//! ## Example
//!
//! ```rust
//! use bitbucket_api::auth::{AuthCredential, Credentials};
//!
//! let credentials = Credentials::default()
//!     .with_basic("octocat", "app-password")
//!     .with_bearer("repo-access-token");
//!
//! assert!(matches!(credentials.active(), Some(AuthCredential::Bearer { .. })));
//! ```

mod oauth;

pub use oauth::*;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::api::common::ApiError;
use crate::api::transport::Transport;

/// The single credential form attached to a request.
///
/// Returned by [`Credentials::active`] once precedence has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthCredential {
    /// Bearer token authentication.
    Bearer {
        /// The access token.
        token: String,
    },
    /// HTTP Basic authentication.
    Basic {
        /// The Bitbucket username.
        username: String,
        /// The app password.
        password: String,
    },
    /// An OAuth 2.0 access token.
    OAuth {
        /// The access token, sent as a bearer token.
        access_token: String,
    },
}

impl AuthCredential {
    /// Builds the `Authorization` header value for this credential.
    ///
    /// Returns `None` if the credential contains bytes that cannot appear in
    /// a header.
    pub fn header_value(&self) -> Option<HeaderValue> {
        match self {
            Self::Bearer { token } => bearer_header(token),
            Self::Basic { username, password } => basic_header(username, password),
            Self::OAuth { access_token } => bearer_header(access_token),
        }
    }
}

/// The credentials owned by a client.
///
/// Immutable after construction, except that an OAuth 2.0 token is replaced
/// when it is refreshed.
#[derive(Debug, Default)]
pub struct Credentials {
    bearer_token: Option<String>,
    basic: Option<(String, String)>,
    oauth: Option<OAuthSession>,
}

impl Credentials {
    /// Credentials that attach nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the bearer token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Sets the basic auth username and password.
    pub fn with_basic(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic = Some((username.into(), password.into()));
        self
    }

    /// Sets the OAuth 2.0 session.
    pub fn with_oauth(mut self, session: OAuthSession) -> Self {
        self.oauth = Some(session);
        self
    }

    /// Returns the OAuth 2.0 session, if one is configured.
    pub fn oauth(&self) -> Option<&OAuthSession> {
        self.oauth.as_ref()
    }

    /// Resolves precedence and returns the credential that would be attached.
    pub fn active(&self) -> Option<AuthCredential> {
        if let Some(token) = self.bearer_token.as_deref().filter(|t| !t.is_empty()) {
            return Some(AuthCredential::Bearer {
                token: token.to_string(),
            });
        }

        if let Some((username, password)) = &self.basic {
            if !username.is_empty() && !password.is_empty() {
                return Some(AuthCredential::Basic {
                    username: username.clone(),
                    password: password.clone(),
                });
            }
        }

        self.oauth
            .as_ref()
            .map(OAuthSession::token)
            .filter(OAuthToken::is_valid)
            .map(|token| AuthCredential::OAuth {
                access_token: token.access_token,
            })
    }

    /// Writes the `Authorization` header for the active credential.
    ///
    /// Leaves the headers untouched when no credential applies.
    pub fn authenticate(&self, headers: &mut HeaderMap) {
        let Some(credential) = self.active() else {
            tracing::debug!("No usable credentials, sending unauthenticated request");
            return;
        };

        match credential.header_value() {
            Some(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            None => tracing::warn!("Credential is not a valid header value, skipping authentication"),
        }
    }

    /// Refreshes the OAuth 2.0 token when it is the credential in effect and
    /// has expired.
    pub async fn refresh_if_expired(&self, transport: &dyn Transport) -> Result<(), ApiError> {
        let Some(session) = &self.oauth else {
            return Ok(());
        };

        if matches!(
            self.active(),
            Some(AuthCredential::Bearer { .. } | AuthCredential::Basic { .. })
        ) {
            return Ok(());
        }

        session.refresh_if_expired(transport).await
    }
}

fn bearer_header(token: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}

pub(crate) fn basic_header(username: &str, password: &str) -> Option<HeaderValue> {
    let encoded = STANDARD.encode(format!("{username}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}
