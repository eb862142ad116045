//
//  bitbucket-api
//  api/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # API Client Layer
//!
//! This module provides the HTTP client for the Bitbucket Cloud REST API.
//!
//! ## Architecture
//!
//! - [`client`]: Request execution, authentication and pagination entry points
//! - [`transport`]: The network seam and status classification
//! - [`common`]: Errors, response decoding, pagination and entity mapping
//! - [`cloud`]: Typed entities and endpoint wrappers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bitbucket_api::api::BitbucketClient;
//! use bitbucket_api::auth::Credentials;
//!
//! # async fn example() -> Result<(), bitbucket_api::api::ApiError> {
//! let client = BitbucketClient::new(Credentials::default().with_basic("user", "app-password"))?;
//! let repo = client.repositories().get("myworkspace", "backend").await?;
//! println!("{}", repo.full_name);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`ApiError`]. Non-2xx responses surface as
//! [`ApiError::Status`]; `{"type": "error"}` bodies surface as
//! [`ApiError::Domain`]. Nothing is retried.

/// Core HTTP client wrapper for the Bitbucket API.
pub mod client;

/// Bitbucket Cloud entities and endpoints.
pub mod cloud;

/// Shared error, decoding, pagination and mapping machinery.
pub mod common;

/// HTTP transport abstraction.
pub mod transport;

pub use client::{BitbucketClient, DEFAULT_BASE_URL};
pub use common::ApiError;
pub use transport::{ReqwestTransport, Transport};
