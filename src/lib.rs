//
//  bitbucket-api
//  lib.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Bitbucket API Client Library
//!
//! An asynchronous client for the Bitbucket Cloud REST API v2.0, plus the
//! `bb-api` binary built on top of it.
//!
//! ## Overview
//!
//! Every request travels through the same pipeline:
//!
//! ```text
//! Authenticator -> Transport -> Response Decoder -> Paginator -> Entity Mapper
//! ```
//!
//! - The authenticator attaches a bearer token, basic credentials or an
//!   OAuth 2.0 access token, refreshing expired OAuth tokens first
//! - The transport performs the HTTP call and classifies the status
//! - The decoder turns the body into JSON, falling back to raw bytes
//! - The paginator follows `next` links and merges every page's `values`
//! - The mapper turns JSON into typed entities, surfacing `{"type": "error"}`
//!   bodies as domain errors
//!
//! ## Module Structure
//!
//! - [`api`]: Client, transport, pagination, decoding and entities
//! - [`auth`]: Credentials and OAuth 2.0 token handling
//! - [`config`]: Configuration file and environment overrides
//! - [`cli`]: Command-line interface definitions using clap
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bitbucket_api::api::BitbucketClient;
//! use bitbucket_api::config::ClientConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::load()?;
//! let client = BitbucketClient::from_config(&config)?;
//!
//! let forks = client.repositories().list_forks("myworkspace", "backend").await?;
//! println!("{} forks", forks["values"].as_array().map_or(0, Vec::len));
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions.
pub mod cli;

/// API client for Bitbucket Cloud.
///
/// Handles authentication, request building, pagination, decoding and
/// entity mapping.
pub mod api;

/// Authentication and credential management.
///
/// Handles bearer tokens, basic auth with app passwords, and OAuth 2.0
/// tokens with refresh.
pub mod auth;

/// Configuration file management.
///
/// Settings are stored in platform-specific locations:
/// - Linux: `~/.config/bb-api/config.toml`
/// - macOS: `~/Library/Application Support/bb-api/config.toml`
/// - Windows: `%APPDATA%\bb-api\config.toml`
pub mod config;

pub use api::{ApiError, BitbucketClient};
pub use cli::Cli;
pub use config::ClientConfig;

/// Application name, used for the binary, the user agent and configuration paths.
pub const APP_NAME: &str = "bb-api";

/// Application version, derived from Cargo.toml at compile time.
///
/// # Example
///
/// ```rust
/// use bitbucket_api::VERSION;
///
/// println!("bb-api version {}", VERSION);
/// ```
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes for the CLI.
///
/// Standardized exit codes following Unix conventions, allowing scripts
/// to programmatically detect the outcome of a request.
///
/// # Exit Code Ranges
///
/// - `0`: Success
/// - `1-3`: General errors and usage issues
/// - `4-7`: Authentication-related issues
/// - `8-15`: Resource-related issues
/// - `32+`: External service issues
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;

    /// General error. Check stderr for details.
    pub const ERROR: i32 = 1;

    /// Invalid usage or arguments, as reported by the argument parser.
    pub const USAGE: i32 = 2;

    /// Authentication required or failed (401/403, or an OAuth refresh failure).
    pub const AUTH_ERROR: i32 = 4;

    /// Resource not found (404).
    pub const NOT_FOUND: i32 = 8;

    /// API rate limit exceeded (429).
    pub const RATE_LIMIT: i32 = 32;
}
