//
//  bitbucket-api
//  config/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Configuration Module
//!
//! Client settings loaded from a TOML file in the platform-specific
//! configuration directory, then overridden by environment variables.
//!
//! ## Configuration File Location
//!
//! - **Linux**: `~/.config/bb-api/config.toml`
//! - **macOS**: `~/Library/Application Support/bb-api/config.toml`
//! - **Windows**: `C:\Users\<User>\AppData\Roaming\bb-api\config.toml`
//!
//! ## Example Configuration File
//!
//! ```toml
//! base_url = "https://api.bitbucket.org/2.0"
//! page_len = 50
//! timeout_secs = 30
//!
//! [auth]
//! username = "myusername"
//! password = "app-password"
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `BITBUCKET_API_BASE_URL` | `base_url` |
//! | `BB_PAGE_LEN` | `page_len` |
//! | `BB_TIMEOUT` | `timeout_secs` |
//! | `BB_TOKEN` | `auth.token` |
//! | `BB_USERNAME` / `BB_PASSWORD` | `auth.username` / `auth.password` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::api::common::DEFAULT_PAGE_LEN;
use crate::api::DEFAULT_BASE_URL;
use crate::auth::Credentials;

/// Settings used to build a [`BitbucketClient`](crate::api::BitbucketClient).
///
/// Missing keys take their default value.
///
/// # Examples
///
/// ```rust
/// use bitbucket_api::config::ClientConfig;
///
/// let config = ClientConfig::default();
/// assert_eq!(config.base_url, "https://api.bitbucket.org/2.0");
/// assert_eq!(config.page_len, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, without trailing slash.
    pub base_url: String,

    /// Page length requested on collection requests. `100` leaves URLs as-is.
    pub page_len: u64,

    /// Per-request timeout in seconds. No timeout when unset.
    pub timeout_secs: Option<u64>,

    /// Value of the `User-Agent` header.
    pub user_agent: String,

    /// Credentials.
    pub auth: AuthConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_len: DEFAULT_PAGE_LEN,
            timeout_secs: None,
            user_agent: format!("{}/{}", crate::APP_NAME, crate::VERSION),
            auth: AuthConfig::default(),
        }
    }
}

/// The `[auth]` table.
///
/// When several forms are present the bearer token wins, then basic auth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Repository, project or workspace access token.
    pub token: Option<String>,

    /// Username for basic authentication.
    pub username: Option<String>,

    /// App password for basic authentication.
    pub password: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from the default location, then applies the
    /// process environment.
    ///
    /// A missing file, or a platform without a configuration directory,
    /// yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or an
    /// environment override is malformed.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) if path.exists() => Self::load_from(&path)?,
            Ok(_) => Self::default(),
            Err(err) => {
                tracing::debug!("{err:#}, using default configuration");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from a specific file, without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Returns the path to the configuration file.
    ///
    /// The file may not exist; this only returns where it would be.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", crate::APP_NAME)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// Empty variables are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(base_url) = var("BITBUCKET_API_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(page_len) = var("BB_PAGE_LEN") {
            self.page_len = page_len
                .parse()
                .with_context(|| format!("Invalid BB_PAGE_LEN: {page_len}"))?;
        }
        if let Some(timeout) = var("BB_TIMEOUT") {
            self.timeout_secs = Some(
                timeout
                    .parse()
                    .with_context(|| format!("Invalid BB_TIMEOUT: {timeout}"))?,
            );
        }
        if let Some(token) = var("BB_TOKEN") {
            self.auth.token = Some(token);
        }
        if let (Some(username), Some(password)) = (var("BB_USERNAME"), var("BB_PASSWORD")) {
            self.auth.username = Some(username);
            self.auth.password = Some(password);
        }

        Ok(())
    }

    /// Builds the credentials described by the `[auth]` table.
    pub fn credentials(&self) -> Credentials {
        let mut credentials = Credentials::none();
        if let Some(token) = &self.auth.token {
            credentials = credentials.with_bearer(token.as_str());
        }
        if let (Some(username), Some(password)) = (&self.auth.username, &self.auth.password) {
            credentials = credentials.with_basic(username.as_str(), password.as_str());
        }
        credentials
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
