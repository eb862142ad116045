//
//  bitbucket-api
//  api/cloud/repositories.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Cloud repository API types and endpoints.
//!
//! This module provides the repository entities returned by Bitbucket Cloud
//! and [`Repositories`], the endpoint wrapper obtained from
//! [`BitbucketClient::repositories`].
//!
//! # Example
//!
//! ```rust,no_run
//! use bitbucket_api::api::BitbucketClient;
//! use bitbucket_api::api::cloud::RepositoryOptions;
//! use bitbucket_api::auth::Credentials;
//!
//! # async fn example() -> Result<(), bitbucket_api::api::common::ApiError> {
//! let client = BitbucketClient::new(Credentials::default().with_bearer("token"))?;
//!
//! let repo = client
//!     .repositories()
//!     .create(&RepositoryOptions {
//!         owner: "myworkspace".to_string(),
//!         repo_slug: "backend-service".to_string(),
//!         is_private: Some(true),
//!         project: Some("BACKEND".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("Created {}", repo.full_name);
//! # Ok(())
//! # }
//! ```
//!
//! # Notes
//!
//! - Repository slugs are URL-safe versions of repository names
//! - The `full_name` field follows the format `{workspace}/{repo_slug}`
//! - Branch and ref listings return a single page with its metadata; follow
//!   `next` yourself or raise `pagelen`

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::client::BitbucketClient;
use crate::api::common::{decode, map_collection, ApiError};

/// A project inside a workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Short project key (e.g., `BACKEND`).
    pub key: String,

    /// Human-readable project name.
    pub name: String,
}

/// Represents a Bitbucket Cloud repository.
///
/// Fields missing from the response take their default value; nullable
/// fields are `Option`s.
///
/// # Example
///
/// ```rust,no_run
/// use bitbucket_api::api::cloud::Repository;
///
/// fn display_repo(repo: &Repository) {
///     println!("Repository: {}", repo.full_name);
///     println!("  Private: {}", repo.is_private);
///     if let Some(ref lang) = repo.language {
///         println!("  Language: {}", lang);
///     }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    /// Unique identifier for the repository (e.g., `{123e4567-e89b-...}`).
    pub uuid: String,

    /// Human-readable name of the repository.
    pub name: String,

    /// URL-safe identifier derived from the repository name.
    pub slug: String,

    /// Full path in format `{workspace_slug}/{repo_slug}`.
    pub full_name: String,

    /// Optional description of the repository's purpose.
    pub description: Option<String>,

    /// Version control system, always `git` nowadays.
    pub scm: String,

    /// Whether the repository is private.
    pub is_private: bool,

    /// `allow_forks`, `no_public_forks` or `no_forks`.
    pub fork_policy: String,

    /// Primary programming language.
    pub language: Option<String>,

    /// Whether the issue tracker is enabled.
    pub has_issues: bool,

    /// Whether the wiki is enabled.
    pub has_wiki: bool,

    /// Repository size in bytes.
    pub size: u64,

    /// The main branch, as returned by the server.
    pub mainbranch: Option<Map<String, Value>>,

    /// Project the repository belongs to.
    pub project: Option<Project>,

    /// Object type marker, always `repository`.
    #[serde(rename = "type")]
    pub kind: String,

    /// The user or team that owns this repository.
    pub owner: Map<String, Value>,

    /// Hypermedia links keyed by relation.
    pub links: Map<String, Value>,

    /// When the repository was created.
    pub created_on: Option<DateTime<Utc>>,

    /// When the repository was last updated.
    pub updated_on: Option<DateTime<Utc>>,
}

/// An entry of a source directory listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryFile {
    /// MIME type, present for files only.
    pub mimetype: Option<String>,

    /// Hypermedia links keyed by relation.
    pub links: Map<String, Value>,

    /// Path relative to the repository root.
    pub path: String,

    /// Commit the entry was read at.
    pub commit: Map<String, Value>,

    /// File attributes such as `binary`, `executable` or `lfs`.
    pub attributes: Vec<String>,

    /// `commit_file` or `commit_directory`.
    #[serde(rename = "type")]
    pub kind: String,

    /// File size in bytes.
    pub size: u64,
}

impl fmt::Display for RepositoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Raw file content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryBlob {
    /// The bytes exactly as served.
    pub content: Vec<u8>,
}

impl fmt::Display for RepositoryBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.content))
    }
}

/// A branch or tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryBranch {
    /// `branch` or `tag`.
    #[serde(rename = "type")]
    pub kind: String,

    /// The name of the ref (e.g., `main`, `feature/login`).
    pub name: String,

    /// Merge strategy applied by default to pull requests into this branch.
    pub default_merge_strategy: Option<String>,

    /// Merge strategies allowed for pull requests into this branch.
    pub merge_strategies: Vec<String>,

    /// Hypermedia links keyed by relation.
    pub links: Map<String, Value>,

    /// The commit the ref points at.
    pub target: Map<String, Value>,

    /// Heads of the branch, for Mercurial-era repositories.
    pub heads: Vec<Map<String, Value>>,
}

/// One page of a branch or ref listing, with its pagination metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryBranches {
    /// 1-based page number, `0` when the server omitted it.
    pub page: u64,

    /// Page length used by the server.
    pub pagelen: u64,

    /// Total number of refs, `0` when the server omitted it.
    pub size: u64,

    /// URL of the following page, empty on the last page.
    pub next: String,

    /// The refs on this page that could be decoded.
    pub branches: Vec<RepositoryBranch>,
}

impl RepositoryBranches {
    /// Builds a listing from a decoded page.
    ///
    /// Missing metadata defaults to zero; entries that fail to decode are
    /// skipped.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Domain`] for an error envelope
    /// - [`ApiError::Decode`] if the page is not a mapping or has no `values`
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let number = |key: &str| value.get(key).and_then(Value::as_u64).unwrap_or(0);

        let page = number("page");
        let pagelen = number("pagelen");
        let size = number("size");
        let next = value
            .get("next")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            page,
            pagelen,
            size,
            next,
            branches: map_collection(value)?,
        })
    }
}

/// Identifies a repository and, for [`Repositories::create`], its settings.
///
/// Unset options are left out of the request body.
#[derive(Debug, Clone, Default)]
pub struct RepositoryOptions {
    /// Workspace slug or UUID.
    pub owner: String,

    /// Repository slug.
    pub repo_slug: String,

    /// Source control system, `git` in practice.
    pub scm: Option<String>,

    /// Whether the repository is hidden from the public.
    pub is_private: Option<bool>,

    /// Free-form description.
    pub description: Option<String>,

    /// `allow_forks`, `no_public_forks` or `no_forks`.
    pub fork_policy: Option<String>,

    /// Main programming language, lowercase.
    pub language: Option<String>,

    /// Enables the issue tracker.
    pub has_issues: Option<bool>,

    /// Enables the wiki.
    pub has_wiki: Option<bool>,

    /// Key of the project to create the repository in.
    pub project: Option<String>,
}

impl RepositoryOptions {
    /// Options naming a repository and nothing else.
    pub fn new(owner: impl Into<String>, repo_slug: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo_slug: repo_slug.into(),
            ..Default::default()
        }
    }
}

/// Locates a file at a given ref.
#[derive(Debug, Clone, Default)]
pub struct RepositoryBlobOptions {
    /// Workspace slug or UUID.
    pub owner: String,

    /// Repository slug.
    pub repo_slug: String,

    /// Branch, tag or commit hash.
    pub git_ref: String,

    /// Path of the file relative to the repository root.
    pub path: String,
}

/// Filters for branch and ref listings.
#[derive(Debug, Clone, Default)]
pub struct RepositoryBranchOptions {
    /// Workspace slug or UUID.
    pub owner: String,

    /// Repository slug.
    pub repo_slug: String,

    /// BBQL filter, e.g. `name ~ "feature/"`.
    pub query: Option<String>,

    /// Field to sort by, prefix with `-` for descending.
    pub sort: Option<String>,

    /// Page to fetch, 1-based.
    pub page: Option<u64>,

    /// Page length to request.
    pub pagelen: Option<u64>,
}

impl RepositoryBranchOptions {
    fn query_string(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(q) = self.query.as_deref().filter(|q| !q.is_empty()) {
            query.append_pair("q", q);
        }
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            query.append_pair("sort", sort);
        }
        if let Some(page) = self.page.filter(|&p| p > 0) {
            query.append_pair("page", &page.to_string());
        }
        if let Some(pagelen) = self.pagelen.filter(|&p| p > 0) {
            query.append_pair("pagelen", &pagelen.to_string());
        }
        query.finish()
    }
}

#[derive(Serialize)]
struct ProjectKey<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct CreateRepositoryBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    scm: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fork_policy: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    has_issues: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    has_wiki: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<ProjectKey<'a>>,
}

impl<'a> From<&'a RepositoryOptions> for CreateRepositoryBody<'a> {
    fn from(options: &'a RepositoryOptions) -> Self {
        Self {
            scm: options.scm.as_deref(),
            is_private: options.is_private,
            description: options.description.as_deref(),
            fork_policy: options.fork_policy.as_deref(),
            language: options.language.as_deref(),
            has_issues: options.has_issues,
            has_wiki: options.has_wiki,
            project: options.project.as_deref().map(|key| ProjectKey { key }),
        }
    }
}

/// Serializes a request body.
pub(crate) fn to_body<T: Serialize>(body: &T) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(ApiError::Encode)
}

/// Repository endpoints.
///
/// Borrowed from a client with [`BitbucketClient::repositories`]; pipeline
/// configuration lives here too, see [`super::pipelines`].
#[derive(Debug, Clone, Copy)]
pub struct Repositories<'a> {
    pub(crate) client: &'a BitbucketClient,
}

impl<'a> Repositories<'a> {
    pub(crate) fn new(client: &'a BitbucketClient) -> Self {
        Self { client }
    }

    /// Builds `/repositories/{owner}/{slug}{suffix}` against the base URL.
    pub(crate) fn url(&self, owner: &str, repo_slug: &str, suffix: &str) -> String {
        self.client
            .request_url(&format!("/repositories/{owner}/{repo_slug}{suffix}"))
    }

    /// Creates a repository.
    pub async fn create(&self, options: &RepositoryOptions) -> Result<Repository, ApiError> {
        let body = to_body(&CreateRepositoryBody::from(options))?;
        let url = self.url(&options.owner, &options.repo_slug, "");
        self.client
            .fetch_entity(Method::POST, &url, Some(&body))
            .await
    }

    /// Fetches a repository.
    pub async fn get(&self, owner: &str, repo_slug: &str) -> Result<Repository, ApiError> {
        let url = self.url(owner, repo_slug, "");
        self.client.fetch_entity(Method::GET, &url, None).await
    }

    /// Deletes a repository.
    pub async fn delete(&self, owner: &str, repo_slug: &str) -> Result<(), ApiError> {
        let url = self.url(owner, repo_slug, "");
        self.client.execute_empty(Method::DELETE, &url, None).await
    }

    /// Lists the root directory of the main branch, across all pages.
    pub async fn list_files(
        &self,
        owner: &str,
        repo_slug: &str,
    ) -> Result<Vec<RepositoryFile>, ApiError> {
        let url = self.url(owner, repo_slug, "/src");
        self.client.fetch_collection(Method::GET, &url, None).await
    }

    /// Downloads a file's raw content.
    pub async fn get_file_blob(
        &self,
        options: &RepositoryBlobOptions,
    ) -> Result<RepositoryBlob, ApiError> {
        let suffix = format!(
            "/src/{}/{}",
            options.git_ref.trim_matches('/'),
            options.path.trim_start_matches('/')
        );
        let url = self.url(&options.owner, &options.repo_slug, &suffix);
        let content = self.client.execute_raw(Method::GET, &url, None).await?;
        Ok(RepositoryBlob { content })
    }

    /// Lists one page of branches.
    pub async fn list_branches(
        &self,
        options: &RepositoryBranchOptions,
    ) -> Result<RepositoryBranches, ApiError> {
        self.list_ref_page("/refs/branches", options).await
    }

    /// Lists one page of branches and tags.
    pub async fn list_refs(
        &self,
        options: &RepositoryBranchOptions,
    ) -> Result<RepositoryBranches, ApiError> {
        self.list_ref_page("/refs", options).await
    }

    /// Lists the users watching a repository, across all pages.
    pub async fn list_watchers(&self, owner: &str, repo_slug: &str) -> Result<Value, ApiError> {
        let url = self.url(owner, repo_slug, "/watchers");
        self.client.execute(Method::GET, &url, None).await
    }

    /// Lists the forks of a repository, across all pages.
    pub async fn list_forks(&self, owner: &str, repo_slug: &str) -> Result<Value, ApiError> {
        let url = self.url(owner, repo_slug, "/forks");
        self.client.execute(Method::GET, &url, None).await
    }

    async fn list_ref_page(
        &self,
        suffix: &str,
        options: &RepositoryBranchOptions,
    ) -> Result<RepositoryBranches, ApiError> {
        let mut url = self.url(&options.owner, &options.repo_slug, suffix);
        let query = options.query_string();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let bytes = self.client.execute_raw(Method::GET, &url, None).await?;
        RepositoryBranches::from_value(decode(bytes).into_json()?)
    }
}
