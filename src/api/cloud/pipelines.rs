//
//  bitbucket-api
//  api/cloud/pipelines.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Cloud pipelines configuration types and endpoints.
//!
//! Bitbucket Pipelines is configured per repository: it can be switched on
//! and off, given repository variables, and given the SSH key pair used by
//! builds. These endpoints hang off [`Repositories`].
//!
//! # Example
//!
//! ```rust,no_run
//! use bitbucket_api::api::BitbucketClient;
//! use bitbucket_api::api::cloud::PipelineVariableOptions;
//! use bitbucket_api::auth::Credentials;
//!
//! # async fn example() -> Result<(), bitbucket_api::api::common::ApiError> {
//! let client = BitbucketClient::new(Credentials::default().with_bearer("token"))?;
//! let repos = client.repositories();
//!
//! repos.update_pipeline_config("myworkspace", "backend", true).await?;
//! repos
//!     .add_pipeline_variable(&PipelineVariableOptions {
//!         owner: "myworkspace".to_string(),
//!         repo_slug: "backend".to_string(),
//!         key: "DEPLOY_TOKEN".to_string(),
//!         value: "secret-token-value".to_string(),
//!         secured: true,
//!         ..Default::default()
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Notes
//!
//! - Secured variables are masked with `***` in pipeline logs and their
//!   value is never returned by the API
//! - Variable keys should follow environment variable naming conventions

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::repositories::{to_body, Repositories, Repository};
use crate::api::common::ApiError;

/// Pipelines configuration of a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    /// Object type marker, `repository_pipelines_configuration`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether Pipelines is enabled.
    pub enabled: bool,

    /// The repository the configuration belongs to.
    pub repository: Option<Repository>,
}

/// A repository-level pipeline variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineVariable {
    /// Object type marker, `pipeline_variable`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Unique identifier for the variable (includes curly braces).
    pub uuid: String,

    /// The name of the variable.
    pub key: String,

    /// The value of the variable, empty when `secured`.
    pub value: String,

    /// Whether this variable's value is masked in logs.
    pub secured: bool,
}

/// The SSH key pair used by pipeline builds.
///
/// The private key is write-only: responses carry the public key alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineKeyPair {
    /// Object type marker, `pipeline_ssh_key_pair`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Unique identifier for the key pair, usually absent.
    pub uuid: String,

    /// OpenSSH public key.
    pub public_key: String,

    /// Private key, never returned by the server.
    pub private_key: String,
}

/// A variable to add to a repository.
#[derive(Debug, Clone, Default)]
pub struct PipelineVariableOptions {
    /// Workspace slug or UUID.
    pub owner: String,

    /// Repository slug.
    pub repo_slug: String,

    /// Client-chosen UUID, generated by the server when unset.
    pub uuid: Option<String>,

    /// The name of the variable.
    pub key: String,

    /// The value of the variable.
    pub value: String,

    /// Masks the value in logs and responses.
    pub secured: bool,
}

/// A key pair to install on a repository.
#[derive(Debug, Clone, Default)]
pub struct PipelineKeyPairOptions {
    /// Workspace slug or UUID.
    pub owner: String,

    /// Repository slug.
    pub repo_slug: String,

    /// Private key in OpenSSH format, sent only when non-empty.
    pub private_key: Option<String>,

    /// Matching public key, sent only when non-empty.
    pub public_key: Option<String>,
}

#[derive(Serialize)]
struct PipelineConfigBody {
    enabled: bool,
}

#[derive(Serialize)]
struct PipelineVariableBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<&'a str>,
    key: &'a str,
    value: &'a str,
    secured: bool,
}

#[derive(Serialize)]
struct PipelineKeyPairBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    private_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_key: Option<&'a str>,
}

impl Repositories<'_> {
    /// Enables or disables Pipelines for a repository.
    pub async fn update_pipeline_config(
        &self,
        owner: &str,
        repo_slug: &str,
        enabled: bool,
    ) -> Result<Pipeline, ApiError> {
        let body = to_body(&PipelineConfigBody { enabled })?;
        let url = self.url(owner, repo_slug, "/pipelines_config");
        self.client
            .fetch_entity(Method::PUT, &url, Some(&body))
            .await
    }

    /// Adds a repository variable.
    pub async fn add_pipeline_variable(
        &self,
        options: &PipelineVariableOptions,
    ) -> Result<PipelineVariable, ApiError> {
        let body = to_body(&PipelineVariableBody {
            uuid: options.uuid.as_deref().filter(|uuid| !uuid.is_empty()),
            key: &options.key,
            value: &options.value,
            secured: options.secured,
        })?;
        let url = self.url(
            &options.owner,
            &options.repo_slug,
            "/pipelines_config/variables/",
        );
        self.client
            .fetch_entity(Method::POST, &url, Some(&body))
            .await
    }

    /// Installs the SSH key pair used by builds, replacing any existing one.
    pub async fn add_pipeline_key_pair(
        &self,
        options: &PipelineKeyPairOptions,
    ) -> Result<PipelineKeyPair, ApiError> {
        let body = to_body(&PipelineKeyPairBody {
            private_key: options.private_key.as_deref().filter(|k| !k.is_empty()),
            public_key: options.public_key.as_deref().filter(|k| !k.is_empty()),
        })?;
        let url = self.url(
            &options.owner,
            &options.repo_slug,
            "/pipelines_config/ssh/key_pair",
        );
        self.client
            .fetch_entity(Method::PUT, &url, Some(&body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::{client, FakeTransport};
    use serde_json::json;
    use std::sync::Arc;

    const CONFIG: &str = "https://api.example.test/2.0/repositories/ws/repo/pipelines_config";

    fn sent_body(transport: &FakeTransport) -> serde_json::Value {
        let requests = transport.requests.lock().unwrap();
        let body = requests.last().and_then(|r| r.body.as_deref()).unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn test_update_pipeline_config() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond_json(
            CONFIG,
            json!({
                "type": "repository_pipelines_configuration",
                "enabled": true,
                "repository": {"type": "repository", "full_name": "ws/repo"}
            }),
        );

        let pipeline = client(&transport)
            .repositories()
            .update_pipeline_config("ws", "repo", true)
            .await
            .unwrap();

        assert!(pipeline.enabled);
        assert_eq!(pipeline.repository.unwrap().full_name, "ws/repo");
        assert_eq!(sent_body(&transport), json!({"enabled": true}));
    }

    #[tokio::test]
    async fn test_add_pipeline_variable_omits_empty_uuid() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond_json(
            &format!("{CONFIG}/variables/"),
            json!({"type": "pipeline_variable", "uuid": "{v-1}", "key": "TOKEN", "secured": true}),
        );

        let variable = client(&transport)
            .repositories()
            .add_pipeline_variable(&PipelineVariableOptions {
                owner: "ws".to_string(),
                repo_slug: "repo".to_string(),
                uuid: Some(String::new()),
                key: "TOKEN".to_string(),
                value: "s3cret".to_string(),
                secured: true,
            })
            .await
            .unwrap();

        assert_eq!(variable.uuid, "{v-1}");
        assert!(variable.value.is_empty());
        assert_eq!(
            sent_body(&transport),
            json!({"key": "TOKEN", "value": "s3cret", "secured": true})
        );
    }

    #[tokio::test]
    async fn test_add_pipeline_key_pair_error_envelope() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond_json(
            &format!("{CONFIG}/ssh/key_pair"),
            json!({
                "type": "error",
                "error": {"message": "Invalid key pair", "detail": "Private key is not in PEM format"}
            }),
        );

        let err = client(&transport)
            .repositories()
            .add_pipeline_key_pair(&PipelineKeyPairOptions {
                owner: "ws".to_string(),
                repo_slug: "repo".to_string(),
                private_key: Some("garbage".to_string()),
                public_key: None,
            })
            .await
            .unwrap_err();

        match err {
            ApiError::Domain(domain) => {
                assert_eq!(domain.message, "Invalid key pair");
                assert_eq!(domain.detail.as_deref(), Some("Private key is not in PEM format"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sent_body(&transport), json!({"private_key": "garbage"}));
    }
}
