//
//  bitbucket-api
//  api/common/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Common API Types for the Bitbucket Cloud Client
//!
//! This module holds the pieces of the request pipeline that sit between the
//! wire and the typed endpoint wrappers: the error taxonomy, the response
//! decoder, the auto-paginator and the entity mapper.
//!
//! # Overview
//!
//! - [`ApiError`] - Unified error type for every operation in the crate
//! - [`DecodeError`] - A typed mapping failure naming the offending field
//! - [`DomainError`] - A server-reported `{"type": "error"}` envelope
//! - [`decode`] - Bytes to generic JSON, with a raw-bytes fallback
//! - [`pagination`] - Following `next` links and merging `values`
//! - [`mapper`] - Generic JSON to domain entities
//!
//! # Example
//!
//! ```rust
//! use bitbucket_api::api::common::ApiError;
//!
//! fn handle_result<T>(result: Result<T, ApiError>) {
//!     match result {
//!         Ok(_) => println!("Success!"),
//!         Err(ApiError::Domain(err)) => println!("Bitbucket said: {}", err.message),
//!         Err(ApiError::Status { status, .. }) => println!("HTTP {}", status),
//!         Err(e) => println!("Error: {}", e),
//!     }
//! }
//! ```

use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod decode;
pub mod mapper;
pub mod pagination;

pub use decode::*;
pub use mapper::*;
pub use pagination::*;

/// Unified error type for all Bitbucket API operations.
///
/// The variants fall into four families:
///
/// | Family | Variants |
/// |--------|----------|
/// | Transport | `Status`, `Network`, `InvalidUrl`, `EmptyBody` |
/// | Decode | `InvalidJson`, `Decode`, `Encode` |
/// | Pagination | `Pagination` |
/// | Domain | `Domain` |
///
/// Token refresh failures surface as `TokenRefresh`.
///
/// # Notes
///
/// - No variant is ever retried by the client; retry policy belongs to the caller
/// - The `Network` variant automatically converts from `reqwest::Error`
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-success status.
    ///
    /// The display form is the status line (e.g. `404 Not Found`). The body is
    /// kept verbatim and is never JSON-decoded.
    #[error("{status}")]
    Status {
        /// The HTTP status returned by the server
        status: StatusCode,
        /// The raw response body text
        body: String,
    },

    /// A network-level error occurred during the request.
    ///
    /// Covers connection failures, timeouts, DNS resolution errors and
    /// other transport-layer issues.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request URL could not be parsed.
    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        /// The offending URL string
        url: String,
        /// The parser error
        source: url::ParseError,
    },

    /// The response carried no body where one was expected.
    #[error("Response body is empty")]
    EmptyBody,

    /// The response body was not valid JSON.
    ///
    /// The raw bytes are kept so callers can still inspect the payload.
    #[error("Could not parse JSON payload: {source}")]
    InvalidJson {
        /// The parser error
        source: serde_json::Error,
        /// The undecoded response body
        body: Vec<u8>,
    },

    /// A decoded value did not match the shape of the requested entity.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A request body could not be serialized.
    #[error("Could not encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A followed `next` page did not look like a collection envelope.
    ///
    /// No partial result is ever returned alongside this error.
    #[error("Malformed pagination response: {0}")]
    Pagination(String),

    /// The server reported a domain-level failure via an error envelope.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Refreshing or obtaining an OAuth 2.0 token failed.
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),
}

impl ApiError {
    /// Returns the HTTP status for transport-level status failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` when the server answered `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// A generic value that could not be mapped onto a typed entity.
///
/// Produced by the entity mapper when a field has the wrong shape or a
/// required field is missing. The `path` names the field in dotted form
/// (`project.key`, `values[3].name`).
///
/// # Example
///
/// ```rust
/// use bitbucket_api::api::common::DecodeError;
///
/// let err = DecodeError {
///     target: "PipelineVariable",
///     path: "secured".to_string(),
///     message: "invalid type: string \"yes\", expected a boolean".to_string(),
/// };
///
/// assert!(err.to_string().contains("`secured`"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Could not decode {target}: field `{path}`: {message}")]
pub struct DecodeError {
    /// Name of the type being decoded.
    pub target: &'static str,

    /// Dotted path to the offending field (`.` for the root value).
    pub path: String,

    /// Expected versus actual shape, as reported by the deserializer.
    pub message: String,
}

/// A server-reported error envelope.
///
/// Bitbucket Cloud reports domain failures as:
///
/// ```json
/// {"type": "error", "error": {"message": "Repository not found", "detail": "...", "data": {}}}
/// ```
///
/// Some endpoints put `message` at the top level instead. Every field other
/// than the message and detail is kept in `context`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct DomainError {
    /// The human-readable message reported by the server.
    pub message: String,

    /// Optional longer explanation.
    pub detail: Option<String>,

    /// Additional fields carried by the envelope (`id`, `data`, `fields`, ...).
    pub context: Map<String, Value>,
}

impl DomainError {
    /// Builds a domain error from an error envelope mapping.
    ///
    /// The nested `error` object is preferred; top-level `message`/`detail`
    /// keys are used when it is absent. A missing message falls back to
    /// `"Unknown error"`.
    pub fn from_envelope(envelope: &Map<String, Value>) -> Self {
        let mut context = Map::new();
        let mut message = None;
        let mut detail = None;

        let mut absorb = |fields: &Map<String, Value>| {
            for (key, value) in fields {
                match (key.as_str(), value) {
                    ("type" | "error", _) => {}
                    ("message", Value::String(text)) if message.is_none() => {
                        message = Some(text.clone())
                    }
                    ("detail", Value::String(text)) if detail.is_none() => {
                        detail = Some(text.clone())
                    }
                    _ => {
                        context.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        };

        if let Some(Value::Object(inner)) = envelope.get("error") {
            absorb(inner);
        }
        absorb(envelope);

        Self {
            message: message.unwrap_or_else(|| "Unknown error".to_string()),
            detail,
            context,
        }
    }
}
