//
//  bitbucket-api
//  api/common/decode.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Response decoding.
//!
//! Turns raw response bytes into a generic [`serde_json::Value`]. Parsing is a
//! soft failure: some endpoints (raw file contents, for instance) return bodies
//! that are not JSON, so the undecoded bytes are handed back alongside the
//! parser error instead of being thrown away.

use serde_json::Value;

use super::ApiError;

/// The outcome of decoding a response body.
#[derive(Debug)]
pub enum Decoded {
    /// The body parsed as JSON.
    Json(Value),

    /// The body was not JSON; the bytes are returned untouched.
    Raw {
        /// The undecoded body
        bytes: Vec<u8>,
        /// Why parsing failed
        error: serde_json::Error,
    },
}

impl Decoded {
    /// Converts the outcome into a hard result for typed-fetch paths.
    ///
    /// `Raw` becomes [`ApiError::InvalidJson`], which still carries the bytes.
    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Raw { bytes, error } => Err(ApiError::InvalidJson {
                source: error,
                body: bytes,
            }),
        }
    }
}

/// Parses a response body as JSON, falling back to the raw bytes.
///
/// # Example
///
/// ```rust
/// use bitbucket_api::api::common::{decode, Decoded};
///
/// assert!(matches!(decode(br#"{"slug": "repo"}"#.to_vec()), Decoded::Json(_)));
/// assert!(matches!(decode(b"fn main() {}".to_vec()), Decoded::Raw { .. }));
/// ```
pub fn decode(bytes: Vec<u8>) -> Decoded {
    match serde_json::from_slice(&bytes) {
        Ok(value) => Decoded::Json(value),
        Err(error) => {
            tracing::warn!("Could not unmarshal JSON payload, returning raw response: {error}");
            Decoded::Raw { bytes, error }
        }
    }
}
