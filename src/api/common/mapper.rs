//
//  bitbucket-api
//  api/common/mapper.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Entity mapping.
//!
//! Converts generic JSON values into typed domain entities. Fields correspond
//! by name (serde derive, with `rename` where Bitbucket's keys differ from the
//! Rust identifiers); unknown keys are ignored and entities declare their own
//! defaults for missing keys.
//!
//! Two checks run before any field is looked at:
//!
//! - a mapping with `"type": "error"` is a [`DomainError`], never an entity
//! - a shape mismatch fails with a [`DecodeError`] naming the field path
//!
//! Collection mapping is lenient per element: an element that cannot be
//! decoded is logged and skipped while the rest of the list is returned.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{ApiError, DecodeError, DomainError};

/// Returns `true` if the value is a mapping carrying `"type": "error"`.
pub fn is_error_envelope(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("error")
}

/// Describes the shape of a generic value for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Maps a single generic value onto the entity type `T`.
///
/// # Errors
///
/// - [`ApiError::Domain`] if the value is an error envelope
/// - [`ApiError::Decode`] if a field has the wrong shape or is required and missing
///
/// # Example
///
/// ```rust
/// use bitbucket_api::api::cloud::PipelineVariable;
/// use bitbucket_api::api::common::map_entity;
/// use serde_json::json;
///
/// let variable: PipelineVariable = map_entity(json!({
///     "type": "pipeline_variable",
///     "key": "DEPLOY_ENV",
///     "value": "production",
///     "secured": false
/// }))?;
/// assert_eq!(variable.key, "DEPLOY_ENV");
/// # Ok::<(), bitbucket_api::api::common::ApiError>(())
/// ```
pub fn map_entity<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    if let Value::Object(envelope) = &value {
        if is_error_envelope(&value) {
            return Err(DomainError::from_envelope(envelope).into());
        }
    }

    Ok(deserialize_entity(value)?)
}

/// Maps the `values` of a collection envelope onto a list of `T`.
///
/// The envelope's own error marker always aborts. Elements that fail to
/// decode, including per-element error envelopes, are skipped with a warning.
///
/// # Errors
///
/// - [`ApiError::Domain`] if the envelope is an error envelope
/// - [`ApiError::Decode`] if the value is not a mapping or `values` is not a sequence
pub fn map_collection<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    let mut envelope = expect_mapping::<T>(value)?;

    if envelope.get("type").and_then(Value::as_str) == Some("error") {
        return Err(DomainError::from_envelope(&envelope).into());
    }

    let values = match envelope.remove("values") {
        Some(Value::Array(values)) => values,
        Some(other) => {
            return Err(DecodeError {
                target: type_label::<T>(),
                path: "values".to_string(),
                message: format!("expected a sequence, found {}", value_kind(&other)),
            }
            .into())
        }
        None => {
            return Err(DecodeError {
                target: type_label::<T>(),
                path: "values".to_string(),
                message: "missing field `values`".to_string(),
            }
            .into())
        }
    };

    Ok(map_elements(values))
}

/// Maps each element independently, dropping the ones that do not decode.
pub fn map_elements<T: DeserializeOwned>(values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            if is_error_envelope(&item) {
                tracing::warn!(index, "Skipping error envelope inside collection");
                return None;
            }
            match deserialize_entity::<T>(item) {
                Ok(entity) => Some(entity),
                Err(err) => {
                    tracing::warn!(index, "Skipping undecodable collection element: {err}");
                    None
                }
            }
        })
        .collect()
}

/// Unwraps a mapping, or reports the actual shape as a decode error.
pub(crate) fn expect_mapping<T>(value: Value) -> Result<Map<String, Value>, DecodeError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError {
            target: type_label::<T>(),
            path: ".".to_string(),
            message: format!("expected a mapping, found {}", value_kind(&other)),
        }),
    }
}

fn deserialize_entity<T: DeserializeOwned>(value: Value) -> Result<T, DecodeError> {
    serde_path_to_error::deserialize(value).map_err(|err| DecodeError {
        target: type_label::<T>(),
        path: err.path().to_string(),
        message: err.inner().to_string(),
    })
}

fn type_label<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
