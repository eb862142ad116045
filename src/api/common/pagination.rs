//
//  bitbucket-api
//  api/common/pagination.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Auto-pagination for Bitbucket Cloud collection envelopes.
//!
//! Bitbucket Cloud wraps every collection in an envelope:
//!
//! ```json
//! {
//!     "values": [ ... ],
//!     "page": 1,
//!     "pagelen": 10,
//!     "size": 25,
//!     "next": "https://api.bitbucket.org/2.0/repositories/ws?page=2"
//! }
//! ```
//!
//! [`fetch_all_pages`] follows `next` links until they run out and returns a
//! single envelope whose `values` hold every page's items in page order.
//! The transient `page`, `pagelen`, `size` and exhausted `next` fields are
//! stripped from the merged result.
//!
//! # Notes
//!
//! - Pages are fetched strictly one after another; there is no prefetching
//! - `next` URLs are followed verbatim, the server owns continuation state
//! - There is no page-count cap, but a `next` link that points back to an
//!   already fetched page is reported as an error instead of looping forever
//! - Either every page is merged or an error is returned; partial results are
//!   never handed out

use std::collections::HashSet;
use std::future::Future;

use serde_json::{Map, Value};
use url::Url;

use super::{value_kind, ApiError, DomainError};

/// The page length Bitbucket applies when none is requested.
pub const DEFAULT_PAGE_LEN: u64 = 100;

/// Pagination bookkeeping fields removed from merged envelopes.
const TRANSIENT_FIELDS: [&str; 4] = ["page", "pagelen", "size", "next"];

/// Returns `true` for collection-style resource paths.
pub fn is_collection_path(url: &Url) -> bool {
    url.path().contains("/repositories/")
}

/// Adds `pagelen=<page_len>` to an initial collection request URL.
///
/// The URL is returned unchanged when the page length is the default, when
/// the path is not a collection-style path, or when the caller already asked
/// for a specific `pagelen`.
///
/// # Example
///
/// ```rust
/// use bitbucket_api::api::common::apply_page_len;
///
/// let url = "https://api.bitbucket.org/2.0/repositories/ws";
/// assert_eq!(apply_page_len(url, 100)?, url);
/// assert_eq!(apply_page_len(url, 50)?, format!("{url}?pagelen=50"));
/// # Ok::<(), bitbucket_api::api::common::ApiError>(())
/// ```
pub fn apply_page_len(url: &str, page_len: u64) -> Result<String, ApiError> {
    if page_len == DEFAULT_PAGE_LEN {
        return Ok(url.to_string());
    }

    let mut parsed = Url::parse(url).map_err(|source| ApiError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    if !is_collection_path(&parsed) || parsed.query_pairs().any(|(key, _)| key == "pagelen") {
        return Ok(url.to_string());
    }

    parsed
        .query_pairs_mut()
        .append_pair("pagelen", &page_len.to_string());
    Ok(parsed.into())
}

/// Returns the non-empty `next` link of an envelope, if any.
pub fn next_link(envelope: &Map<String, Value>) -> Option<String> {
    envelope
        .get("next")
        .and_then(Value::as_str)
        .filter(|next| !next.is_empty())
        .map(str::to_string)
}

/// Fetches `url` and every page reachable through `next` links.
///
/// `fetch_page` performs one request and returns the decoded body. It is
/// called with the initial URL first, then with each `next` link in turn.
///
/// Non-envelope responses (single entities) are returned exactly as fetched.
///
/// # Errors
///
/// - Any error returned by `fetch_page`
/// - [`ApiError::Domain`] if the first or any followed page is an error envelope
/// - [`ApiError::Pagination`] if a followed page is not a mapping, has no
///   `values` sequence, or `next` points at an already fetched URL
pub async fn fetch_all_pages<F, Fut>(url: String, mut fetch_page: F) -> Result<Value, ApiError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Value, ApiError>>,
{
    let first = fetch_page(url.clone()).await?;
    let mut envelope = match first {
        Value::Object(map) if is_error_envelope_map(&map) => {
            return Err(DomainError::from_envelope(&map).into())
        }
        Value::Object(map) if is_envelope_map(&map) => map,
        other => return Ok(other),
    };

    let mut values = take_values(&mut envelope);
    let mut next = next_link(&envelope);
    let mut visited = HashSet::from([url]);
    let mut pages = 1usize;

    while let Some(next_url) = next {
        if !visited.insert(next_url.clone()) {
            return Err(ApiError::Pagination(format!(
                "next link {next_url} points to a page that was already fetched"
            )));
        }

        tracing::debug!(url = %next_url, page = pages + 1, "Following next page");
        let mut page = match fetch_page(next_url).await? {
            Value::Object(map) => map,
            other => {
                return Err(ApiError::Pagination(format!(
                    "next page result is not a mapping, it's a {}",
                    value_kind(&other)
                )))
            }
        };

        if is_error_envelope_map(&page) {
            return Err(DomainError::from_envelope(&page).into());
        }

        match page.remove("values") {
            Some(Value::Array(items)) => values.extend(items),
            Some(other) => {
                return Err(ApiError::Pagination(format!(
                    "next page 'values' is not a sequence, it's a {}",
                    value_kind(&other)
                )))
            }
            None => {
                return Err(ApiError::Pagination(
                    "next page result has no values".to_string(),
                ))
            }
        }

        next = next_link(&page);
        pages += 1;
    }

    tracing::debug!(pages, items = values.len(), "Merged paginated response");

    for field in TRANSIENT_FIELDS {
        envelope.remove(field);
    }
    envelope.insert("values".to_string(), Value::Array(values));
    Ok(Value::Object(envelope))
}

fn is_error_envelope_map(map: &Map<String, Value>) -> bool {
    map.get("type").and_then(Value::as_str) == Some("error")
}

fn is_envelope_map(map: &Map<String, Value>) -> bool {
    map.get("values").is_some_and(Value::is_array)
}

fn take_values(envelope: &mut Map<String, Value>) -> Vec<Value> {
    match envelope.remove("values") {
        Some(Value::Array(values)) => values,
        _ => Vec::new(),
    }
}
