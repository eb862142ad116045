//
//  bitbucket-api
//  api/cloud/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Bitbucket Cloud API v2.0 entities and endpoint wrappers.
//!
//! # Module Organization
//!
//! - [`repositories`] - Repository CRUD, source listings, branches and refs
//! - [`pipelines`] - Pipelines configuration, variables and SSH key pairs
//!
//! # Notes
//!
//! - All timestamps are in ISO 8601 format
//! - UUIDs are returned with curly braces (e.g., `{123e4567-e89b-...}`)
//! - Object kinds are exposed as `kind`, from the wire field `type`

pub mod pipelines;
pub mod repositories;

pub use pipelines::*;
pub use repositories::*;
