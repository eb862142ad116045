//
//  bitbucket-api
//  cli/api.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Direct API Access
//!
//! `bb-api api` sends one request through [`BitbucketClient`] and prints the
//! result. JSON responses are merged across pages and pretty-printed; `--raw`
//! prints the body bytes untouched (useful for file contents).
//!
//! ## Examples
//!
//! ```bash
//! # Every repository in a workspace, all pages merged
//! bb-api api /repositories/myworkspace
//!
//! # Create a repository
//! bb-api api -X POST /repositories/myworkspace/new-repo -F is_private=true -F project.key=PROJ
//!
//! # Raw file content
//! bb-api api --raw /repositories/myworkspace/repo/src/main/README.md
//!
//! # Body from stdin
//! echo '{"enabled": true}' | bb-api api -X PUT /repositories/ws/repo/pipelines_config --input -
//! ```

use std::fs;
use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use clap::Args;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::api::BitbucketClient;
use crate::config::ClientConfig;

use super::GlobalOptions;

/// Make an authenticated request to the Bitbucket API.
#[derive(Args, Debug)]
pub struct ApiCommand {
    /// API path relative to the base URL, or an absolute URL
    pub endpoint: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// Add a typed body field (key=value, dotted keys nest)
    #[arg(long, short = 'F', action = clap::ArgAction::Append)]
    pub field: Vec<String>,

    /// Add a string body field (key=value)
    #[arg(long, action = clap::ArgAction::Append)]
    pub raw_field: Vec<String>,

    /// Read the JSON body from a file, or `-` for stdin
    #[arg(long, short = 'f', value_name = "FILE")]
    pub input: Option<String>,

    /// Print the response body as-is, without decoding or pagination
    #[arg(long)]
    pub raw: bool,
}

impl ApiCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let method = self.parse_method()?;
        let body = self.build_body()?;

        let mut config = ClientConfig::load()?;
        global.apply(&mut config);
        let client = BitbucketClient::from_config(&config)?;

        let url = resolve_endpoint(client.base_url(), &self.endpoint);
        let body = body.as_deref();

        if self.raw {
            let bytes = client.execute_raw(method, &url, body).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            return Ok(());
        }

        if method == Method::DELETE {
            client.execute_empty(method, &url, body).await?;
            return Ok(());
        }

        let value = client.execute(method, &url, body).await?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }

    fn parse_method(&self) -> Result<Method> {
        match self.method.to_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "PATCH" => Ok(Method::PATCH),
            "DELETE" => Ok(Method::DELETE),
            _ => bail!("Unsupported HTTP method: {}", self.method),
        }
    }

    /// Builds the request body from `--input` or the field flags.
    fn build_body(&self) -> Result<Option<String>> {
        if let Some(input) = &self.input {
            let content = if input == "-" {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))?
            };

            serde_json::from_str::<Value>(&content)
                .with_context(|| format!("{input} is not valid JSON"))?;
            return Ok(Some(content));
        }

        if self.field.is_empty() && self.raw_field.is_empty() {
            return Ok(None);
        }

        let mut body = Map::new();
        for field in &self.field {
            let (key, value) = split_field(field)?;
            set_nested_value(&mut body, key, parse_field_value(value));
        }
        for field in &self.raw_field {
            let (key, value) = split_field(field)?;
            set_nested_value(&mut body, key, Value::String(value.to_string()));
        }

        Ok(Some(serde_json::to_string(&Value::Object(body))?))
    }
}

/// Turns an endpoint argument into a full URL.
///
/// Absolute URLs are used as-is, anything else is joined onto `base_url`.
fn resolve_endpoint(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

fn split_field(field: &str) -> Result<(&str, &str)> {
    match field.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("Invalid field format: {}. Expected key=value", field),
    }
}

/// Interprets `true`, `false`, `null`, numbers and JSON literals; anything
/// else stays a string.
fn parse_field_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                Value::Number(n.into())
            } else if raw.starts_with('[') || raw.starts_with('{') {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
            } else {
                raw.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map_or_else(|| Value::String(raw.to_string()), Value::Number)
            }
        }
    }
}

fn set_nested_value(object: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            object.insert(key.to_string(), value);
        }
        Some((first, rest)) => {
            let entry = object
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(nested) = entry {
                set_nested_value(nested, rest, value);
            }
        }
    }
}
