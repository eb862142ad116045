//
//  bitbucket-api
//  cli/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Command-Line Interface
//!
//! Argument definitions for the `bb-api` binary, built with clap's derive API.
//!
//! ## Command Structure
//!
//! ```text
//! bb-api [--base-url URL] [--page-len N] <COMMAND>
//!
//! Commands:
//!   api      Make an authenticated request and print the result
//!   version  Print the version
//! ```
//!
//! Global options override the configuration file and the environment.

mod api;

pub use api::ApiCommand;

use clap::{Parser, Subcommand};

use crate::config::ClientConfig;

/// Root command.
#[derive(Parser, Debug)]
#[command(
    name = "bb-api",
    version,
    about = "Make authenticated requests to the Bitbucket Cloud API",
    long_about = "bb-api sends a request to the Bitbucket Cloud REST API, following \
                  pagination links and merging every page into one JSON document.\n\n\
                  Credentials come from the config file or BB_TOKEN / BB_USERNAME + BB_PASSWORD.",
    propagate_version = true,
    after_help = "Use 'bb-api <command> --help' for more information about a command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOptions,
}

/// Options accepted by every subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// API root to send requests to
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Page length requested for collections
    #[arg(long, global = true, value_name = "N")]
    pub page_len: Option<u64>,
}

impl GlobalOptions {
    /// Applies the flags on top of a loaded configuration.
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(page_len) = self.page_len {
            config.page_len = page_len;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Make an authenticated API request
    Api(ApiCommand),

    /// Print the version
    Version,
}
