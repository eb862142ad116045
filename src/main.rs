//
//  bitbucket-api
//  main.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bitbucket_api::api::ApiError;
use bitbucket_api::cli::{Cli, Commands};
use bitbucket_api::exit_codes;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command
    let result = run(cli).await;

    // Handle result and exit
    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(exit_code(&e));
        }
    }
}

/// Initialize logging based on environment
fn init_logging() {
    let filter = EnvFilter::try_from_env("BB_DEBUG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Main command dispatcher
async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Api(cmd) => cmd.run(&cli.global).await,
        Commands::Version => {
            println!("{} version {}", bitbucket_api::APP_NAME, bitbucket_api::VERSION);
            Ok(())
        }
    }
}

/// Maps a failure onto the documented exit codes.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::TokenRefresh(_)) => exit_codes::AUTH_ERROR,
        Some(api) => match api.status().map(|s| s.as_u16()) {
            Some(401 | 403) => exit_codes::AUTH_ERROR,
            Some(404) => exit_codes::NOT_FOUND,
            Some(429) => exit_codes::RATE_LIMIT,
            _ => exit_codes::ERROR,
        },
        None => exit_codes::ERROR,
    }
}
