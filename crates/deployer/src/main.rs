//! # Frontend canister deployer
//!
//! Provisions an asset canister on the Internet Computer, installs the asset
//! canister WASM module into it and uploads a local build directory.
//!
//! # Deployment flow
//!
//! A deployment is a strictly sequential [`pipeline`]: a canister is created with
//! an ephemeral identity, its status and logs are reported, the WASM module is
//! installed and finally every file of the build directory is stored as an asset.
//! Each stage reports its outcome back to the pipeline, which decides whether the
//! deployment continues.
//!
//! # Assets
//!
//! Build directory files are discovered with a lazy depth-first walk (see
//! [`walker`]) and uploaded one at a time. Asset keys mirror the relative file
//! paths, and content types are derived from file name extensions. See [`assets`]
//! for details.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use clap::Parser;
use commands::{Cli, Commands};
use common::{config::Config, logging};

/// Agent and identity creation.
mod agent;

/// Asset classification and upload.
mod assets;

/// CLI subcommands.
mod commands;

/// Project deployment configuration.
mod config;

/// Asset canister code installation.
mod installer;

/// Management canister client.
mod management;

/// Deployment orchestration.
mod pipeline;

/// Deployment outcome reporting.
mod report;

/// Best-effort canister status and logs.
mod reporter;

/// Test doubles for remote collaborators.
#[cfg(test)]
mod testing;

/// Build directory traversal.
mod walker;

/// CLI entrypoint.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let config = Config::new(cli.config_file.clone())?;

    logging::init(&config);

    let config_file = cli.config_file.as_deref();

    match cli.command.unwrap_or_default() {
        Commands::Deploy(args) => commands::deploy(args, &config, config_file).await?,
        Commands::Upload(args) => commands::upload(args, &config, config_file).await?,
        Commands::Status(args) => commands::status(args, &config).await?,
        Commands::Logs(args) => commands::logs(args, &config).await?,
    }

    Ok(())
}
