/// `deploy` subcommand.
mod deploy;

/// `logs` subcommand.
mod logs;

/// `status` subcommand.
mod status;

/// `upload` subcommand.
mod upload;

pub(crate) use deploy::deploy;
pub(crate) use logs::logs;
pub(crate) use status::status;
pub(crate) use upload::upload;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI configuration.
#[derive(Parser)]
#[command(about, version)]
pub(crate) struct Cli {
    /// Configuration file path.
    #[arg(short, long, default_value = "Deploy.toml")]
    pub config_file: Option<PathBuf>,

    /// Selected subcommand, full deployment if omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Supported subcommands.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Create a canister, install the asset canister module and upload assets.
    Deploy(Deploy),

    /// Upload assets into an existing asset canister.
    Upload(Upload),

    /// Print the status of a canister.
    Status(Canister),

    /// Print the logs of a canister.
    Logs(Canister),
}

impl Default for Commands {
    fn default() -> Self {
        Self::Deploy(Deploy::default())
    }
}

/// `deploy` subcommand configuration.
#[derive(Args, Default)]
pub struct Deploy {
    /// Path to the asset canister WASM module.
    #[arg(short, long)]
    wasm_path: Option<PathBuf>,

    /// Build output directory to upload.
    #[arg(short, long)]
    dist_path: Option<PathBuf>,

    /// Cycles used to fund the new canister.
    #[arg(long)]
    cycles: Option<u64>,

    /// Path where to write the deployment report as TOML.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// `upload` subcommand configuration.
#[derive(Args)]
pub struct Upload {
    /// Asset canister identifier.
    canister_id: String,

    /// Build output directory to upload.
    #[arg(short, long)]
    dist_path: Option<PathBuf>,
}

/// Configuration of subcommands targeting an existing canister.
#[derive(Args)]
pub struct Canister {
    /// Canister identifier.
    canister_id: String,
}
