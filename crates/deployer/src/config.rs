use std::path::{Path, PathBuf};

use common::config::Config;
use serde::Deserialize;

/// Cycles allotted to a freshly provisioned canister.
pub const DEFAULT_CYCLES: u64 = 1_000_000_000_000;

/// Principal that owns the installed asset canister unless configured otherwise.
const DEFAULT_OWNER: &str = "6ydm4-srext-xsaic-y3v2x-cticp-5n6pf-2meh7-j43r6-rghg7-pt5nd-bqe";

/// Asset canister WASM module, relative to the working directory.
const DEFAULT_WASM_PATH: &str = "assetstorage.wasm";

/// Build output directory uploaded into the canister.
const DEFAULT_DIST_PATH: &str = "dist";

/// Project deployment configuration, stored in the `[project]` table.
#[derive(Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Path to the asset canister WASM module.
    pub wasm_path: PathBuf,

    /// Directory whose files are uploaded as assets.
    pub dist_path: PathBuf,

    /// Cycles used to fund the new canister.
    pub cycles: u64,

    /// Textual principal passed as the `owner` init argument.
    pub owner: String,

    /// Value passed as the `name` init argument.
    pub name: String,

    /// Stop the deployment when code installation fails instead of
    /// proceeding with the asset upload.
    pub abort_on_install_failure: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            wasm_path: PathBuf::from(DEFAULT_WASM_PATH),
            dist_path: PathBuf::from(DEFAULT_DIST_PATH),
            cycles: DEFAULT_CYCLES,
            owner: String::from(DEFAULT_OWNER),
            name: String::from(DEFAULT_WASM_PATH),
            abort_on_install_failure: false,
        }
    }
}

/// Configuration file layout, as far as the project section is concerned.
#[derive(Deserialize)]
struct Sections {
    /// Project table.
    #[serde(default)]
    project: ProjectConfig,
}

impl ProjectConfig {
    /// Create new project config from the same sources as the general [`Config`].
    pub fn new(path: Option<&Path>) -> Result<Self, figment::Error> {
        Ok(Config::figment(path).extract::<Sections>()?.project)
    }
}
