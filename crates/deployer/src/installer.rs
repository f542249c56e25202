use std::{fs, io, path::Path};

use candid::{types::principal::PrincipalError, CandidType, Deserialize, Encode, Principal};
use derive_more::{Display, Error, From};
use tracing::info;

use crate::management::{InstallCodeArgs, InstallMode, ManagementApi, ManagementError};

/// Code installation errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum InstallError {
    /// Unable to read the WASM module.
    #[display(fmt = "unable to read WASM module: {}", _0)]
    Io(io::Error),

    /// WASM module contains no bytes.
    #[display(fmt = "WASM file is empty")]
    EmptyWasm,

    /// Configured owner is not a valid principal.
    #[display(fmt = "invalid owner principal: {}", _0)]
    Owner(PrincipalError),

    /// Unable to encode the init argument.
    Candid(candid::Error),

    /// The management canister rejected the installation.
    Management(ManagementError),
}

/// Asset canister init argument.
#[derive(CandidType, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct InitArgs {
    /// Principal allowed to manage assets.
    pub owner: Principal,

    /// Human-readable canister name.
    pub name: String,
}

impl InitArgs {
    /// Create init arguments from a textual owner principal.
    pub(crate) fn new(owner: &str, name: impl Into<String>) -> Result<Self, InstallError> {
        Ok(Self {
            owner: Principal::from_text(owner)?,
            name: name.into(),
        })
    }

    /// Encode as a single Candid `record { owner: principal; name: text }` argument.
    pub(crate) fn encode(&self) -> Result<Vec<u8>, InstallError> {
        Ok(Encode!(self)?)
    }
}

/// Read a WASM module, rejecting missing and empty files.
pub(crate) fn read_wasm(path: &Path) -> Result<Vec<u8>, InstallError> {
    let wasm = fs::read(path)?;

    if wasm.is_empty() {
        return Err(InstallError::EmptyWasm);
    }

    Ok(wasm)
}

/// Install the WASM module at `wasm_path` into `canister_id` in fresh-install mode.
///
/// Local inputs are validated before the management canister is contacted.
pub(crate) async fn install<M: ManagementApi + ?Sized>(
    management: &M,
    canister_id: Principal,
    wasm_path: &Path,
    init_args: &InitArgs,
) -> Result<(), InstallError> {
    let wasm_module = read_wasm(wasm_path)?;
    let arg = init_args.encode()?;

    info!(%canister_id, wasm_bytes = wasm_module.len(), "installing code");

    management
        .install_code(InstallCodeArgs {
            mode: InstallMode::Install,
            canister_id,
            wasm_module,
            arg,
        })
        .await?;

    Ok(())
}
