//! Management canister calls used during deployment.
//!
//! Calls go through the [`ManagementApi`] trait so that the deployment pipeline
//! can be exercised without a replica. [`IcManagement`] is the implementation
//! backed by an [`ic_agent::Agent`].

use std::fmt;

use async_trait::async_trait;
use candid::{CandidType, Decode, Deserialize, Encode, Nat, Principal};
use derive_more::{Display, Error, From};
use ic_agent::{Agent, AgentError};

/// Management canister call errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ManagementError {
    /// Agent transport or replica rejection.
    Agent(AgentError),

    /// Unable to encode a request or decode a reply.
    Candid(candid::Error),
}

/// `install_code` mode.
///
/// Only fresh installation is ever requested, upgrades and reinstalls are not
/// part of the deployment flow.
#[derive(CandidType, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InstallMode {
    /// Install code into an empty canister.
    #[serde(rename = "install")]
    Install,
}

/// `install_code` arguments.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub(crate) struct InstallCodeArgs {
    /// Installation mode.
    pub mode: InstallMode,

    /// Target canister.
    pub canister_id: Principal,

    /// WASM module bytes.
    #[serde(with = "serde_bytes")]
    pub wasm_module: Vec<u8>,

    /// Candid-encoded init argument.
    #[serde(with = "serde_bytes")]
    pub arg: Vec<u8>,
}

/// Canister settings sent along with creation requests.
#[derive(CandidType, Deserialize)]
struct CanisterSettings {
    /// Canister controllers; the caller becomes the sole controller when unset.
    controllers: Option<Vec<Principal>>,
}

/// `provisional_create_canister_with_cycles` arguments.
#[derive(CandidType, Deserialize)]
struct ProvisionalCreateArgs {
    /// Initial cycle balance.
    amount: Option<Nat>,

    /// Initial settings.
    settings: Option<CanisterSettings>,
}

/// Record holding a single canister id, used both as an argument and a reply.
#[derive(CandidType, Deserialize)]
struct CanisterIdRecord {
    /// Canister identifier.
    canister_id: Principal,
}

/// Canister execution state.
#[derive(CandidType, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CanisterRunState {
    /// Canister processes messages.
    #[serde(rename = "running")]
    Running,

    /// Canister is waiting for outstanding calls before stopping.
    #[serde(rename = "stopping")]
    Stopping,

    /// Canister does not process messages.
    #[serde(rename = "stopped")]
    Stopped,
}

impl fmt::Display for CanisterRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        })
    }
}

/// Subset of the `canister_status` reply shown to the user.
///
/// Fields absent here are skipped during decoding.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub(crate) struct CanisterStatus {
    /// Execution state.
    pub status: CanisterRunState,

    /// Memory used by the canister, in bytes.
    pub memory_size: Nat,

    /// Current cycle balance.
    pub cycles: Nat,

    /// SHA-256 of the installed module, if any.
    pub module_hash: Option<Vec<u8>>,
}

/// A single canister log entry.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub(crate) struct CanisterLogRecord {
    /// Monotonic log index.
    pub idx: u64,

    /// Record timestamp, in nanoseconds since the Unix epoch.
    pub timestamp_nanos: u64,

    /// Raw log message.
    #[serde(with = "serde_bytes")]
    pub content: Vec<u8>,
}

/// `fetch_canister_logs` reply.
#[derive(CandidType, Deserialize)]
struct FetchCanisterLogsResult {
    /// Log records, oldest first.
    canister_log_records: Vec<CanisterLogRecord>,
}

/// Management canister operations required to provision and install a canister.
#[async_trait]
pub(crate) trait ManagementApi {
    /// Create a new canister funded with `cycles`.
    async fn provision(&self, cycles: u64) -> Result<Principal, ManagementError>;

    /// Query the status of `canister_id`.
    async fn canister_status(
        &self,
        canister_id: Principal,
    ) -> Result<CanisterStatus, ManagementError>;

    /// Fetch logs produced by `canister_id`.
    async fn fetch_canister_logs(
        &self,
        canister_id: Principal,
    ) -> Result<Vec<CanisterLogRecord>, ManagementError>;

    /// Install a WASM module.
    async fn install_code(&self, args: InstallCodeArgs) -> Result<(), ManagementError>;
}

/// Agent-backed management canister client.
pub(crate) struct IcManagement<'a> {
    /// Agent used to issue calls.
    agent: &'a Agent,

    /// Effective canister id used to route provisional creation requests.
    provisional_effective_canister_id: Principal,
}

impl<'a> IcManagement<'a> {
    /// Create a new client.
    ///
    /// Provisional creation is routed through the management canister itself
    /// unless an explicit effective canister id is provided.
    pub(crate) fn new(
        agent: &'a Agent,
        provisional_effective_canister_id: Option<Principal>,
    ) -> Self {
        Self {
            agent,
            provisional_effective_canister_id: provisional_effective_canister_id
                .unwrap_or_else(Principal::management_canister),
        }
    }
}

#[async_trait]
impl ManagementApi for IcManagement<'_> {
    async fn provision(&self, cycles: u64) -> Result<Principal, ManagementError> {
        let args = ProvisionalCreateArgs {
            amount: Some(Nat::from(cycles)),
            settings: None,
        };

        let reply = self
            .agent
            .update(
                &Principal::management_canister(),
                "provisional_create_canister_with_cycles",
            )
            .with_effective_canister_id(self.provisional_effective_canister_id)
            .with_arg(Encode!(&args)?)
            .call_and_wait()
            .await?;

        Ok(Decode!(&reply, CanisterIdRecord)?.canister_id)
    }

    async fn canister_status(
        &self,
        canister_id: Principal,
    ) -> Result<CanisterStatus, ManagementError> {
        let reply = self
            .agent
            .update(&Principal::management_canister(), "canister_status")
            .with_effective_canister_id(canister_id)
            .with_arg(Encode!(&CanisterIdRecord { canister_id })?)
            .call_and_wait()
            .await?;

        Ok(Decode!(&reply, CanisterStatus)?)
    }

    async fn fetch_canister_logs(
        &self,
        canister_id: Principal,
    ) -> Result<Vec<CanisterLogRecord>, ManagementError> {
        let reply = self
            .agent
            .query(&Principal::management_canister(), "fetch_canister_logs")
            .with_effective_canister_id(canister_id)
            .with_arg(Encode!(&CanisterIdRecord { canister_id })?)
            .call()
            .await?;

        Ok(Decode!(&reply, FetchCanisterLogsResult)?.canister_log_records)
    }

    async fn install_code(&self, args: InstallCodeArgs) -> Result<(), ManagementError> {
        let canister_id = args.canister_id;

        self.agent
            .update(&Principal::management_canister(), "install_code")
            .with_effective_canister_id(canister_id)
            .with_arg(Encode!(&args)?)
            .call_and_wait()
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_args_encode_install_variant() {
        let args = InstallCodeArgs {
            mode: InstallMode::Install,
            canister_id: Principal::management_canister(),
            wasm_module: vec![0x00, 0x61, 0x73, 0x6d],
            arg: Encode!().unwrap(),
        };

        let decoded = Decode!(&Encode!(&args).unwrap(), InstallCodeArgs).unwrap();

        assert_eq!(decoded.mode, InstallMode::Install);
        assert_eq!(decoded.wasm_module, args.wasm_module);
        assert_eq!(decoded.arg, args.arg);
    }

    #[test]
    fn status_reply_ignores_unknown_fields() {
        #[derive(CandidType)]
        struct FullStatus {
            status: CanisterRunState,
            memory_size: Nat,
            cycles: Nat,
            module_hash: Option<Vec<u8>>,
            idle_cycles_burned_per_day: Nat,
        }

        let reply = Encode!(&FullStatus {
            status: CanisterRunState::Running,
            memory_size: Nat::from(1024u64),
            cycles: Nat::from(5u64),
            module_hash: Some(vec![0xab, 0xcd]),
            idle_cycles_burned_per_day: Nat::from(7u64),
        })
        .unwrap();

        let status = Decode!(&reply, CanisterStatus).unwrap();

        assert_eq!(status.status, CanisterRunState::Running);
        assert_eq!(status.memory_size, Nat::from(1024u64));
        assert_eq!(status.module_hash, Some(vec![0xab, 0xcd]));
    }
}
