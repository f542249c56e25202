use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use candid::{Nat, Principal};

use crate::{
    assets::{AssetStore, StoreArg, StoreError},
    management::{
        CanisterLogRecord, CanisterRunState, CanisterStatus, InstallCodeArgs, ManagementApi,
        ManagementError,
    },
};

/// Canister id returned by [`RecordingManagement::provision`].
pub(crate) fn test_canister_id() -> Principal {
    Principal::from_slice(&[0, 0, 0, 0, 0, 0, 0, 1, 1, 1])
}

/// Rejection error for `method`.
fn rejected(method: &str) -> candid::Error {
    candid::Error::msg(format!("{method} rejected"))
}

/// Management canister double that records every call.
#[derive(Default)]
pub(crate) struct RecordingManagement {
    /// Reject canister creation.
    pub fail_provision: bool,

    /// Reject status requests.
    pub fail_status: bool,

    /// Reject log requests.
    pub fail_logs: bool,

    /// Reject code installation.
    pub fail_install: bool,

    /// Names of the called methods, in call order.
    pub(crate) calls: Mutex<Vec<&'static str>>,

    /// Arguments of accepted installations.
    pub(crate) installs: Mutex<Vec<InstallCodeArgs>>,
}

impl RecordingManagement {
    /// Snapshot of the called method names.
    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Snapshot of the accepted installations.
    pub(crate) fn installs(&self) -> Vec<InstallCodeArgs> {
        self.installs.lock().unwrap().clone()
    }

    /// Record a call to `method`, failing it if `fail` is set.
    fn record(&self, method: &'static str, fail: bool) -> Result<(), ManagementError> {
        self.calls.lock().unwrap().push(method);

        if fail {
            Err(rejected(method).into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ManagementApi for RecordingManagement {
    async fn provision(&self, _cycles: u64) -> Result<Principal, ManagementError> {
        self.record("provisional_create_canister_with_cycles", self.fail_provision)?;

        Ok(test_canister_id())
    }

    async fn canister_status(
        &self,
        _canister_id: Principal,
    ) -> Result<CanisterStatus, ManagementError> {
        self.record("canister_status", self.fail_status)?;

        Ok(CanisterStatus {
            status: CanisterRunState::Running,
            memory_size: Nat::from(0u64),
            cycles: Nat::from(1_000_000_000_000u64),
            module_hash: None,
        })
    }

    async fn fetch_canister_logs(
        &self,
        _canister_id: Principal,
    ) -> Result<Vec<CanisterLogRecord>, ManagementError> {
        self.record("fetch_canister_logs", self.fail_logs)?;

        Ok(vec![CanisterLogRecord {
            idx: 0,
            timestamp_nanos: 1_700_000_000_000_000_000,
            content: b"initialized".to_vec(),
        }])
    }

    async fn install_code(&self, args: InstallCodeArgs) -> Result<(), ManagementError> {
        self.record("install_code", self.fail_install)?;
        self.installs.lock().unwrap().push(args);

        Ok(())
    }
}

/// Asset canister double that records stored assets.
///
/// Clones share the recorded assets.
#[derive(Clone, Default)]
pub(crate) struct RecordingStore {
    /// Key whose `store` call is rejected.
    fail_on: Option<String>,

    /// Assets accepted so far.
    stored: Arc<Mutex<Vec<StoreArg>>>,
}

impl RecordingStore {
    /// Reject the `store` call for `key`.
    pub(crate) fn failing_on(key: &str) -> Self {
        Self {
            fail_on: Some(String::from(key)),
            ..Default::default()
        }
    }

    /// Snapshot of the accepted assets.
    pub(crate) fn stored(&self) -> Vec<StoreArg> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for RecordingStore {
    async fn store(&self, arg: &StoreArg) -> Result<(), StoreError> {
        if self.fail_on.as_deref() == Some(arg.key.as_str()) {
            return Err(rejected("store").into());
        }

        self.stored.lock().unwrap().push(arg.clone());

        Ok(())
    }
}
