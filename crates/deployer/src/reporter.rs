//! Best-effort canister status and log reporting.
//!
//! Both operations print what they could retrieve and convert every failure into
//! a [`StageOutcome`], so callers never have to handle their errors.

use candid::{types::principal::PrincipalError, Principal};
use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tracing::warn;

use crate::{
    management::{CanisterLogRecord, CanisterStatus, ManagementApi, ManagementError},
    report::StageOutcome,
};

/// Status and log retrieval errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ReporterError {
    /// Canister id was not provided.
    #[display(fmt = "canister id is not provided")]
    MissingCanisterId,

    /// Canister id is not a valid principal.
    #[display(fmt = "invalid canister id: {}", _0)]
    Principal(PrincipalError),

    /// Management canister call failed.
    Management(ManagementError),
}

/// Parse a textual canister id, rejecting empty values.
pub(crate) fn parse_canister_id(canister_id: &str) -> Result<Principal, ReporterError> {
    let canister_id = canister_id.trim();

    if canister_id.is_empty() {
        return Err(ReporterError::MissingCanisterId);
    }

    Ok(Principal::from_text(canister_id)?)
}

/// Print the status of `canister_id`.
pub(crate) async fn report_status<M: ManagementApi + ?Sized>(
    management: &M,
    canister_id: &str,
    progress: &ProgressBar,
) -> StageOutcome {
    progress.set_message("Fetching canister status...");

    let result = async {
        let principal = parse_canister_id(canister_id)?;
        let status = management.canister_status(principal).await?;
        Ok::<_, ReporterError>((principal, status))
    }
    .await;

    match result {
        Ok((principal, status)) => {
            progress.println(format_status(&principal, &status));
            StageOutcome::Completed
        }
        Err(error) => {
            warn!(
                canister_id = display_id(canister_id),
                %error,
                "unable to fetch canister status"
            );
            StageOutcome::failed(error)
        }
    }
}

/// Print the logs of `canister_id`.
pub(crate) async fn fetch_logs<M: ManagementApi + ?Sized>(
    management: &M,
    canister_id: &str,
    progress: &ProgressBar,
) -> StageOutcome {
    progress.set_message("Fetching canister logs...");

    let result = async {
        let principal = parse_canister_id(canister_id)?;
        let logs = management.fetch_canister_logs(principal).await?;
        Ok::<_, ReporterError>((principal, logs))
    }
    .await;

    match result {
        Ok((principal, logs)) => {
            if logs.is_empty() {
                progress.println(format!("No logs for canister {principal}"));
            } else {
                progress.println(format!("Logs for canister {principal}:"));

                for record in &logs {
                    progress.println(format_log_record(record));
                }
            }

            StageOutcome::Completed
        }
        Err(error) => {
            warn!(
                canister_id = display_id(canister_id),
                %error,
                "unable to fetch canister logs"
            );
            StageOutcome::failed(error)
        }
    }
}

/// Canister id shown in log events.
fn display_id(canister_id: &str) -> &str {
    if canister_id.is_empty() {
        "unknown"
    } else {
        canister_id
    }
}

/// Human-readable canister status line.
fn format_status(canister_id: &Principal, status: &CanisterStatus) -> String {
    let module_hash = status
        .module_hash
        .as_deref()
        .map_or_else(|| String::from("none"), |hash| format!("0x{}", hex::encode(hash)));

    format!(
        "Canister {canister_id}: {}, memory {} bytes, {} cycles, module hash {module_hash}",
        status.status, status.memory_size, status.cycles
    )
}

/// Human-readable log record line.
fn format_log_record(record: &CanisterLogRecord) -> String {
    format!(
        "[{}] {} {}",
        record.idx,
        record.timestamp_nanos,
        String::from_utf8_lossy(&record.content)
    )
}
