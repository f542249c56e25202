use std::{fmt::Display, fs, io, path::Path};

use candid::Principal;
use common::config::Config;
use derive_more::{Display, Error, From};
use serde::Serialize;

use crate::assets::UploadSummary;

/// Deployment report persistence errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ReportError {
    /// IO-related error.
    Io(io::Error),

    /// Unable to serialize the report using [`toml`] crate.
    Toml(toml::ser::Error),
}

/// Result of a single deployment stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub(crate) enum StageOutcome {
    /// Stage finished successfully.
    Completed,

    /// Stage was not attempted.
    Skipped,

    /// Stage failed with the provided reason.
    Failed(String),
}

impl StageOutcome {
    /// Create a failed outcome from an error.
    pub(crate) fn failed(error: impl Display) -> Self {
        Self::Failed(error.to_string())
    }

    /// Whether the stage failed.
    pub(crate) fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// URLs under which an asset canister serves its content.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct EndpointUrls {
    /// Local replica gateway URL.
    pub local: String,

    /// URL routed through the configured network host.
    pub gateway: String,
}

impl EndpointUrls {
    /// Build endpoint URLs for `canister_id`.
    pub(crate) fn new(config: &Config, canister_id: &Principal) -> Self {
        Self {
            local: format!("http://{canister_id}.{}/", config.network.local_gateway),
            gateway: format!("{}/?canisterId={canister_id}", config.host()),
        }
    }
}

/// Outcome of a full deployment run.
#[derive(Debug, Serialize)]
pub(crate) struct DeployReport {
    /// Provisioned canister identifier.
    pub canister_id: String,

    /// Status report stage.
    pub status: StageOutcome,

    /// Log fetch stage.
    pub logs: StageOutcome,

    /// Code installation stage.
    pub install: StageOutcome,

    /// Asset upload stage.
    pub upload: StageOutcome,

    /// Assets stored during the upload stage, including a partial upload.
    pub uploaded: UploadSummary,

    /// Endpoint URLs, present once the upload completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<EndpointUrls>,
}

impl DeployReport {
    /// Create a report for a freshly provisioned canister with no stages run yet.
    pub(crate) fn new(canister_id: Principal) -> Self {
        Self {
            canister_id: canister_id.to_text(),
            status: StageOutcome::Skipped,
            logs: StageOutcome::Skipped,
            install: StageOutcome::Skipped,
            upload: StageOutcome::Skipped,
            uploaded: UploadSummary::default(),
            urls: None,
        }
    }

    /// Whether the deployment is usable.
    ///
    /// Status and log stages are informational and never affect the result.
    pub(crate) fn is_success(&self) -> bool {
        self.install == StageOutcome::Completed && self.upload == StageOutcome::Completed
    }

    /// Write the report as TOML.
    pub(crate) fn write(&self, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, toml::to_string(self)?)?;

        Ok(())
    }
}
