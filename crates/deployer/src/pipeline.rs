//! # Deployment pipeline
//!
//! The pipeline runs its stages strictly in order: provisioning, status report,
//! log fetch, code installation and asset upload. Each stage produces a
//! [`StageOutcome`] collected into a [`DeployReport`], and the continuation policy
//! is applied here rather than inside the stages:
//!
//! * provisioning failure stops the pipeline, as there is no canister to work with;
//! * status and log failures are informational only;
//! * installation failure is recorded, and the upload still runs unless
//!   [`ProjectConfig::abort_on_install_failure`] is set;
//! * upload failure stops the remaining uploads and is recorded together with
//!   the assets stored so far.

use std::path::Path;

use candid::Principal;
use common::config::Config;
use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tracing::{error, info, warn};

use crate::{
    assets::{upload_assets, AssetStore, PartialUpload, UploadSummary},
    config::ProjectConfig,
    installer::{self, InitArgs},
    management::{ManagementApi, ManagementError},
    report::{DeployReport, EndpointUrls, StageOutcome},
    reporter,
    walker::AssetTree,
};

/// Errors that stop the pipeline before any canister exists.
#[derive(Debug, Display, From, Error)]
pub(crate) enum PipelineError {
    /// Unable to create a canister.
    #[display(fmt = "unable to create canister: {}", _0)]
    Provision(ManagementError),
}

/// Run the full deployment.
///
/// `connect_store` is called once with the new canister id to obtain the asset
/// canister client, unless the upload is skipped.
pub(crate) async fn run<M, S, F>(
    management: &M,
    connect_store: F,
    config: &Config,
    project: &ProjectConfig,
    progress: &ProgressBar,
) -> Result<DeployReport, PipelineError>
where
    M: ManagementApi + ?Sized,
    S: AssetStore,
    F: FnOnce(Principal) -> S,
{
    progress.set_message("Creating canister...");

    let canister_id = management.provision(project.cycles).await?;

    info!(%canister_id, cycles = project.cycles, "canister created");
    progress.println(format!("Canister created: {canister_id}"));

    let mut report = DeployReport::new(canister_id);
    let canister_text = canister_id.to_text();

    report.status = reporter::report_status(management, &canister_text, progress).await;
    report.logs = reporter::fetch_logs(management, &canister_text, progress).await;

    progress.set_message("Installing code...");
    report.install = install_stage(management, canister_id, project).await;

    if report.install.is_failed() && project.abort_on_install_failure {
        warn!(%canister_id, "skipping asset upload after failed installation");
        return Ok(report);
    }

    let store = connect_store(canister_id);
    let (outcome, summary) = upload_stage(&store, &project.dist_path, progress).await;

    if outcome == StageOutcome::Completed {
        report.urls = Some(EndpointUrls::new(config, &canister_id));
    }

    report.upload = outcome;
    report.uploaded = summary;

    Ok(report)
}

/// Install the configured WASM module, converting the result into an outcome.
async fn install_stage<M: ManagementApi + ?Sized>(
    management: &M,
    canister_id: Principal,
    project: &ProjectConfig,
) -> StageOutcome {
    let result = async {
        let init_args = InitArgs::new(&project.owner, project.name.as_str())?;
        installer::install(management, canister_id, &project.wasm_path, &init_args).await
    }
    .await;

    match result {
        Ok(()) => {
            info!(%canister_id, "code installed");
            StageOutcome::Completed
        }
        Err(err) => {
            error!(%canister_id, %err, "code installation failed");
            StageOutcome::failed(err)
        }
    }
}

/// Upload the build directory, converting the result into an outcome.
pub(crate) async fn upload_stage<S: AssetStore + ?Sized>(
    store: &S,
    dist_path: &Path,
    progress: &ProgressBar,
) -> (StageOutcome, UploadSummary) {
    progress.set_message("Uploading assets...");

    match upload_assets(store, &AssetTree::new(dist_path), progress).await {
        Ok(summary) => {
            info!(
                assets = summary.keys.len(),
                bytes = summary.bytes,
                "assets uploaded"
            );
            (StageOutcome::Completed, summary)
        }
        Err(partial) => {
            error!(%partial, "asset upload failed");

            let PartialUpload { summary, error } = partial;
            (StageOutcome::failed(error), summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use tempfile::TempDir;

    use crate::testing::{test_canister_id, RecordingManagement, RecordingStore};

    use super::*;

    const PROVISION: &str = "provisional_create_canister_with_cycles";
    const STATUS: &str = "canister_status";
    const LOGS: &str = "fetch_canister_logs";
    const INSTALL: &str = "install_code";

    /// Create a project with a WASM module of `wasm` bytes and a small build directory.
    fn create_project(wasm: &[u8]) -> (TempDir, ProjectConfig) {
        let dir = tempfile::tempdir().expect("unable to create temp dir");
        let dist = dir.path().join("dist");

        fs::create_dir_all(dist.join("assets")).unwrap();
        fs::write(dist.join("index.html"), [b'h'; 10]).unwrap();
        fs::write(dist.join("assets/logo.png"), [b'p'; 20]).unwrap();
        fs::write(dir.path().join("assetstorage.wasm"), wasm).unwrap();

        let project = ProjectConfig {
            wasm_path: dir.path().join("assetstorage.wasm"),
            dist_path: dist,
            ..Default::default()
        };

        (dir, project)
    }

    fn stored_keys(store: &RecordingStore) -> Vec<String> {
        store.stored().into_iter().map(|arg| arg.key).collect()
    }

    #[tokio::test]
    async fn full_deployment() {
        let (_dir, project) = create_project(b"\0asm\x01\0\0\0");
        let management = RecordingManagement::default();
        let store = RecordingStore::default();
        let mut connected_to = None;

        let report = run(
            &management,
            |canister_id| {
                connected_to = Some(canister_id);
                store.clone()
            },
            &Config::default(),
            &project,
            &ProgressBar::hidden(),
        )
        .await
        .expect("pipeline failed");

        assert_eq!(management.calls(), vec![PROVISION, STATUS, LOGS, INSTALL]);
        assert_eq!(connected_to, Some(test_canister_id()));
        assert_eq!(
            stored_keys(&store),
            vec!["/assets/logo.png", "/index.html"]
        );

        let stored = store.stored();
        assert_eq!(stored[0].content_type, "image/png");
        assert_eq!(stored[1].content_type, "text/html");

        assert!(report.is_success());
        assert_eq!(report.canister_id, test_canister_id().to_text());
        assert_eq!(report.uploaded.bytes, 30);

        let urls = report.urls.expect("missing endpoint urls");
        assert_eq!(
            urls.gateway,
            format!("https://ic0.app/?canisterId={}", test_canister_id())
        );
    }

    #[tokio::test]
    async fn empty_wasm_still_uploads_assets() {
        let (_dir, project) = create_project(b"");
        let management = RecordingManagement::default();
        let store = RecordingStore::default();

        let report = run(
            &management,
            |_| store.clone(),
            &Config::default(),
            &project,
            &ProgressBar::hidden(),
        )
        .await
        .expect("pipeline failed");

        assert!(!management.calls().contains(&INSTALL));
        assert!(report.install.is_failed());
        assert_eq!(report.upload, StageOutcome::Completed);
        assert_eq!(stored_keys(&store).len(), 2);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn install_failure_can_abort_upload() {
        let (_dir, mut project) = create_project(b"\0asm");
        project.abort_on_install_failure = true;

        let management = RecordingManagement {
            fail_install: true,
            ..Default::default()
        };
        let store = RecordingStore::default();

        let report = run(
            &management,
            |_| store.clone(),
            &Config::default(),
            &project,
            &ProgressBar::hidden(),
        )
        .await
        .expect("pipeline failed");

        assert!(report.install.is_failed());
        assert_eq!(report.upload, StageOutcome::Skipped);
        assert!(store.stored().is_empty());
        assert!(report.urls.is_none());
    }

    #[tokio::test]
    async fn provisioning_failure_stops_pipeline() {
        let (_dir, project) = create_project(b"\0asm");
        let management = RecordingManagement {
            fail_provision: true,
            ..Default::default()
        };
        let mut connected = false;

        let result = run(
            &management,
            |_| {
                connected = true;
                RecordingStore::default()
            },
            &Config::default(),
            &project,
            &ProgressBar::hidden(),
        )
        .await;

        assert!(matches!(result, Err(PipelineError::Provision(_))));
        assert_eq!(management.calls(), vec![PROVISION]);
        assert!(!connected);
    }

    #[tokio::test]
    async fn status_and_log_failures_are_informational() {
        let (_dir, project) = create_project(b"\0asm");
        let management = RecordingManagement {
            fail_status: true,
            fail_logs: true,
            ..Default::default()
        };

        let report = run(
            &management,
            |_| RecordingStore::default(),
            &Config::default(),
            &project,
            &ProgressBar::hidden(),
        )
        .await
        .expect("pipeline failed");

        assert!(report.status.is_failed());
        assert!(report.logs.is_failed());
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn partial_upload_is_reported() {
        let (_dir, project) = create_project(b"\0asm");
        let management = RecordingManagement::default();
        let store = RecordingStore::failing_on("/index.html");

        let report = run(
            &management,
            |_| store.clone(),
            &Config::default(),
            &project,
            &ProgressBar::hidden(),
        )
        .await
        .expect("pipeline failed");

        assert!(report.upload.is_failed());
        assert_eq!(report.uploaded.keys, vec!["/assets/logo.png"]);
        assert!(report.urls.is_none());
    }

    #[tokio::test]
    async fn missing_build_directory_fails_upload() {
        let (dir, mut project) = create_project(b"\0asm");
        project.dist_path = PathBuf::from(dir.path()).join("missing");

        let (outcome, summary) = upload_stage(
            &RecordingStore::default(),
            &project.dist_path,
            &ProgressBar::hidden(),
        )
        .await;

        assert!(outcome.is_failed());
        assert!(summary.keys.is_empty());
    }
}
