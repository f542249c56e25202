use std::{path::Path, time::Duration};

use common::config::Config;
use derive_more::{Display, Error, From};
use ic_agent::AgentError;
use indicatif::ProgressBar;

use crate::{
    agent::create_agent,
    assets::AssetCanister,
    commands::{deploy::print_urls, Upload},
    config::ProjectConfig,
    pipeline::upload_stage,
    report::{EndpointUrls, StageOutcome},
    reporter::{parse_canister_id, ReporterError},
};

/// `upload` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum UploadCommandError {
    /// Unable to parse the project configuration with [`figment`].
    Figment(figment::Error),

    /// Invalid canister identifier.
    CanisterId(ReporterError),

    /// Unable to create an agent.
    #[display(fmt = "unable to connect to the network: {}", _0)]
    Agent(AgentError),

    /// Upload did not complete.
    #[display(fmt = "asset upload failed after {} assets", _0)]
    #[from(ignore)]
    Incomplete(#[error(ignore)] usize),
}

/// Upload flow entrypoint.
pub(crate) async fn upload(
    Upload {
        canister_id,
        dist_path,
    }: Upload,
    config: &Config,
    config_file: Option<&Path>,
) -> Result<(), UploadCommandError> {
    let canister_id = parse_canister_id(&canister_id)?;
    let dist_path = match dist_path {
        Some(dist_path) => dist_path,
        None => ProjectConfig::new(config_file)?.dist_path,
    };

    let progress = ProgressBar::new_spinner();

    progress.enable_steady_tick(Duration::from_millis(150));
    progress.set_message("Connecting...");

    let agent = create_agent(config).await?;
    let store = AssetCanister::new(&agent, canister_id);

    let (outcome, summary) = upload_stage(&store, &dist_path, &progress).await;

    if outcome != StageOutcome::Completed {
        progress.abandon_with_message("Upload failed.");
        return Err(UploadCommandError::Incomplete(summary.keys.len()));
    }

    print_urls(&progress, &EndpointUrls::new(config, &canister_id));
    progress.finish_with_message(format!("Uploaded {} assets.", summary.keys.len()));

    Ok(())
}
