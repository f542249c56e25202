use std::{path::Path, time::Duration};

use candid::{types::principal::PrincipalError, Principal};
use common::config::Config;
use derive_more::{Display, Error, From};
use ic_agent::AgentError;
use indicatif::ProgressBar;

use crate::{
    agent::create_agent,
    assets::AssetCanister,
    commands::Deploy,
    config::ProjectConfig,
    management::IcManagement,
    pipeline::{self, PipelineError},
    report::{EndpointUrls, ReportError},
};

/// `deploy` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeployError {
    /// Unable to parse the project configuration with [`figment`].
    Figment(figment::Error),

    /// Unable to create an agent.
    #[display(fmt = "unable to connect to the network: {}", _0)]
    Agent(AgentError),

    /// Configured provisional effective canister id is not a valid principal.
    #[display(fmt = "invalid provisional effective canister id: {}", _0)]
    EffectiveCanisterId(PrincipalError),

    /// Pipeline stopped before a canister was created.
    Pipeline(PipelineError),

    /// Unable to write the deployment report.
    #[display(fmt = "unable to write deployment report: {}", _0)]
    Report(ReportError),

    /// Installation or upload did not complete.
    #[display(fmt = "deployment finished with errors")]
    Incomplete,
}

/// Deploy flow entrypoint.
pub(crate) async fn deploy(
    Deploy {
        wasm_path,
        dist_path,
        cycles,
        output,
    }: Deploy,
    config: &Config,
    config_file: Option<&Path>,
) -> Result<(), DeployError> {
    let mut project = ProjectConfig::new(config_file)?;

    if let Some(wasm_path) = wasm_path {
        project.wasm_path = wasm_path;
    }

    if let Some(dist_path) = dist_path {
        project.dist_path = dist_path;
    }

    if let Some(cycles) = cycles {
        project.cycles = cycles;
    }

    let effective_canister_id = config
        .network
        .provisional_effective_canister_id
        .as_deref()
        .map(Principal::from_text)
        .transpose()?;

    let progress = ProgressBar::new_spinner();

    progress.enable_steady_tick(Duration::from_millis(150));
    progress.set_message("Connecting...");

    let agent = create_agent(config).await?;
    let management = IcManagement::new(&agent, effective_canister_id);

    let report = pipeline::run(
        &management,
        |canister_id| AssetCanister::new(&agent, canister_id),
        config,
        &project,
        &progress,
    )
    .await?;

    if let Some(urls) = &report.urls {
        print_urls(&progress, urls);
    }

    if let Some(output) = output {
        report.write(&output)?;
    }

    if report.is_success() {
        progress.finish_with_message("Deployment completed.");
        Ok(())
    } else {
        progress.abandon_with_message("Deployment finished with errors.");
        Err(DeployError::Incomplete)
    }
}

/// Print the URLs under which the uploaded assets are served.
pub(crate) fn print_urls(progress: &ProgressBar, urls: &EndpointUrls) {
    progress.println(format!("Frontend canister: {}", urls.local));
    progress.println(format!("Frontend canister: {}", urls.gateway));
}
