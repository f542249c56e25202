use common::config::Config;
use ic_agent::AgentError;
use indicatif::ProgressBar;

use crate::{
    agent::create_agent, commands::Canister, management::IcManagement, reporter::fetch_logs,
};

/// Logs flow entrypoint.
///
/// Log retrieval is best-effort: failures are logged, and only an unreachable
/// network is reported as an error.
pub(crate) async fn logs(
    Canister { canister_id }: Canister,
    config: &Config,
) -> Result<(), AgentError> {
    let progress = ProgressBar::new_spinner();

    let agent = create_agent(config).await?;
    let management = IcManagement::new(&agent, None);

    fetch_logs(&management, &canister_id, &progress).await;

    progress.finish_and_clear();

    Ok(())
}
