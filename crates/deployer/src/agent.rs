use common::config::Config;
use ed25519_consensus::SigningKey;
use ic_agent::{identity::BasicIdentity, Agent, AgentError};
use rand::{thread_rng, RngCore};
use tracing::info;

/// Generate a new Ed25519 identity that only lives for the current run.
fn ephemeral_identity() -> BasicIdentity {
    let mut key = [0; 32];
    thread_rng().fill_bytes(&mut key);
    BasicIdentity::from_signing_key(SigningKey::from(key))
}

/// Create an agent bound to the configured network host.
///
/// Outside of production the network root key is fetched and pinned, since local
/// and test replicas use self-signed trust roots.
pub(crate) async fn create_agent(config: &Config) -> Result<Agent, AgentError> {
    let agent = Agent::builder()
        .with_url(config.host())
        .with_identity(ephemeral_identity())
        .build()?;

    if config.should_fetch_root_key() {
        info!(host = config.host(), "fetching root key");
        agent.fetch_root_key().await?;
    }

    Ok(agent)
}
