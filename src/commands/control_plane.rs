use crate::{connection_params, ApiOpts};
use anyhow::{Context, Result};
use sink_consumer_control_plane::{Client, Credential};
use sink_consumer_kafka_source::ConnectionParams;
use tracing::info;

/// Build a client and obtain a credential, either the pre-issued token or
/// one exchanged for username/password.
pub async fn authenticate(api: &ApiOpts) -> Result<(Client, Credential)> {
    let client = Client::new(&api.api_url)?;

    if let Some(token) = api.api_token.as_deref().filter(|t| !t.is_empty()) {
        return Ok((client, Credential::from_token(token)));
    }

    let (Some(username), Some(password)) = (&api.api_username, &api.api_password) else {
        anyhow::bail!("Either --api-token or both --api-username and --api-password are required");
    };
    let credential = client
        .basic_auth(username, password)
        .await
        .with_context(|| format!("Failed to authenticate {username} against {}", api.api_url))?;
    info!("Authenticated against {} as {username}", client.base_url());

    Ok((client, credential))
}

/// Print the sink names of an agent, one per line.
pub async fn run_sinks(api: &ApiOpts, agent_id: &str) -> Result<()> {
    let (client, credential) = authenticate(api).await?;
    let sinks = client
        .get_sinks(&credential, agent_id)
        .await
        .with_context(|| format!("Failed to list sinks of agent {agent_id}"))?;

    for sink in sinks {
        println!("{sink}");
    }
    Ok(())
}

/// Print one sink configuration as JSON with the consumer password masked.
pub async fn run_sink(api: &ApiOpts, agent_id: &str, sink_name: &str) -> Result<()> {
    let (client, credential) = authenticate(api).await?;
    let sink = client
        .get_sink(&credential, agent_id, sink_name)
        .await
        .with_context(|| format!("Failed to fetch sink {sink_name} of agent {agent_id}"))?;

    println!("{}", serde_json::to_string_pretty(&sink.redacted())?);
    Ok(())
}

/// Fetch a sink and turn it into broker connection parameters.
pub async fn resolve_sink(
    api: &ApiOpts,
    agent_id: &str,
    sink_name: &str,
    group_override: Option<String>,
) -> Result<ConnectionParams> {
    let (client, credential) = authenticate(api).await?;
    let sink = client
        .get_sink(&credential, agent_id, sink_name)
        .await
        .with_context(|| format!("Failed to fetch sink {sink_name} of agent {agent_id}"))?;

    let params = connection_params(&sink, group_override)
        .with_context(|| format!("Sink {sink_name} has unusable connection settings"))?;
    info!(
        "Resolved sink {sink_name}: topic={} brokers={} group={}",
        params.topic,
        params.bootstrap_servers(),
        params.group_id()
    );
    Ok(params)
}
