//! Command-line interface for sink-consumer
//!
//! # Usage Examples
//!
//! ## Control plane
//! ```bash
//! # List the sinks configured for an agent
//! sink-consumer sinks --agent-id 48a7e6f5-fe4e-4579-a12b-c7d39729d546 \
//!   --api-url https://api.example.com --api-username me --api-password secret
//!
//! # Show one sink (consumer password masked)
//! sink-consumer sink --agent-id 48a7e6f5-fe4e-4579-a12b-c7d39729d546 --sink default
//! ```
//!
//! ## Consuming
//! ```bash
//! # Consume the topic behind a sink, stop after 100 messages
//! sink-consumer consume --agent-id 48a7e6f5-fe4e-4579-a12b-c7d39729d546 \
//!   --sink default --max-messages 100
//!
//! # Consume with explicit broker settings
//! sink-consumer consume-direct --brokers b1:9093,b2:9093 --topic events \
//!   --username svc --password secret --auto-offset-reset earliest
//! ```
//!
//! Records are printed to stdout as one JSON object per line; logs go to
//! stderr and are filtered with `RUST_LOG`.

use clap::{Parser, Subcommand};
use sink_consumer::{commands, ApiOpts, ConsumerOpts, DirectOpts};

#[derive(Parser)]
#[command(name = "sink-consumer")]
#[command(about = "Consume an agent's Kafka sink using configuration from the control plane")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sink names configured for an agent
    Sinks {
        /// Agent (collector) identifier
        #[arg(long)]
        agent_id: String,

        #[command(flatten)]
        api: ApiOpts,
    },

    /// Show one sink configuration as JSON
    Sink {
        /// Agent (collector) identifier
        #[arg(long)]
        agent_id: String,

        /// Sink name
        #[arg(long)]
        sink: String,

        #[command(flatten)]
        api: ApiOpts,
    },

    /// Consume the topic of a sink fetched from the control plane
    Consume {
        /// Agent (collector) identifier
        #[arg(long)]
        agent_id: String,

        /// Sink name
        #[arg(long)]
        sink: String,

        /// Consumer group ID (default: the sink's group, else "<user>.go")
        #[arg(long)]
        group_id: Option<String>,

        #[command(flatten)]
        api: ApiOpts,

        #[command(flatten)]
        consumer: ConsumerOpts,
    },

    /// Consume a topic with explicit broker settings
    ConsumeDirect {
        #[command(flatten)]
        direct: DirectOpts,

        #[command(flatten)]
        consumer: ConsumerOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only records
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sinks { agent_id, api } => commands::run_sinks(&api, &agent_id).await?,
        Commands::Sink {
            agent_id,
            sink,
            api,
        } => commands::run_sink(&api, &agent_id, &sink).await?,
        Commands::Consume {
            agent_id,
            sink,
            group_id,
            api,
            consumer,
        } => {
            let params = commands::resolve_sink(&api, &agent_id, &sink, group_id).await?;
            commands::run_consume(params, &consumer).await?;
        }
        Commands::ConsumeDirect { direct, consumer } => {
            let params = direct.connection_params()?;
            commands::run_consume(params, &consumer).await?;
        }
    }

    Ok(())
}
