//! sink-consumer library
//!
//! Glue between the collector control plane and the Kafka consumption
//! bridge: command-line option groups and the mapping from a sink
//! configuration to broker connection parameters.
//!
//! # Crates
//!
//! - `sink_consumer_kafka_source` - authenticated consumer-group bridge
//! - `sink_consumer_control_plane` - REST client for sink configurations
//! - `kafka_types` - message, fault and rebalance types
//!
//! # CLI Usage
//!
//! ```bash
//! # List the sinks of an agent
//! sink-consumer sinks --agent-id 48a7e6f5-... --api-url https://api.example.com
//!
//! # Consume a sink by name
//! sink-consumer consume --agent-id 48a7e6f5-... --sink default --max-messages 100
//!
//! # Consume with explicit broker parameters
//! sink-consumer consume-direct --brokers b1:9093,b2:9093 --topic events \
//!   --username svc --password secret
//! ```

use clap::Parser;
use sink_consumer_kafka_source::{ConnectionParams, ConsumerOptions};

pub mod commands;
pub mod config;
pub mod sink;

pub use sink::connection_params;

/// Control-plane connection options
#[derive(Parser, Clone, Debug)]
pub struct ApiOpts {
    /// Control-plane base URL
    #[arg(long, env = "SINK_API_URL")]
    pub api_url: String,

    /// Control-plane username (exchanged for a bearer token)
    #[arg(long, env = "SINK_API_USERNAME")]
    pub api_username: Option<String>,

    /// Control-plane password
    #[arg(long, env = "SINK_API_PASSWORD", hide_env_values = true)]
    pub api_password: Option<String>,

    /// Pre-issued bearer token; skips the token exchange when set
    #[arg(long, env = "SINK_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}

/// Consumer tuning options
#[derive(Parser, Clone, Debug)]
pub struct ConsumerOpts {
    /// Number of messages buffered between Kafka and the output
    #[arg(long, default_value_t = 1000)]
    pub buffer_size: usize,

    /// Session timeout in milliseconds
    #[arg(long, default_value = "30000")]
    pub session_timeout_ms: String,

    /// Where to start when the group has no committed offset ("earliest" or "latest")
    #[arg(long, default_value = "latest")]
    pub auto_offset_reset: String,

    /// Maximum time to wait for the initial broker handshake
    /// Format: duration in seconds or with units like "500ms", "10s", "1m"
    #[arg(long, default_value = "10s")]
    pub handshake_timeout: String,

    /// Stop after this many messages
    #[arg(long)]
    pub max_messages: Option<u64>,

    /// Stop after this long (same format as --handshake-timeout)
    #[arg(long)]
    pub timeout: Option<String>,
}

impl ConsumerOpts {
    pub fn consumer_options(&self) -> anyhow::Result<ConsumerOptions> {
        Ok(ConsumerOptions {
            buffer_size: self.buffer_size,
            session_timeout_ms: self.session_timeout_ms.clone(),
            auto_offset_reset: self.auto_offset_reset.clone(),
            handshake_timeout: config::parse_duration(&self.handshake_timeout)?,
            ..Default::default()
        })
    }
}

/// Explicit broker connection options, bypassing the control plane
#[derive(Parser, Clone, Debug)]
pub struct DirectOpts {
    /// Kafka brokers (comma-separated or multiple --brokers)
    #[arg(long, value_delimiter = ',', required = true, env = "KAFKA_BROKERS")]
    pub brokers: Vec<String>,

    /// Topic to consume from
    #[arg(long, env = "KAFKA_TOPIC")]
    pub topic: String,

    /// SASL username (also the client id)
    #[arg(long, env = "KAFKA_USERNAME")]
    pub username: String,

    /// SASL password
    #[arg(long, env = "KAFKA_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Consumer group ID (default: "<username>.go")
    #[arg(long)]
    pub group_id: Option<String>,
}

impl DirectOpts {
    pub fn connection_params(&self) -> sink_consumer_kafka_source::Result<ConnectionParams> {
        Ok(ConnectionParams::new(
            self.brokers.iter().map(|b| b.trim().to_string()),
            &self.topic,
            &self.username,
            &self.password,
        )?
        .with_group_id(self.group_id.clone()))
    }
}
