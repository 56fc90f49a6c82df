//! Kafka consumption bridge for sink-consumer.
//!
//! Joins a consumer group on a single topic over TLS with SASL/PLAIN and
//! exposes the records as one ordered stream, while rebalances and
//! per-partition errors are absorbed by background observers.
//!
//! # Features
//!
//! - Authenticated transport: SASL_SSL + PLAIN is always on
//! - Consumer Groups: partition assignment is left to the group protocol;
//!   the group id defaults to `<username>.go`
//! - Synchronous handshake: `connect` fails fast when the brokers cannot be
//!   reached or reject the credentials
//! - Observers: faults are logged at error level and rebalances at debug
//!   level, neither interrupts the stream
//! - Clean shutdown: `close` joins every background task before returning
//!
//! # Dependency Direction
//!
//! This crate depends on `kafka-types` for the shared value types (Message,
//! ConsumerFault, RebalanceNotice). It knows nothing about the control plane
//! that supplies its connection parameters.
//!
//! # Example
//!
//! ```ignore
//! use sink_consumer_kafka_source::{connect, ConnectionParams};
//!
//! let params =
//!     ConnectionParams::from_broker_list("b1:9093,b2:9093", "events", "svc", "secret")?;
//! let mut subscription = connect(params).await?;
//! while let Some(message) = subscription.recv().await {
//!     println!("{}[{}]@{}", message.topic, message.partition, message.offset);
//! }
//! ```

/// Connection parameters, consumer tunables and librdkafka configuration
pub mod config;

/// `connect` and the task that forwards records into the message stream
pub mod consumer;
pub mod context;
pub mod error;
mod observer;
pub mod state;

/// The live subscription: message stream and the handle that closes it
pub mod subscription;

// Re-export from kafka-types for convenience
pub use kafka_types::{
    ConsumerFault, FaultSource, Message, PartitionClaim, RebalanceKind, RebalanceNotice,
    RebalancePhase,
};

pub use config::{
    client_config, parse_brokers, ConnectionParams, ConsumerOptions, DEFAULT_GROUP_SUFFIX,
};
pub use consumer::{connect, connect_with, OffsetTracker};
pub use context::BridgeContext;
pub use error::{Error, Result};
pub use state::SubscriptionState;
pub use subscription::{MessageStream, Subscription, SubscriptionHandle};
