//! Shared value types for the sink-consumer Kafka bridge.
//!
//! The bridge crate depends on this crate, never the other way around, so the
//! binary and any downstream caller can name these types without pulling in
//! the consumer machinery.
//!
//! # Modules
//!
//! - [`message`] - Owned copy of a consumed Kafka record
//! - [`event`] - Asynchronous consumer faults and rebalance notices

pub mod event;
pub mod message;

pub use event::{
    ConsumerFault, FaultSource, PartitionClaim, RebalanceKind, RebalanceNotice, RebalancePhase,
};
pub use message::Message;
