//! Kafka message types.
//!
//! Records are copied out of librdkafka's borrowed buffers as soon as they are
//! received so that they can cross task boundaries and outlive the consumer.

use base64::Engine;
use rdkafka::message::{BorrowedMessage, Message as RdkafkaMessage};
use serde::Serialize;

/// A consumed Kafka record with its metadata.
///
/// Key and value are passed through untouched; the bridge never interprets
/// payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Kafka topic name
    pub topic: String,
    /// Kafka partition number
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
    /// Message key (if any)
    #[serde(serialize_with = "serialize_bytes")]
    pub key: Option<Vec<u8>>,
    /// Message value (if any, tombstones have none)
    #[serde(serialize_with = "serialize_bytes")]
    pub value: Option<Vec<u8>>,
    /// Message timestamp in milliseconds since epoch (if available)
    pub timestamp: Option<i64>,
}

impl Message {
    /// Value as UTF-8, if present and valid.
    pub fn value_str(&self) -> Option<&str> {
        self.value
            .as_deref()
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Key as UTF-8, if present and valid.
    pub fn key_str(&self) -> Option<&str> {
        self.key.as_deref().and_then(|k| std::str::from_utf8(k).ok())
    }
}

impl From<&BorrowedMessage<'_>> for Message {
    fn from(msg: &BorrowedMessage<'_>) -> Self {
        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key: msg.key().map(|k| k.to_vec()),
            value: msg.payload().map(|p| p.to_vec()),
            timestamp: msg.timestamp().to_millis(),
        }
    }
}

// UTF-8 bytes are emitted as strings, anything else as base64.
fn serialize_bytes<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match bytes {
        None => serializer.serialize_none(),
        Some(b) => match std::str::from_utf8(b) {
            Ok(s) => serializer.serialize_some(s),
            Err(_) => serializer
                .serialize_some(&base64::engine::general_purpose::STANDARD.encode(b)),
        },
    }
}
