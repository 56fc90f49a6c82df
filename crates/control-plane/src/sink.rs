//! Sink configuration as served by `GET /collectors/{agent_id}/sinks/{sink_name}`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker-side destination of an agent's data.
///
/// Unknown fields are ignored so the control plane can grow its schema
/// without breaking older consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Broker addresses (host:port), in control-plane order
    pub brokers: Vec<String>,
    pub topic: String,
    #[serde(default)]
    pub tls: bool,
    /// Credentials handed to consumers of this sink
    pub consumer: SinkCredentials,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_message_bytes: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_producer: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Consumer group to join; derived from the consumer user when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_group: Option<String>,
}

impl SinkConfig {
    /// Copy with the consumer password replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.consumer.password = "***".to_string();
        copy
    }

    /// A sink is enabled unless the control plane says otherwise.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkCredentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for SinkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkCredentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_SINK: &str = r#"{
        "brokers": ["b1:9093", "b2:9093"],
        "provider": "managed",
        "max_message_bytes": 1048576,
        "topic": "t",
        "tls": true,
        "type": "kafka",
        "nb_producer": 2,
        "enabled": true,
        "consumer": {"user": "u", "password": "p"},
        "region": "eu-west-1"
    }"#;

    #[test]
    fn test_decode_full_sink() {
        let sink: SinkConfig = serde_json::from_str(FULL_SINK).unwrap();
        assert_eq!(sink.brokers, vec!["b1:9093", "b2:9093"]);
        assert_eq!(sink.topic, "t");
        assert!(sink.tls);
        assert_eq!(sink.consumer.user, "u");
        assert_eq!(sink.consumer.password, "p");
        assert_eq!(sink.provider.as_deref(), Some("managed"));
        assert_eq!(sink.max_message_bytes, Some(1_048_576));
        assert_eq!(sink.kind.as_deref(), Some("kafka"));
        assert_eq!(sink.nb_producer, Some(2));
        assert!(sink.is_enabled());
        assert_eq!(sink.consumer_group, None);
    }

    #[test]
    fn test_decode_minimal_sink() {
        let sink: SinkConfig = serde_json::from_str(
            r#"{"brokers": ["b1:9093"], "topic": "t", "consumer": {"user": "u", "password": "p"}}"#,
        )
        .unwrap();
        assert!(!sink.tls);
        assert!(sink.is_enabled());
        assert_eq!(sink.kind, None);
    }

    #[test]
    fn test_missing_topic_is_rejected() {
        let result: Result<SinkConfig, _> = serde_json::from_str(
            r#"{"brokers": ["b1:9093"], "consumer": {"user": "u", "password": "p"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_redacted_hides_password() {
        let sink: SinkConfig = serde_json::from_str(FULL_SINK).unwrap();
        let json = serde_json::to_value(sink.redacted()).unwrap();
        assert_eq!(json["consumer"]["user"], "u");
        assert_eq!(json["consumer"]["password"], "***");
        assert_eq!(json["type"], "kafka");
        assert!(!format!("{:?}", sink.consumer).contains("\"p\""));
    }
}
