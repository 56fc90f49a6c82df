//! Sink configuration to connection parameters.

use sink_consumer_control_plane::SinkConfig;
use sink_consumer_kafka_source::{ConnectionParams, Result};
use tracing::warn;

/// Build broker connection parameters from a sink fetched from the control
/// plane.
///
/// Broker order is kept as served. The consumer group is `group_override`
/// if given, else the sink's own `consumer_group`, else derived from the
/// consumer user.
pub fn connection_params(sink: &SinkConfig, group_override: Option<String>) -> Result<ConnectionParams> {
    if !sink.tls {
        warn!(
            "Sink for topic {} is not flagged tls; connecting over TLS regardless",
            sink.topic
        );
    }
    if !sink.is_enabled() {
        warn!("Sink for topic {} is disabled on the control plane", sink.topic);
    }

    let group_id = group_override
        .filter(|g| !g.is_empty())
        .or_else(|| sink.consumer_group.clone());

    Ok(ConnectionParams::new(
        sink.brokers.iter().cloned(),
        &sink.topic,
        &sink.consumer.user,
        &sink.consumer.password,
    )?
    .with_group_id(group_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(json: &str) -> SinkConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_round_trip_keeps_broker_order() {
        let sink = sink(
            r#"{"brokers":["b1:9093","b2:9093"],"topic":"t","tls":true,
                "consumer":{"user":"u","password":"p"}}"#,
        );
        let params = connection_params(&sink, None).unwrap();

        assert_eq!(params.brokers, vec!["b1:9093", "b2:9093"]);
        assert_eq!(params.topic, "t");
        assert_eq!(params.username, "u");
        assert_eq!(params.password, "p");
        assert_eq!(params.group_id(), "u.go");
    }

    #[test]
    fn test_reversed_brokers_stay_reversed() {
        let sink = sink(
            r#"{"brokers":["b2:9093","b1:9093"],"topic":"t",
                "consumer":{"user":"u","password":"p"}}"#,
        );
        let params = connection_params(&sink, None).unwrap();
        assert_eq!(params.bootstrap_servers(), "b2:9093,b1:9093");
    }

    #[test]
    fn test_group_precedence() {
        let sink = sink(
            r#"{"brokers":["b1:9093"],"topic":"t","consumer_group":"from-sink",
                "consumer":{"user":"svc","password":"p"}}"#,
        );

        let params = connection_params(&sink, None).unwrap();
        assert_eq!(params.group_id(), "from-sink");

        let params = connection_params(&sink, Some("override".to_string())).unwrap();
        assert_eq!(params.group_id(), "override");

        let params = connection_params(&sink, Some(String::new())).unwrap();
        assert_eq!(params.group_id(), "from-sink");
    }

    #[test]
    fn test_sink_without_brokers_is_rejected() {
        let sink = sink(r#"{"brokers":[],"topic":"t","consumer":{"user":"u","password":"p"}}"#);
        assert!(connection_params(&sink, None).is_err());
    }
}
