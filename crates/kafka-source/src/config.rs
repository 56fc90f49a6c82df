use crate::error::{Error, Result};
use rdkafka::config::ClientConfig;
use std::fmt;
use std::time::Duration;

/// Suffix appended to the username when no consumer group is given.
pub const DEFAULT_GROUP_SUFFIX: &str = "go";

/// Everything needed to join a consumer group on a single topic.
///
/// Transport is always TLS with SASL/PLAIN authentication; there is no
/// plaintext mode.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Bootstrap brokers (host:port), in the order they were given
    pub brokers: Vec<String>,
    /// Topic to consume from
    pub topic: String,
    /// SASL username, also used as the Kafka client id
    pub username: String,
    /// SASL password
    pub password: String,
    /// Consumer group ID
    ///
    /// When absent or empty the group is derived from the username, see
    /// [`ConnectionParams::group_id`].
    pub group_id: Option<String>,
}

impl ConnectionParams {
    pub fn new<I, S>(
        brokers: I,
        topic: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let params = Self {
            brokers: brokers.into_iter().map(Into::into).collect(),
            topic: topic.into(),
            username: username.into(),
            password: password.into(),
            group_id: None,
        };
        params.validate()?;
        Ok(params)
    }

    /// Build params from a comma-delimited broker list such as
    /// `"b1:9093,b2:9093"`.
    pub fn from_broker_list(
        brokers: &str,
        topic: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::new(parse_brokers(brokers), topic, username, password)
    }

    pub fn with_group_id(mut self, group_id: Option<String>) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.brokers.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one broker address is required".to_string(),
            ));
        }
        if let Some(empty) = self.brokers.iter().find(|b| b.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "broker address must not be blank: {empty:?}"
            )));
        }
        if self.topic.trim().is_empty() {
            return Err(Error::InvalidConfig("topic must not be empty".to_string()));
        }
        Ok(())
    }

    /// Effective consumer group: the configured one, or `<username>.go`.
    pub fn group_id(&self) -> String {
        match self.group_id.as_deref() {
            Some(group) if !group.is_empty() => group.to_string(),
            _ => format!("{}.{}", self.username, DEFAULT_GROUP_SUFFIX),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.username
    }

    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("brokers", &self.brokers)
            .field("topic", &self.topic)
            .field("username", &self.username)
            .field("password", &"***")
            .field("group_id", &self.group_id)
            .finish()
    }
}

/// Split a comma-delimited broker list, trimming entries and skipping empty
/// ones. Order and duplicates are preserved.
pub fn parse_brokers(brokers: &str) -> Vec<String> {
    brokers
        .split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

/// Consumer tunables that are not part of the connection identity.
#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    /// Capacity of the message channel between the consumer and the caller
    ///
    /// Once full, the consumer stops pulling records until the caller reads.
    pub buffer_size: usize,
    /// Session timeout in milliseconds
    pub session_timeout_ms: String,
    /// Auto offset reset strategy ("earliest" or "latest")
    ///
    /// Only applies when the group has no committed offset for a partition.
    pub auto_offset_reset: String,
    /// Enable auto commit
    ///
    /// Offsets are left to the consumer-group protocol, so this is on by default.
    pub enable_auto_commit: bool,
    /// Upper bound on the initial broker handshake in `connect`
    pub handshake_timeout: Duration,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            session_timeout_ms: "30000".to_string(),
            auto_offset_reset: "latest".to_string(),
            enable_auto_commit: true,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// librdkafka configuration for a bridge consumer.
pub fn client_config(params: &ConnectionParams, options: &ConsumerOptions) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", params.bootstrap_servers())
        .set("security.protocol", "SASL_SSL")
        .set("sasl.mechanisms", "PLAIN")
        .set("sasl.username", &params.username)
        .set("sasl.password", &params.password)
        .set("client.id", params.client_id())
        .set("group.id", params.group_id())
        .set("enable.auto.commit", options.enable_auto_commit.to_string())
        .set("auto.offset.reset", &options.auto_offset_reset)
        .set("session.timeout.ms", &options.session_timeout_ms)
        .set("enable.partition.eof", "false");
    config
}
