//! Out-of-band events raised by a live subscription.
//!
//! Neither kind of event interrupts message delivery. Faults are logged at
//! error level and rebalance notices at debug level by the bridge's observers.

use rdkafka::consumer::Rebalance;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::TopicPartitionList;
use std::fmt;

/// Where an asynchronous fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSource {
    /// librdkafka client-level error callback (broker down, auth, ...)
    Client,
    /// Error returned while receiving a message from a partition
    Receive,
    /// Error reported through a rebalance callback
    Rebalance,
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Receive => write!(f, "receive"),
            Self::Rebalance => write!(f, "rebalance"),
        }
    }
}

/// A partition or broker level failure observed after a successful connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerFault {
    pub source: FaultSource,
    pub reason: String,
    /// The client cannot recover (e.g. the member was fenced from its group).
    pub fatal: bool,
}

impl ConsumerFault {
    pub fn new(source: FaultSource, reason: impl Into<String>) -> Self {
        Self {
            source,
            reason: reason.into(),
            fatal: false,
        }
    }

    pub fn from_kafka(source: FaultSource, error: &KafkaError, reason: &str) -> Self {
        let fatal = matches!(
            error.rdkafka_error_code(),
            Some(RDKafkaErrorCode::Fatal) | Some(RDKafkaErrorCode::FencedInstanceId)
        );
        let reason = if reason.is_empty() {
            error.to_string()
        } else {
            format!("{error}: {reason}")
        };
        Self {
            source,
            reason,
            fatal,
        }
    }
}

impl fmt::Display for ConsumerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fault: {}", self.source, self.reason)?;
        if self.fatal {
            write!(f, " (fatal)")?;
        }
        Ok(())
    }
}

/// Partition claimed or released by this group member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionClaim {
    pub topic: String,
    pub partition: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceKind {
    Assign,
    Revoke,
    Error,
}

/// Whether the notice was raised before or after librdkafka applied the new
/// assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalancePhase {
    Pre,
    Post,
}

/// A consumer-group membership change, for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceNotice {
    pub kind: RebalanceKind,
    pub phase: RebalancePhase,
    pub partitions: Vec<PartitionClaim>,
    pub error: Option<String>,
}

impl RebalanceNotice {
    pub fn from_rebalance(phase: RebalancePhase, rebalance: &Rebalance<'_>) -> Self {
        match rebalance {
            Rebalance::Assign(tpl) => Self::with_partitions(RebalanceKind::Assign, phase, tpl),
            Rebalance::Revoke(tpl) => Self::with_partitions(RebalanceKind::Revoke, phase, tpl),
            Rebalance::Error(e) => Self {
                kind: RebalanceKind::Error,
                phase,
                partitions: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    pub fn with_partitions(
        kind: RebalanceKind,
        phase: RebalancePhase,
        tpl: &TopicPartitionList,
    ) -> Self {
        let partitions = tpl
            .elements()
            .iter()
            .map(|e| PartitionClaim {
                topic: e.topic().to_string(),
                partition: e.partition(),
            })
            .collect();
        Self {
            kind,
            phase,
            partitions,
            error: None,
        }
    }

    /// Cooperative assignors send empty assign/revoke rounds whenever group
    /// membership changes, even when nothing moved.
    pub fn is_empty(&self) -> bool {
        self.kind != RebalanceKind::Error && self.partitions.is_empty()
    }
}

impl fmt::Display for RebalanceNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            RebalancePhase::Pre => "pre",
            RebalancePhase::Post => "post",
        };
        match self.kind {
            RebalanceKind::Error => write!(
                f,
                "{phase}-rebalance error: {}",
                self.error.as_deref().unwrap_or("unknown")
            ),
            kind => {
                let verb = if kind == RebalanceKind::Assign {
                    "assign"
                } else {
                    "revoke"
                };
                let parts: Vec<String> = self
                    .partitions
                    .iter()
                    .map(|p| format!("{}[{}]", p.topic, p.partition))
                    .collect();
                write!(f, "{phase}-rebalance {verb}: {}", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::Offset;

    fn tpl(parts: &[(&str, i32)]) -> TopicPartitionList {
        let mut tpl = TopicPartitionList::new();
        for (topic, partition) in parts {
            tpl.add_partition_offset(topic, *partition, Offset::Invalid)
                .unwrap();
        }
        tpl
    }

    #[test]
    fn test_assign_notice_lists_partitions() {
        let list = tpl(&[("events", 0), ("events", 2)]);
        let notice =
            RebalanceNotice::from_rebalance(RebalancePhase::Post, &Rebalance::Assign(&list));

        assert_eq!(notice.kind, RebalanceKind::Assign);
        assert_eq!(notice.phase, RebalancePhase::Post);
        assert_eq!(
            notice.partitions,
            vec![
                PartitionClaim {
                    topic: "events".to_string(),
                    partition: 0
                },
                PartitionClaim {
                    topic: "events".to_string(),
                    partition: 2
                },
            ]
        );
        assert!(!notice.is_empty());
        assert_eq!(
            notice.to_string(),
            "post-rebalance assign: events[0], events[2]"
        );
    }

    #[test]
    fn test_empty_revoke_is_empty() {
        let list = TopicPartitionList::new();
        let notice =
            RebalanceNotice::from_rebalance(RebalancePhase::Pre, &Rebalance::Revoke(&list));
        assert_eq!(notice.kind, RebalanceKind::Revoke);
        assert!(notice.is_empty());
    }

    #[test]
    fn test_fault_display() {
        let fault = ConsumerFault::new(FaultSource::Receive, "leader not available");
        assert_eq!(fault.to_string(), "receive fault: leader not available");
        assert!(!fault.fatal);

        let fault = ConsumerFault {
            fatal: true,
            ..ConsumerFault::new(FaultSource::Client, "fenced")
        };
        assert_eq!(fault.to_string(), "client fault: fenced (fatal)");
    }

    #[test]
    fn test_fault_from_kafka_error() {
        let err = KafkaError::Global(RDKafkaErrorCode::AllBrokersDown);
        let fault =
            ConsumerFault::from_kafka(FaultSource::Client, &err, "2/2 brokers are down");
        assert!(!fault.fatal);
        assert!(fault.reason.ends_with("2/2 brokers are down"));

        let err = KafkaError::Global(RDKafkaErrorCode::Fatal);
        let fault = ConsumerFault::from_kafka(FaultSource::Client, &err, "");
        assert!(fault.fatal);
    }
}
