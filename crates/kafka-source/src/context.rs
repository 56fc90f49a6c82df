//! librdkafka callback context.
//!
//! Callbacks run on librdkafka's own threads, so they only push events into
//! unbounded channels and never block. The observers on the other end do the
//! logging.

use crate::state::{StateCell, SubscriptionState};
use kafka_types::{ConsumerFault, FaultSource, RebalanceKind, RebalanceNotice, RebalancePhase};
use rdkafka::consumer::{BaseConsumer, ConsumerContext, Rebalance};
use rdkafka::error::KafkaError;
use rdkafka::ClientContext;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct BridgeContext {
    faults: UnboundedSender<ConsumerFault>,
    notices: UnboundedSender<RebalanceNotice>,
    token: CancellationToken,
    state: StateCell,
}

impl BridgeContext {
    pub(crate) fn new(
        faults: UnboundedSender<ConsumerFault>,
        notices: UnboundedSender<RebalanceNotice>,
        token: CancellationToken,
        state: StateCell,
    ) -> Self {
        Self {
            faults,
            notices,
            token,
            state,
        }
    }

    pub(crate) fn report_fault(&self, fault: ConsumerFault) {
        if fault.fatal && self.state.transition(SubscriptionState::Closed) {
            warn!("Closing subscription after fatal consumer error: {}", fault.reason);
            self.token.cancel();
        }
        if self.faults.send(fault).is_err() {
            debug!("Fault observer already stopped, dropping fault");
        }
    }

    pub(crate) fn report_rebalance(&self, phase: RebalancePhase, rebalance: &Rebalance<'_>) {
        let notice = RebalanceNotice::from_rebalance(phase, rebalance);
        if notice.kind == RebalanceKind::Error {
            let reason = notice.error.clone().unwrap_or_default();
            self.report_fault(ConsumerFault::new(FaultSource::Rebalance, reason));
        }
        if self.notices.send(notice).is_err() {
            debug!("Rebalance observer already stopped, dropping notice");
        }
    }
}

impl ClientContext for BridgeContext {
    fn error(&self, error: KafkaError, reason: &str) {
        self.report_fault(ConsumerFault::from_kafka(FaultSource::Client, &error, reason));
    }
}

impl ConsumerContext for BridgeContext {
    fn pre_rebalance(&self, _base_consumer: &BaseConsumer<Self>, rebalance: &Rebalance) {
        self.report_rebalance(RebalancePhase::Pre, rebalance);
    }

    fn post_rebalance(&self, _base_consumer: &BaseConsumer<Self>, rebalance: &Rebalance) {
        self.report_rebalance(RebalancePhase::Post, rebalance);
    }
}
