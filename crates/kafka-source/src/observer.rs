//! Background observers for a subscription's out-of-band events.
//!
//! Each observer drains one channel until every sender is gone, which happens
//! once the consumer (and with it the callback context) has been dropped.
//! They return how many events they saw.

use kafka_types::{ConsumerFault, RebalanceNotice};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

pub(crate) fn spawn_fault_observer(
    mut faults: UnboundedReceiver<ConsumerFault>,
    group_id: String,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut observed = 0u64;
        while let Some(fault) = faults.recv().await {
            observed += 1;
            error!("Error during consumption (group {group_id}): {fault}");
        }
        debug!("Fault observer for group {group_id} stopped after {observed} faults");
        observed
    })
}

pub(crate) fn spawn_rebalance_observer(
    mut notices: UnboundedReceiver<RebalanceNotice>,
    group_id: String,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut observed = 0u64;
        while let Some(notice) = notices.recv().await {
            observed += 1;
            if notice.is_empty() {
                trace!("Empty rebalance round for group {group_id}: {notice}");
                continue;
            }
            debug!("Rebalanced consumer (group {group_id}): {notice}");
        }
        debug!("Rebalance observer for group {group_id} stopped after {observed} notices");
        observed
    })
}
