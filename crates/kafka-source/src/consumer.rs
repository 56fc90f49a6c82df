use crate::config::{client_config, ConnectionParams, ConsumerOptions};
use crate::context::BridgeContext;
use crate::error::{Error, Result};
use crate::observer::{spawn_fault_observer, spawn_rebalance_observer};
use crate::state::{StateCell, SubscriptionState};
use crate::subscription::{EventSource, Subscription, SubscriptionParts};
use kafka_types::{ConsumerFault, FaultSource, Message};
use rdkafka::consumer::{Consumer as RdkafkaConsumer, StreamConsumer};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type BridgeConsumer = StreamConsumer<BridgeContext>;

/// Connect with default [`ConsumerOptions`].
pub async fn connect(params: ConnectionParams) -> Result<Subscription> {
    connect_with(params, ConsumerOptions::default()).await
}

/// Join the consumer group for `params.topic` and start streaming.
///
/// Returns only once the brokers have answered a metadata request, so an
/// unreachable cluster or rejected credentials surface here as
/// [`Error::Connection`]. Faults after that point are logged by the fault
/// observer and never end the stream.
pub async fn connect_with(
    params: ConnectionParams,
    options: ConsumerOptions,
) -> Result<Subscription> {
    params.validate()?;
    if options.buffer_size == 0 {
        return Err(Error::InvalidConfig("buffer_size must be at least 1".to_string()));
    }

    let state = StateCell::new(SubscriptionState::Disconnected);
    state.transition(SubscriptionState::Connecting);

    let group_id = params.group_id();
    info!(
        "Connecting to {} for topic {} (group {}, client {})",
        params.bootstrap_servers(),
        params.topic,
        group_id,
        params.client_id()
    );

    let token = CancellationToken::new();
    let (fault_tx, fault_rx) = mpsc::unbounded_channel();
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let context = BridgeContext::new(fault_tx.clone(), notice_tx, token.clone(), state.clone());

    // Client errors raised during the handshake are only served by `recv`,
    // which has not started yet; the handshake error is all there is.
    let consumer = match establish(&params, &options, context).await {
        Ok(consumer) => consumer,
        Err(e) => {
            state.transition(SubscriptionState::Disconnected);
            return Err(e);
        }
    };

    state.transition(SubscriptionState::Active);
    info!("Subscribed to topic {} as group {}", params.topic, group_id);

    let (message_tx, message_rx) = mpsc::channel(options.buffer_size);
    let forwarder = spawn_forwarder(Arc::clone(&consumer), message_tx, fault_tx, token.clone());

    Ok(Subscription::from_parts(SubscriptionParts {
        fault_observer: spawn_fault_observer(fault_rx, group_id.clone()),
        rebalance_observer: spawn_rebalance_observer(notice_rx, group_id.clone()),
        group_id,
        topic: params.topic,
        token,
        state,
        source: EventSource::Kafka(consumer),
        messages: message_rx,
        forwarder: Some(forwarder),
    }))
}

/// Create the consumer, subscribe, and wait for the brokers to answer.
async fn establish(
    params: &ConnectionParams,
    options: &ConsumerOptions,
    context: BridgeContext,
) -> Result<Arc<BridgeConsumer>> {
    let consumer: BridgeConsumer = client_config(params, options)
        .create_with_context(context)
        .map_err(|e| Error::Connection(format!("Failed to create consumer: {e}")))?;

    consumer.subscribe(&[&params.topic]).map_err(|e| {
        Error::Connection(format!("Failed to subscribe to topic {}: {e}", params.topic))
    })?;

    let consumer = Arc::new(consumer);
    let probe = Arc::clone(&consumer);
    let topic = params.topic.clone();
    let timeout = options.handshake_timeout;
    let metadata =
        tokio::task::spawn_blocking(move || probe.fetch_metadata(Some(&topic), timeout))
            .await
            .map_err(|e| Error::Join(format!("handshake: {e}")))?;

    match metadata {
        Ok(metadata) => {
            let topic = metadata.topics().iter().find(|t| t.name() == params.topic);
            debug!(
                "Handshake complete: {} brokers, {} partitions for topic {}",
                metadata.brokers().len(),
                topic.map(|t| t.partitions().len()).unwrap_or(0),
                params.topic
            );
            if let Some(err) = topic.and_then(|t| t.error()) {
                warn!(
                    "Broker reported {err:?} for topic {}; waiting for it to become available",
                    params.topic
                );
            }
            Ok(consumer)
        }
        Err(e) => {
            release(consumer).await;
            Err(Error::Connection(format!(
                "Handshake with {} failed: {e}",
                params.bootstrap_servers()
            )))
        }
    }
}

// librdkafka blocks while closing a consumer, keep that off the async workers.
async fn release(consumer: Arc<BridgeConsumer>) {
    if let Err(e) = tokio::task::spawn_blocking(move || drop(consumer)).await {
        warn!("Failed to release consumer: {e}");
    }
}

/// Copy records out of librdkafka into the bounded message channel until the
/// subscription is cancelled or the reader goes away.
fn spawn_forwarder(
    consumer: Arc<BridgeConsumer>,
    messages: mpsc::Sender<Message>,
    faults: mpsc::UnboundedSender<ConsumerFault>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut offsets = OffsetTracker::default();
        let mut forwarded = 0u64;
        loop {
            let received = tokio::select! {
                _ = token.cancelled() => break,
                received = consumer.recv() => received.map(|msg| Message::from(&msg)),
            };

            let message = match received {
                Ok(message) => message,
                Err(e) => {
                    let fault = ConsumerFault::from_kafka(FaultSource::Receive, &e, "");
                    if faults.send(fault).is_err() {
                        debug!("Fault observer gone, dropping receive error: {e}");
                    }
                    continue;
                }
            };

            let previous = offsets.last(&message.topic, message.partition);
            if !offsets.observe(&message) {
                warn!(
                    "Non-increasing offset {} on {}[{}] (previous {previous:?})",
                    message.offset, message.topic, message.partition
                );
            }

            tokio::select! {
                _ = token.cancelled() => break,
                sent = messages.send(message) => {
                    if sent.is_err() {
                        debug!("Message stream dropped, stopping forwarder");
                        break;
                    }
                    forwarded += 1;
                }
            }
        }
        debug!("Forwarder stopped after {forwarded} messages");
    })
}

/// Last delivered offset per topic-partition.
#[derive(Debug, Default)]
pub struct OffsetTracker {
    last: HashMap<(String, i32), i64>,
}

impl OffsetTracker {
    /// Record a delivered message. Returns `false` if its offset does not
    /// strictly increase on its partition; the newer offset is kept either way.
    pub fn observe(&mut self, message: &Message) -> bool {
        let key = (message.topic.clone(), message.partition);
        match self.last.insert(key, message.offset) {
            Some(previous) => message.offset > previous,
            None => true,
        }
    }

    pub fn last(&self, topic: &str, partition: i32) -> Option<i64> {
        self.last.get(&(topic.to_string(), partition)).copied()
    }
}
