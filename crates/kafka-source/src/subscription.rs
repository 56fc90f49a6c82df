use crate::context::BridgeContext;
use crate::error::{Error, Result};
use crate::state::{StateCell, SubscriptionState};
use futures::stream::{FusedStream, Stream, StreamExt};
use kafka_types::Message;
use rdkafka::consumer::StreamConsumer;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, info, warn};

/// Ordered, live sequence of consumed messages.
///
/// Order holds within a partition only. Once the stream has ended (the
/// subscription was closed) it keeps returning `None`; a new `connect` is
/// needed to consume again.
pub struct MessageStream {
    rx: mpsc::Receiver<Message>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    done: bool,
}

impl MessageStream {
    pub(crate) fn new(rx: mpsc::Receiver<Message>, token: CancellationToken) -> Self {
        Self {
            rx,
            cancelled: Box::pin(token.cancelled_owned()),
            done: false,
        }
    }

    /// Wait for the next message. Returns `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<Message> {
        self.next().await
    }

    // Messages still buffered in the channel are discarded.
    fn finish(&mut self) {
        self.done = true;
        self.rx.close();
    }
}

impl Stream for MessageStream {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.finish();
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(message)) => Poll::Ready(Some(message)),
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl FusedStream for MessageStream {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

/// What keeps the event senders alive: the consumer owns the callback
/// context, which owns the fault and notice senders.
pub(crate) enum EventSource {
    Kafka(Arc<StreamConsumer<BridgeContext>>),
    #[cfg(test)]
    Detached(BridgeContext),
}

/// Owner of a live subscription: the consumer, the forwarding task and both
/// observers. Closing it is the only way to cancel consumption.
pub struct SubscriptionHandle {
    group_id: String,
    topic: String,
    token: CancellationToken,
    state: StateCell,
    source: Option<EventSource>,
    forwarder: Option<JoinHandle<()>>,
    fault_observer: Option<JoinHandle<u64>>,
    rebalance_observer: Option<JoinHandle<u64>>,
}

impl SubscriptionHandle {
    pub fn state(&self) -> SubscriptionState {
        self.state.get()
    }

    /// Watch state changes, e.g. to notice a close caused by a fatal error.
    pub fn watch_state(&self) -> watch::Receiver<SubscriptionState> {
        self.state.subscribe()
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Close the subscription and wait for every background task to finish.
    ///
    /// The message stream stops yielding immediately; records fetched but not
    /// yet read are discarded.
    pub async fn close(mut self) -> Result<()> {
        self.shutdown().await
    }

    async fn shutdown(&mut self) -> Result<()> {
        if self.state.transition(SubscriptionState::Closed) {
            info!(
                "Closing subscription to topic {} (group {})",
                self.topic, self.group_id
            );
        }
        self.token.cancel();

        if let Some(forwarder) = self.forwarder.take() {
            forwarder
                .await
                .map_err(|e| Error::Join(format!("message forwarder: {e}")))?;
        }

        // Dropping the consumer leaves the group and blocks on librdkafka, so
        // it happens off the async workers. It also drops the event senders.
        match self.source.take() {
            Some(EventSource::Kafka(consumer)) => {
                tokio::task::spawn_blocking(move || drop(consumer))
                    .await
                    .map_err(|e| Error::Join(format!("consumer shutdown: {e}")))?;
            }
            #[cfg(test)]
            Some(EventSource::Detached(context)) => drop(context),
            None => {}
        }

        let mut faults = 0;
        if let Some(observer) = self.fault_observer.take() {
            faults = observer
                .await
                .map_err(|e| Error::Join(format!("fault observer: {e}")))?;
        }
        let mut notices = 0;
        if let Some(observer) = self.rebalance_observer.take() {
            notices = observer
                .await
                .map_err(|e| Error::Join(format!("rebalance observer: {e}")))?;
        }
        debug!(
            "Subscription to {} closed ({faults} faults, {notices} rebalance notices observed)",
            self.topic
        );
        Ok(())
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if self.state.transition(SubscriptionState::Closed) {
            warn!(
                "Subscription to topic {} dropped without close; background tasks are detached",
                self.topic
            );
        }
        self.token.cancel();
    }
}

/// An established subscription: the message stream plus its handle.
pub struct Subscription {
    stream: MessageStream,
    handle: SubscriptionHandle,
}

pub(crate) struct SubscriptionParts {
    pub group_id: String,
    pub topic: String,
    pub token: CancellationToken,
    pub state: StateCell,
    pub source: EventSource,
    pub messages: mpsc::Receiver<Message>,
    pub forwarder: Option<JoinHandle<()>>,
    pub fault_observer: JoinHandle<u64>,
    pub rebalance_observer: JoinHandle<u64>,
}

impl Subscription {
    pub(crate) fn from_parts(parts: SubscriptionParts) -> Self {
        let stream = MessageStream::new(parts.messages, parts.token.clone());
        let handle = SubscriptionHandle {
            group_id: parts.group_id,
            topic: parts.topic,
            token: parts.token,
            state: parts.state,
            source: Some(parts.source),
            forwarder: parts.forwarder,
            fault_observer: Some(parts.fault_observer),
            rebalance_observer: Some(parts.rebalance_observer),
        };
        Self { stream, handle }
    }

    /// Separate the stream from its handle so they can live in different tasks.
    pub fn split(self) -> (MessageStream, SubscriptionHandle) {
        (self.stream, self.handle)
    }

    pub async fn recv(&mut self) -> Option<Message> {
        self.stream.recv().await
    }

    pub fn state(&self) -> SubscriptionState {
        self.handle.state()
    }

    pub fn group_id(&self) -> &str {
        self.handle.group_id()
    }

    pub async fn close(self) -> Result<()> {
        self.handle.close().await
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        Pin::new(&mut self.get_mut().stream).poll_next(cx)
    }
}
