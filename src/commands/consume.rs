use crate::config::parse_duration;
use crate::ConsumerOpts;
use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use sink_consumer_kafka_source::{connect_with, ConnectionParams, Message};
use std::future::Future;
use std::io::Write;
use tracing::{debug, info, warn};

/// Why [`drain`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stream ended (subscription closed underneath us)
    StreamEnded,
    /// `--max-messages` was reached
    Limit,
    /// The shutdown future resolved (Ctrl-C or `--timeout`)
    Shutdown,
}

/// Join the consumer group, print records as JSON lines until stopped,
/// then close the subscription.
pub async fn run_consume(params: ConnectionParams, opts: &ConsumerOpts) -> Result<()> {
    let options = opts.consumer_options()?;
    let deadline = opts
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("Invalid --timeout")?;

    let topic = params.topic.clone();
    let subscription = connect_with(params, options)
        .await
        .with_context(|| format!("Failed to subscribe to topic {topic}"))?;
    info!("Subscribed to {topic} as group {}", subscription.group_id());

    let (mut stream, handle) = subscription.split();

    let shutdown = async move {
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, stopping"),
                    _ = tokio::time::sleep(deadline) => info!("Timeout of {deadline:?} reached, stopping"),
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
                info!("Received Ctrl-C, stopping");
            }
        }
    };

    let mut out = std::io::stdout();
    let drained = drain(&mut stream, opts.max_messages, shutdown, &mut out).await;
    let (count, reason) = close_after(drained, handle.close()).await?;

    info!("Consumed {count} messages from {topic} ({reason:?})");
    Ok(())
}

/// Run `close` whatever `outcome` is, then report the outcome's error first.
async fn close_after<T, C>(outcome: Result<T>, close: C) -> Result<T>
where
    C: Future<Output = sink_consumer_kafka_source::Result<()>>,
{
    let closed = close.await;
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e).context("Failed to close subscription"),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!("Failed to close subscription: {close_err}");
            }
            Err(e)
        }
    }
}

/// Write each message from `stream` to `out` as one JSON line until the
/// stream ends, `limit` messages were written, or `shutdown` resolves.
pub async fn drain<S, F, W>(
    stream: &mut S,
    limit: Option<u64>,
    shutdown: F,
    out: &mut W,
) -> Result<(u64, StopReason)>
where
    S: Stream<Item = Message> + Unpin,
    F: Future<Output = ()>,
    W: Write,
{
    let mut count = 0u64;
    if limit == Some(0) {
        return Ok((count, StopReason::Limit));
    }

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok((count, StopReason::Shutdown)),
            next = stream.next() => {
                let Some(message) = next else {
                    return Ok((count, StopReason::StreamEnded));
                };
                debug!("{}[{}]@{}", message.topic, message.partition, message.offset);
                serde_json::to_writer(&mut *out, &message)?;
                writeln!(out)?;

                count += 1;
                if count % 1000 == 0 {
                    info!("Consumed {count} messages");
                }
                if limit.is_some_and(|l| count >= l) {
                    out.flush()?;
                    return Ok((count, StopReason::Limit));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use sink_consumer_kafka_source::Error as BridgeError;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Writer standing in for stdout after the reading end of a pipe closed.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    fn message(offset: i64, value: &str) -> Message {
        Message {
            topic: "events".to_string(),
            partition: 0,
            offset,
            key: None,
            value: Some(value.as_bytes().to_vec()),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_drain_writes_json_lines_until_stream_ends() {
        let mut input = stream::iter(vec![message(1, "a"), message(2, "b")]);
        let mut out = Vec::new();

        let (count, reason) = drain(&mut input, None, std::future::pending(), &mut out)
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(reason, StopReason::StreamEnded);
        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["offset"], 1);
        assert_eq!(lines[1]["value"], "b");
    }

    #[tokio::test]
    async fn test_drain_stops_at_limit() {
        let mut input = stream::iter((0..10).map(|i| message(i, "x")));
        let mut out = Vec::new();

        let (count, reason) = drain(&mut input, Some(3), std::future::pending(), &mut out)
            .await
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(reason, StopReason::Limit);
        // The rest of the stream is untouched
        assert_eq!(input.next().await.map(|m| m.offset), Some(3));
    }

    #[tokio::test]
    async fn test_drain_stops_on_shutdown() {
        let mut input = stream::pending::<Message>();
        let mut out = Vec::new();

        let (count, reason) = drain(&mut input, None, async {}, &mut out)
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert_eq!(reason, StopReason::Shutdown);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_reads_nothing() {
        let mut input = stream::iter(vec![message(1, "a")]);
        let mut out = Vec::new();

        let (count, reason) = drain(&mut input, Some(0), std::future::pending(), &mut out)
            .await
            .unwrap();
        assert_eq!((count, reason), (0, StopReason::Limit));
    }

    #[tokio::test]
    async fn test_write_error_still_closes() {
        let mut input = stream::iter(vec![message(1, "a")]);
        let closed = AtomicBool::new(false);

        let drained = drain(&mut input, None, std::future::pending(), &mut BrokenPipe).await;
        assert!(drained.is_err());

        let result = close_after(drained, async {
            closed.store(true, Ordering::SeqCst);
            Ok::<(), BridgeError>(())
        })
        .await;

        assert!(closed.load(Ordering::SeqCst));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_close_error_is_reported_after_clean_drain() {
        let result = close_after(Ok(3u64), async {
            Err::<(), _>(BridgeError::Join("forwarder panicked".to_string()))
        })
        .await;

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("forwarder panicked"));
    }

    #[tokio::test]
    async fn test_drain_error_wins_over_close_error() {
        let result: Result<u64> = close_after(Err(anyhow::anyhow!("stdout closed")), async {
            Err::<(), _>(BridgeError::Join("observer".to_string()))
        })
        .await;

        assert_eq!(result.unwrap_err().to_string(), "stdout closed");
    }
}
