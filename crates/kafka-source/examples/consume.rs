use futures::StreamExt;
use sink_consumer_kafka_source::{connect_with, ConnectionParams, ConsumerOptions};
use std::time::Duration;

/// Example consuming a topic through the bridge
///
/// This example shows how to:
/// 1. Build connection parameters from a comma-delimited broker list
/// 2. Connect (TLS + SASL/PLAIN) with a bounded handshake
/// 3. Read messages from the stream in a separate task
/// 4. Close the handle, which ends the stream and joins the observers
///
/// To run this example against a SASL_SSL cluster:
///   BROKERS=b1:9093,b2:9093 TOPIC=events KAFKA_USER=svc KAFKA_PASSWORD=secret \
///     RUST_LOG=debug cargo run --example consume

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run_main().await {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let env = |name: &str| std::env::var(name).map_err(|_| anyhow::anyhow!("{name} is not set"));

    let params = ConnectionParams::from_broker_list(
        &env("BROKERS")?,
        env("TOPIC")?,
        env("KAFKA_USER")?,
        env("KAFKA_PASSWORD")?,
    )?;
    let options = ConsumerOptions {
        handshake_timeout: Duration::from_secs(15),
        ..Default::default()
    };

    let subscription = connect_with(params, options).await?;
    println!("Connected as group {}", subscription.group_id());

    let (stream, handle) = subscription.split();

    // Print the first 10 messages, or whatever arrives within 30 seconds.
    let reader = tokio::spawn(async move {
        let mut stream = stream.take(10);
        while let Some(message) = stream.next().await {
            println!(
                "[Topic {} Partition {}] offset {} value {:?}",
                message.topic,
                message.partition,
                message.offset,
                message.value_str()
            );
        }
    });

    let _ = tokio::time::timeout(Duration::from_secs(30), reader).await;
    handle.close().await?;
    println!("Subscription closed");

    Ok(())
}
