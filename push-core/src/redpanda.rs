use anyhow::{anyhow, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::StreamConsumer;
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RedpandaConfig;

pub type RedpandaProducer = Arc<FutureProducer>;
pub type RedpandaConsumer = Arc<StreamConsumer>;

/// Topic carrying one job per notification record to fan out as Web Push.
pub const DELIVERY_TOPIC: &str = "notifications.delivery";

/// Business events that produce in-app notifications.
pub const EVENT_TOPICS: &[&str] = &[
    "events.inquiry.created",
    "events.payment.due",
    "events.reminder.due",
    "events.car.sold",
];

fn build_client_config(config: &RedpandaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();

    client_config
        .set("bootstrap.servers", &config.brokers)
        .set("metadata.request.timeout.ms", "30000")
        .set("socket.timeout.ms", "30000")
        .set("socket.keepalive.enable", "true")
        // Some hosted brokers only listen on IPv4
        .set("broker.address.family", "v4");

    let ssl_enabled = std::env::var("REDPANDA_SSL_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    if ssl_enabled {
        tracing::info!("SSL/TLS enabled for Redpanda connection");
        client_config.set("security.protocol", "ssl");

        for (env_key, config_key) in [
            ("REDPANDA_SSL_CA_LOCATION", "ssl.ca.location"),
            ("REDPANDA_SSL_CERT_LOCATION", "ssl.certificate.location"),
            ("REDPANDA_SSL_KEY_LOCATION", "ssl.key.location"),
        ] {
            if let Ok(value) = std::env::var(env_key) {
                client_config.set(config_key, &value);
            }
        }
    }

    client_config
}

pub fn create_producer(config: &RedpandaConfig) -> Result<RedpandaProducer> {
    tracing::info!("Creating Redpanda producer for brokers {}", config.brokers);

    let producer: FutureProducer = build_client_config(config)
        .set("message.timeout.ms", "5000")
        .set("acks", "all")
        .set("retries", "3")
        .create()
        .map_err(|e| {
            tracing::error!("Failed to create Redpanda producer for {}: {}", config.brokers, e);
            anyhow!("Failed to create Redpanda producer: {}", e)
        })?;

    Ok(Arc::new(producer))
}

pub fn create_consumer(config: &RedpandaConfig, group_id: Option<&str>) -> Result<RedpandaConsumer> {
    let group = group_id.unwrap_or(&config.consumer_group);
    tracing::info!("Creating Redpanda consumer (brokers: {}, group: {})", config.brokers, group);

    let consumer: StreamConsumer = build_client_config(config)
        .set("group.id", group)
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "30000")
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()
        .map_err(|e| {
            tracing::error!("Failed to create Redpanda consumer for {} ({}): {}", config.brokers, group, e);
            anyhow!("Failed to create Redpanda consumer: {}", e)
        })?;

    Ok(Arc::new(consumer))
}

pub async fn produce_message(
    producer: &RedpandaProducer,
    topic: &str,
    key: Option<&str>,
    payload: &[u8],
) -> Result<()> {
    let mut record = FutureRecord::to(topic).payload(payload);

    if let Some(k) = key {
        record = record.key(k);
    }

    match producer.send(record, Duration::from_secs(5)).await {
        Ok((partition, offset)) => {
            tracing::debug!(
                "Message delivered to topic {} partition {} offset {}",
                topic,
                partition,
                offset
            );
            Ok(())
        }
        Err((e, _)) => {
            tracing::error!("Failed to deliver message to topic {}: {:?}", topic, e);
            Err(anyhow!("Failed to deliver message: {:?}", e))
        }
    }
}

pub async fn produce_json<T: Serialize>(
    producer: &RedpandaProducer,
    topic: &str,
    key: &str,
    value: &T,
) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    produce_message(producer, topic, Some(key), &payload).await
}

/// Delay before the next receive after `error_count` consecutive failures:
/// 1s, 2s, 4s ... capped at 30s.
pub fn receive_backoff(error_count: u32) -> Duration {
    let exponent = error_count.saturating_sub(1).min(5);
    Duration::from_secs(1 << exponent).min(Duration::from_secs(30))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_backoff() {
        assert_eq!(receive_backoff(1), Duration::from_secs(1));
        assert_eq!(receive_backoff(2), Duration::from_secs(2));
        assert_eq!(receive_backoff(3), Duration::from_secs(4));
        assert_eq!(receive_backoff(6), Duration::from_secs(30));
        assert_eq!(receive_backoff(40), Duration::from_secs(30));
    }
}
