use anyhow::{anyhow, Result};
use push_core::redpanda::{receive_backoff, EVENT_TOPICS};
use push_core::PushContext;
use rdkafka::consumer::Consumer;
use rdkafka::Message;
use std::time::Instant;

use crate::service::NotificationService;

const CONSUMER_GROUP: &str = "push-notify";

pub async fn run(ctx: PushContext) -> Result<()> {
    tracing::info!("Starting notification consumer");

    let consumer = ctx.create_consumer(Some(CONSUMER_GROUP))?;
    let service = NotificationService::new(ctx.clone());

    consumer.subscribe(EVENT_TOPICS)?;

    tracing::info!("Subscribed to topics: {:?}", EVENT_TOPICS);

    let mut error_count = 0u32;
    let mut last_error_log = Instant::now();

    loop {
        match consumer.recv().await {
            Ok(message) => {
                error_count = 0;
                if let Some(payload) = message.payload() {
                    match handle_event(&service, payload).await {
                        Ok(()) => tracing::debug!("Processed notification event from {}", message.topic()),
                        Err(e) => tracing::error!("Error processing notification event: {}", e),
                    }
                }
            }
            Err(e) => {
                error_count += 1;
                // Only log every 30 seconds while the broker is unreachable
                if last_error_log.elapsed().as_secs() >= 30 {
                    tracing::warn!(
                        "Error receiving message from Redpanda (error count: {}): {}",
                        error_count,
                        e
                    );
                    last_error_log = Instant::now();
                }
                tokio::time::sleep(receive_backoff(error_count)).await;
            }
        }
    }
}

async fn handle_event(service: &NotificationService, payload: &[u8]) -> Result<()> {
    let event: serde_json::Value = serde_json::from_slice(payload)?;

    let event_type = event
        .get("event_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing event_type"))?;

    let event_data = event
        .get("event_data")
        .ok_or_else(|| anyhow!("Missing event_data"))?;

    service.process_event(event_type, event_data).await
}
