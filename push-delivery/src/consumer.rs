use anyhow::Result;
use push_core::redpanda::{receive_backoff, DELIVERY_TOPIC};
use push_core::{subscriptions, DeliveryJob, NotificationPayload, PushContext};
use rdkafka::consumer::Consumer;
use rdkafka::Message;
use std::time::Instant;

use crate::webpush::{DeliveryOutcome, WebPushDelivery};

const CONSUMER_GROUP: &str = "push-delivery";

/// Per-job tally of push results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOutSummary {
    pub delivered: usize,
    pub pruned: usize,
    pub failed: usize,
}

impl FanOutSummary {
    fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::Gone => self.pruned += 1,
            DeliveryOutcome::Failed(_) => self.failed += 1,
        }
    }
}

pub async fn run(ctx: PushContext) -> Result<()> {
    tracing::info!("Starting delivery consumer");

    let consumer = ctx.create_consumer(Some(CONSUMER_GROUP))?;
    let web_push = WebPushDelivery::new(&ctx.config.push)?;

    consumer.subscribe(&[DELIVERY_TOPIC])?;

    tracing::info!("Subscribed to topic: {}", DELIVERY_TOPIC);

    let mut error_count = 0u32;
    let mut last_error_log = Instant::now();

    loop {
        match consumer.recv().await {
            Ok(message) => {
                error_count = 0;
                if let Some(payload) = message.payload() {
                    match handle_delivery(&ctx, &web_push, payload).await {
                        Ok(summary) => tracing::debug!("Processed delivery job: {:?}", summary),
                        Err(e) => tracing::error!("Error processing delivery job: {}", e),
                    }
                }
            }
            Err(e) => {
                error_count += 1;
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

async fn handle_delivery(ctx: &PushContext, web_push: &WebPushDelivery, payload: &[u8]) -> Result<FanOutSummary> {
    let job: DeliveryJob = serde_json::from_slice(payload)?;
    let mut summary = FanOutSummary::default();

    if !web_push.is_enabled() {
        return Ok(summary);
    }

    let mut conn = ctx.db_pool.get().await?;
    let targets = subscriptions::subscriptions_for_user(&mut conn, job.user_id).await?;
    if targets.is_empty() {
        tracing::debug!("User {} has no push subscriptions", job.user_id);
        return Ok(summary);
    }

    let notification = NotificationPayload::from_record(&job.notification);

    for subscription in &targets {
        let outcome = match web_push.send(subscription, &notification).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!("Failed to send push to subscription {}: {}", subscription.id, e);
                summary.failed += 1;
                continue;
            }
        };

        if outcome == DeliveryOutcome::Gone {
            tracing::info!("Pruning expired push subscription {}", subscription.id);
            if let Err(e) = subscriptions::delete_stale_endpoint(&mut conn, &subscription.endpoint).await {
                tracing::error!("Failed to prune subscription {}: {}", subscription.id, e);
            }
        }
        summary.record(&outcome);
    }

    tracing::info!(
        "Notification {} for user {}: {} delivered, {} pruned, {} failed",
        job.notification.id,
        job.user_id,
        summary.delivered,
        summary.pruned,
        summary.failed
    );

    Ok(summary)
}
