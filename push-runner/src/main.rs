use anyhow::Result;
use push_api::run as run_api;
use push_core::{Config, PushContext};
use push_delivery::run as run_delivery;
use push_notify::run as run_notify;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Malik Collection push server");

    let config = Config::from_env();
    let ctx = PushContext::new(config).await?;

    tracing::info!("Push context initialized");

    let ctx_clone = ctx.clone();
    tokio::spawn(async move {
        if let Err(e) = run_notify(ctx_clone).await {
            tracing::error!("Notification consumer error: {}", e);
        }
    });

    let ctx_clone = ctx.clone();
    tokio::spawn(async move {
        if let Err(e) = run_delivery(ctx_clone).await {
            tracing::error!("Delivery consumer error: {}", e);
        }
    });

    tokio::select! {
        result = run_api(ctx) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
    }

    Ok(())
}
