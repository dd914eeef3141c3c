use anyhow::Result;
use axum::{
    extract::Extension,
    middleware,
    routing::{get, post},
    Router,
};
use push_core::PushContext;
use std::env;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::auth;
use crate::handlers;

fn cors_layer() -> CorsLayer {
    match env::var("CORS_ORIGINS") {
        Ok(origins) => {
            let mut cors = CorsLayer::new();
            for origin in origins.split(',').map(str::trim).filter(|o| !o.is_empty()) {
                if let Ok(parsed) = origin.parse::<axum::http::HeaderValue>() {
                    cors = cors.allow_origin(parsed);
                }
            }
            cors.allow_methods(Any).allow_headers(Any)
        }
        Err(_) => {
            tracing::warn!("CORS_ORIGINS not set, using permissive CORS. Set CORS_ORIGINS for production!");
            CorsLayer::permissive()
        }
    }
}

pub fn router(ctx: PushContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/push/vapid-public-key", get(handlers::vapid_public_key))
        .route("/api/v1/me", get(handlers::me))
        .route(
            "/api/v1/push-subscriptions",
            post(handlers::upsert_subscription).delete(handlers::delete_subscription),
        )
        .route("/api/v1/notifications", get(handlers::get_notifications))
        .route("/api/v1/notifications/counts", get(handlers::get_notification_counts))
        .route("/api/v1/notifications/read-all", post(handlers::mark_all_read))
        .route("/api/v1/notifications/:id/read", post(handlers::mark_notification_read))
        .layer(
            ServiceBuilder::new()
                .layer(cors_layer())
                .layer(Extension(ctx))
                .layer(middleware::from_fn(auth::auth_middleware)),
        )
}

pub async fn run(ctx: PushContext) -> Result<()> {
    let host: std::net::IpAddr = ctx.config.server.host.parse().unwrap_or([0, 0, 0, 0].into());
    let addr = SocketAddr::new(host, ctx.config.server.api_port);
    let app = router(ctx);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
