use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use push_core::PushContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims of a session token issued by the managed auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Authenticated user information
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

const PUBLIC_PATHS: &[&str] = &["/health", "/api/v1/push/vapid-public-key"];

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Extract JWT token from Authorization header
fn extract_token(auth_header: Option<&str>) -> Option<String> {
    auth_header?
        .strip_prefix("Bearer ")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Verify an HS256 token and return the user id carried in `sub`.
pub fn verify_token(token: &str, secret: &str) -> Result<Uuid, StatusCode> {
    let decoding_key = DecodingKey::from_secret(secret.as_ref());
    let mut validation = Validation::default();
    // Session tokens carry an audience we do not pin.
    validation.validate_aud = false;

    let claims = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(token_data) => token_data.claims,
        Err(e) => {
            tracing::debug!("JWT verification failed: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    Uuid::parse_str(&claims.sub).map_err(|_| {
        tracing::debug!("JWT subject is not a user id: {}", claims.sub);
        StatusCode::UNAUTHORIZED
    })
}

/// Axum middleware for JWT authentication
pub async fn auth_middleware(mut req: Request, next: axum::middleware::Next) -> Result<Response, StatusCode> {
    if is_public(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match extract_token(auth_header) {
        Some(t) => t,
        None => {
            tracing::debug!("Missing Authorization header");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let ctx = req
        .extensions()
        .get::<PushContext>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let user_id = verify_token(&token, &ctx.config.server.jwt_secret)?;

    req.extensions_mut().insert(AuthenticatedUser { user_id });

    tracing::debug!("Authenticated user: {}", user_id);

    Ok(next.run(req).await)
}
