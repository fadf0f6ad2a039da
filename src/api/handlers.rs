//! API request handlers

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{AuthError, Identity, TokenAuthenticator, TokenPair};
use crate::error::{ApiError, Result};
use crate::middleware::{InputValidator, ValidationError};
use crate::observability::{SecurityContext, SecurityEvent, SecurityLogger};
use crate::store::{User, UserStore};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UserStore>,
    pub authenticator: Arc<TokenAuthenticator>,
    pub security_log: SecurityLogger,
}

/// JSON request body.
///
/// Unlike `axum::Json` this ignores `Content-Type` and reports every decode
/// failure as a 400, except a body cut off by the size limit, which is a 413.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge
            } else {
                ApiError::Validation(ValidationError::MalformedBody)
            }
        })?;

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|_| ApiError::Validation(ValidationError::MalformedBody))
    }
}

/// Body of create and update requests
#[derive(Debug, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Identity lookup response
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: i64,
    pub email: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Sanitize and validate a create/update body
fn validate_user_payload(
    body: Result<JsonBody<UserPayload>>,
    ctx: &SecurityContext,
    security_log: &SecurityLogger,
) -> Result<UserPayload> {
    let JsonBody(payload) = body.map_err(|e| {
        if matches!(e, ApiError::Validation(_)) {
            security_log.log(SecurityEvent::InvalidInput, ctx, "invalid JSON body");
        }
        e
    })?;

    let name = InputValidator::sanitize_string(&payload.name);
    let email = InputValidator::sanitize_string(&payload.email);

    if name.is_empty() || email.is_empty() {
        return Err(ValidationError::MissingFields.into());
    }

    for (check, detail) in [
        (InputValidator::validate_name(&name), "invalid name format"),
        (InputValidator::validate_email(&email), "invalid email format"),
    ] {
        if let Err(e) = check {
            security_log.log(SecurityEvent::InvalidInput, ctx, detail);
            return Err(e.into());
        }
    }

    Ok(UserPayload { name, email })
}

fn parse_user_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| ValidationError::InvalidId.into())
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("user not found".to_string())
}

/// List all users
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.store.list().await)
}

/// Create a user
pub async fn create_user(
    State(state): State<AppState>,
    ctx: SecurityContext,
    body: Result<JsonBody<UserPayload>>,
) -> Result<impl IntoResponse> {
    let payload = validate_user_payload(body, &ctx, &state.security_log)?;
    let user = state.store.create(&payload.name, &payload.email).await;
    info!(user_id = user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Fetch one user
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<User>> {
    let id = parse_user_id(&id)?;
    state.store.get(id).await.map(Json).ok_or_else(user_not_found)
}

/// Replace a user's name and email
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: SecurityContext,
    body: Result<JsonBody<UserPayload>>,
) -> Result<Json<User>> {
    let id = InputValidator::validate_id(&id)?;
    let payload = validate_user_payload(body, &ctx, &state.security_log)?;

    state
        .store
        .update(id, &payload.name, &payload.email)
        .await
        .map(Json)
        .ok_or_else(user_not_found)
}

/// Delete a user
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_user_id(&id)?;
    if state.store.delete(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(user_not_found())
    }
}

/// Exchange credentials for a token pair
pub async fn login(
    State(state): State<AppState>,
    ctx: SecurityContext,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<TokenPair>> {
    match state.authenticator.login(&req.email, &req.password).await {
        Ok(pair) => {
            state
                .security_log
                .log(SecurityEvent::AuthSuccess, &ctx, "login succeeded");
            Ok(Json(pair))
        }
        Err(e) => {
            if e == AuthError::InvalidCredentials {
                state
                    .security_log
                    .log(SecurityEvent::AuthFailure, &ctx, "invalid credentials");
            }
            Err(e.into())
        }
    }
}

/// Exchange a valid token for a fresh pair
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Json<TokenPair>> {
    state
        .authenticator
        .refresh(&req.refresh_token)
        .map(Json)
        .map_err(|e| match e {
            AuthError::TokenIssue(_) => e.into(),
            other => {
                debug!(reason = %other, "Refresh rejected");
                AuthError::InvalidRefreshToken.into()
            }
        })
}

/// Identity attached by the bearer-auth stage
pub async fn me(identity: Identity) -> Result<Json<MeResponse>> {
    let claims = identity.claims().ok_or(AuthError::Unauthenticated)?;
    Ok(Json(MeResponse {
        user_id: claims.user_id,
        email: claims.email.clone(),
    }))
}

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

/// Fallback for unmatched paths
pub async fn not_found() -> ApiError {
    ApiError::NotFound("not found".to_string())
}

/// Fallback for unsupported methods on a known path
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
