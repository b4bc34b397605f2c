use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use sagfo_core::accounts::NewUser;
use sagfo_core::{Actor, Profile};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    middleware::auth::Claims,
    state::{AppState, AuthConfig},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Profile,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
}

/// Routes that need a session already.
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/v1/auth/me", get(me))
}

pub fn issue_token(auth: &AuthConfig, profile: &Profile) -> Result<String, AppError> {
    let claims = Claims {
        sub: profile.id,
        name: profile.name.clone(),
        role: profile.role,
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state.services.accounts.register(req).await?;
    let token = issue_token(&state.auth, &user)?;
    Ok(Json(AuthResponse { token, user }))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state.services.accounts.login(&req.email, &req.password).await?;
    let token = issue_token(&state.auth, &user)?;
    Ok(Json(AuthResponse { token, user }))
}

async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.services.accounts.profile(actor.id).await?))
}
