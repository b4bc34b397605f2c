use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use sagfo_core::{Actor, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn actor(&self) -> Actor {
        Actor::new(self.sub, self.name.clone(), self.role)
    }
}

/// Validates the bearer token and makes the caller available to handlers as
/// an `Extension<Actor>`.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Authentication("missing bearer token".to_string()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Authentication("invalid or expired session".to_string()))?;

    req.extensions_mut().insert(token_data.claims.actor());

    Ok(next.run(req).await)
}

fn check_role(req: &Request, role: Role) -> Result<(), AppError> {
    let actor = req
        .extensions()
        .get::<Actor>()
        .ok_or_else(|| AppError::Authentication("no session".to_string()))?;
    actor.require_any(&[role])?;
    Ok(())
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    check_role(&req, Role::Admin)?;
    Ok(next.run(req).await)
}

pub async fn require_transporter(req: Request, next: Next) -> Result<Response, AppError> {
    check_role(&req, Role::Transporter)?;
    Ok(next.run(req).await)
}
