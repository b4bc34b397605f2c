use axum::{extract::State, routing::get, Json, Router};
use sagfo_core::site::SiteConfig;

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/site", get(get_site_config))
}

async fn get_site_config(State(state): State<AppState>) -> Result<Json<SiteConfig>, AppError> {
    Ok(Json(state.services.site.get().await?))
}
