use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use sagfo_catalog::{CatalogQuery, Comparison, Equipment};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    /// Comma-separated equipment ids.
    pub ids: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/catalog", get(list_equipment))
        .route("/v1/catalog/promotions", get(list_promotions))
        .route("/v1/catalog/compare", get(compare_equipment))
        .route("/v1/catalog/{id}", get(get_equipment))
}

/// GET /v1/catalog?search=&category=&muscle_group=&sort=
async fn list_equipment(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<Equipment>>, AppError> {
    Ok(Json(state.services.catalog.list(&query).await?))
}

async fn list_promotions(State(state): State<AppState>) -> Result<Json<Vec<Equipment>>, AppError> {
    Ok(Json(state.services.catalog.promotions().await?))
}

/// GET /v1/catalog/compare?ids=<id>,<id>
async fn compare_equipment(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<Comparison>, AppError> {
    let ids = query
        .ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Uuid>().map_err(|_| AppError::Validation(format!("'{s}' is not an id"))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(state.services.catalog.compare(&ids).await?))
}

async fn get_equipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Equipment>, AppError> {
    Ok(Json(state.services.catalog.get(id).await?))
}
