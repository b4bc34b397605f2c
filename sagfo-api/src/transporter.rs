use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use sagfo_core::orders::Shipments;
use sagfo_core::Actor;
use sagfo_order::{DeliveryStatus, Order, OrderStatus};
use serde::Deserialize;
use uuid::Uuid;

use crate::{admin::StatusUpdateRequest, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ShipmentsQuery {
    pub status: Option<OrderStatus>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/transporter/shipments", get(shipments))
        .route("/v1/transporter/orders/{id}/items/{index}/delivered", post(mark_item_delivered))
        .route("/v1/transporter/orders/{id}/confirm-delivery", post(confirm_delivery))
        .route("/v1/transporter/orders/{id}/status", post(update_status))
}

/// GET /v1/transporter/shipments?status=
async fn shipments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ShipmentsQuery>,
) -> Result<Json<Shipments>, AppError> {
    Ok(Json(state.services.orders.shipments(&actor, query.status).await?))
}

async fn mark_item_delivered(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .services
        .orders
        .update_item_status(&actor, id, index, DeliveryStatus::Delivered)
        .await?;
    Ok(Json(order))
}

async fn confirm_delivery(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.services.orders.confirm_full_delivery(&actor, id).await?))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .services
        .orders
        .update_status(&actor, id, req.status, req.note, req.expected_status)
        .await?;
    Ok(Json(order))
}
