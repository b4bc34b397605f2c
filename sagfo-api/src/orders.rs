use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use sagfo_core::orders::CheckoutRequest;
use sagfo_core::repository::OrderFilter;
use sagfo_core::Actor;
use sagfo_order::Order;
use uuid::Uuid;

use crate::{error::AppError, state::AppState, upload::MultipartForm};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/checkout", post(checkout))
        .route("/v1/orders", get(list_orders))
        .route("/v1/orders/{id}", get(get_order))
}

/// POST /v1/checkout
///
/// Multipart body: an `order` part holding the [`CheckoutRequest`] JSON and a
/// `payment_proof` file part.
async fn checkout(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let request: CheckoutRequest = form.json("order")?;
    let proof = form.take_file("payment_proof");

    let order = state.services.orders.checkout(&actor, request, proof).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /v1/orders
///
/// Customers see their own orders, transporters the ones assigned to them,
/// admins everything.
async fn list_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.services.orders.list_orders(&actor, filter).await?))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.services.orders.get_order(&actor, id).await?))
}
