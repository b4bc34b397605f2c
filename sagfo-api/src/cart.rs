use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use sagfo_core::orders::Quote;
use sagfo_core::Actor;
use sagfo_order::cart::ProductionField;
use sagfo_order::{Cart, CartLine, LineKey};
use serde::Deserialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    #[serde(flatten)]
    pub key: LineKey,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    #[serde(flatten)]
    pub key: LineKey,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CustomizeRequest {
    #[serde(flatten)]
    pub key: LineKey,
    pub field: ProductionField,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PackageRequest {
    pub lines: Vec<CartLine>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/cart", get(get_cart).delete(clear_cart))
        .route(
            "/v1/cart/items",
            post(add_item).put(set_quantity).delete(remove_item),
        )
        .route("/v1/cart/items/customization", put(customize_item))
        .route("/v1/cart/package", post(add_package))
        .route("/v1/cart/quote", post(quote))
}

async fn get_cart(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Cart>, AppError> {
    Ok(Json(state.services.carts.get(&actor).await?))
}

async fn clear_cart(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Cart>, AppError> {
    state.services.carts.clear(&actor).await?;
    Ok(Json(Cart::default()))
}

async fn add_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<Cart>, AppError> {
    Ok(Json(state.services.carts.add(&actor, req.key, req.quantity).await?))
}

async fn set_quantity(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<Cart>, AppError> {
    Ok(Json(state.services.carts.set_quantity(&actor, &req.key, req.quantity).await?))
}

async fn remove_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(key): Json<LineKey>,
) -> Result<Json<Cart>, AppError> {
    Ok(Json(state.services.carts.remove(&actor, &key).await?))
}

async fn customize_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CustomizeRequest>,
) -> Result<Json<Cart>, AppError> {
    let cart = state
        .services
        .carts
        .customize(&actor, &req.key, req.field, req.value)
        .await?;
    Ok(Json(cart))
}

/// Adds a pre-assembled set of lines (a gym package) in one go.
async fn add_package(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<PackageRequest>,
) -> Result<Json<Cart>, AppError> {
    Ok(Json(state.services.carts.add_package(&actor, req.lines).await?))
}

async fn quote(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Quote>, AppError> {
    Ok(Json(state.services.orders.quote(&actor).await?))
}
