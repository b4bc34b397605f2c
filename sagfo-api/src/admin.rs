use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use sagfo_catalog::{Equipment, PriceUpdate};
use sagfo_core::accounts::{NewUser, ProfileUpdate};
use sagfo_core::site::{SiteConfig, SiteConfigPatch};
use sagfo_core::{Actor, Profile};
use sagfo_order::finance::{DebtsReport, Overview};
use sagfo_order::{CustomerMessage, DeliveryStatus, Order, OrderStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState, upload::MultipartForm};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
    /// Rejects the write with 409 when the order moved on in the meantime.
    #[serde(default)]
    pub expected_status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ItemStatusRequest {
    pub status: DeliveryStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub transporter_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct PriceUpdateResponse {
    pub updated: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveImageRequest {
    pub url: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/orders/{id}/status", post(update_status))
        .route("/v1/admin/orders/{id}/items/{index}/status", post(update_item_status))
        .route("/v1/admin/orders/{id}/confirm-delivery", post(confirm_delivery))
        .route("/v1/admin/orders/{id}/assign", post(assign_transporter))
        .route("/v1/admin/orders/{id}/summary", get(order_summary))
        .route("/v1/admin/orders/{id}/payment-reminder", post(payment_reminder))
        .route("/v1/admin/reports/debts", get(debts_report))
        .route("/v1/admin/reports/overview", get(overview))
        .route("/v1/admin/equipment", post(create_equipment))
        .route("/v1/admin/equipment/prices", post(bulk_update_prices))
        .route(
            "/v1/admin/equipment/{id}",
            put(update_equipment).delete(delete_equipment),
        )
        .route(
            "/v1/admin/equipment/{id}/images",
            post(upload_equipment_image).delete(remove_equipment_image),
        )
        .route("/v1/admin/users", get(list_users).post(create_user))
        .route("/v1/admin/users/{id}", put(update_user).delete(delete_user))
        .route("/v1/admin/site", put(update_site_config))
        .route("/v1/admin/site/seal", post(upload_seal))
}

// ============================================================================
// Order Handlers
// ============================================================================

/// POST /v1/admin/orders/{id}/status
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

/// POST /v1/admin/orders/{id}/items/{index}/status
async fn update_item_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(req): Json<ItemStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .services
        .orders
        .update_item_status(&actor, id, index, req.status)
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

async fn assign_transporter(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .services
        .orders
        .assign_transporter(&actor, id, req.transporter_id)
        .await?;
    Ok(Json(order))
}

async fn order_summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = state.services.orders.summary(&actor, id).await?;
    Ok(Json(SummaryResponse { summary }))
}

async fn payment_reminder(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerMessage>, AppError> {
    Ok(Json(state.services.orders.remind_payment(&actor, id).await?))
}

// ============================================================================
// Reports
// ============================================================================

async fn debts_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<DebtsReport>, AppError> {
    Ok(Json(state.services.orders.debts_report(&actor).await?))
}

async fn overview(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Overview>, AppError> {
    Ok(Json(state.services.orders.overview(&actor).await?))
}

// ============================================================================
// Equipment Management
// ============================================================================

/// POST /v1/admin/equipment
async fn create_equipment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(item): Json<Equipment>,
) -> Result<(StatusCode, Json<Equipment>), AppError> {
    let created = state.services.catalog.create(&actor, item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_equipment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(item): Json<Equipment>,
) -> Result<Json<Equipment>, AppError> {
    Ok(Json(state.services.catalog.update(&actor, id, item).await?))
}

async fn delete_equipment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.services.catalog.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn bulk_update_prices(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(update): Json<PriceUpdate>,
) -> Result<Json<PriceUpdateResponse>, AppError> {
    let updated = state.services.catalog.bulk_update_prices(&actor, &update).await?;
    Ok(Json(PriceUpdateResponse { updated }))
}

/// POST /v1/admin/equipment/{id}/images (multipart, `image` file part)
async fn upload_equipment_image(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Equipment>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let image = form
        .take_file("image")
        .ok_or_else(|| AppError::Validation("missing 'image' file".to_string()))?;
    Ok(Json(state.services.catalog.upload_image(&actor, id, image).await?))
}

async fn remove_equipment_image(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<RemoveImageRequest>,
) -> Result<Json<Equipment>, AppError> {
    Ok(Json(state.services.catalog.remove_image(&actor, id, &req.url).await?))
}

// ============================================================================
// User Management
// ============================================================================

async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Profile>>, AppError> {
    Ok(Json(state.services.accounts.list_users(&actor).await?))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    let profile = state.services.accounts.create_user(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProfileUpdate>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.services.accounts.update_user(&actor, id, req).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.services.accounts.delete_user(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Site Configuration
// ============================================================================

async fn update_site_config(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(patch): Json<SiteConfigPatch>,
) -> Result<Json<SiteConfig>, AppError> {
    Ok(Json(state.services.site.update(&actor, patch).await?))
}

/// POST /v1/admin/site/seal (multipart, `seal` file part)
async fn upload_seal(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    multipart: Multipart,
) -> Result<Json<SiteConfig>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let seal = form
        .take_file("seal")
        .ok_or_else(|| AppError::Validation("missing 'seal' file".to_string()))?;
    Ok(Json(state.services.site.upload_seal(&actor, seal).await?))
}
