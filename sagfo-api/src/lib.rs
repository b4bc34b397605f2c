use axum::{
    http::Method,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod site;
pub mod state;
pub mod transporter;
pub mod upload;

pub use state::{AppState, AuthConfig};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Role guards run after the session layer has put the actor in place.
    let admin = admin::routes().route_layer(from_fn(middleware::require_admin));
    let transporter = transporter::routes().route_layer(from_fn(middleware::require_transporter));

    let session = Router::new()
        .merge(auth::session_routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .merge(admin)
        .merge(transporter)
        .route_layer(from_fn_with_state(state.clone(), middleware::session_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(catalog::routes())
        .merge(site::routes())
        .merge(session)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
