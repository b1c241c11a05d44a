//! HTTP route handlers for storefront.
//!
//! Every `/api` response uses the [`ApiResponse`] envelope.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                               - Liveness
//! GET    /health/ready                         - Database + image container readiness
//!
//! # Products
//! GET    /api/products                         - Active products with images
//! POST   /api/products                         - Create product
//! GET    /api/products/{id}                    - Product detail (images + customizations)
//! PATCH  /api/products/{id}                    - Update product
//! DELETE /api/products/{id}                    - Delete product, images, and blobs
//!
//! # Images
//! GET    /api/products/{id}/images             - Gallery in display order
//! POST   /api/products/{id}/images             - Upload (multipart, one or more files)
//! PUT    /api/products/{id}/images/order       - Reorder {image_ids}
//! PATCH  /api/products/{id}/images/{image_id}  - Promote / move
//! DELETE /api/products/{id}/images/{image_id}  - Delete, re-electing primary
//!
//! # Users
//! GET    /api/users?email=                     - Find by email (data: null when absent)
//! POST   /api/users                            - Create or refresh from external login
//! PATCH  /api/users/{id}                       - Update profile fields
//! GET    /api/users/{id}/admin                 - Admin flag
//! ```

pub mod extract;
pub mod images;
pub mod products;
pub mod users;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, put},
};

use virtual_craft_core::ApiResponse;

use crate::error::AppError;
use crate::state::AppState;

/// Create the product and image routes router.
pub fn product_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::destroy),
        )
        .route(
            "/{id}/images",
            get(images::index)
                .post(images::upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/{id}/images/order", put(images::reorder))
        .route(
            "/{id}/images/{image_id}",
            patch(images::update).delete(images::destroy),
        )
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::find).post(users::login))
        .route("/{id}", patch(users::update))
        .route("/{id}/admin", get(users::is_admin))
}

/// Create all routes for the storefront.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/products", product_routes(max_upload_bytes))
        .nest("/api/users", user_routes())
        .fallback(not_found)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity and that the image container exists.
/// Returns 503 Service Unavailable otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog().check_ready().await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok("ready"))).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            AppError::Unavailable(e.to_string()).into_response()
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Route".to_string())
}
