//! Product API handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use virtual_craft_core::{
    ApiResponse, NewProduct, Product, ProductDetails, ProductId, ProductPatch, ProductWithImages,
};

use super::extract::{ApiJson, ApiPath};
use crate::error::Result;
use crate::state::AppState;

/// List active products with their galleries.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<ProductWithImages>>>> {
    let products = state.catalog().list_active().await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// Create a product.
#[instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>)> {
    let product = state.catalog().create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(product))))
}

/// Product detail with images and customizations.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ApiResponse<ProductDetails>>> {
    let details = state.catalog().get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(details)))
}

/// Apply a partial update.
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = state.catalog().update(id, patch).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// Delete a product and its images.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ApiResponse<()>>> {
    state.catalog().delete(id).await?;
    Ok(Json(ApiResponse::ok(())))
}
