//! Product image gallery handlers.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use tracing::{info, instrument};

use virtual_craft_core::{ApiResponse, ImageId, ImagePatch, ProductId, ProductImage, ReorderImages};

use super::extract::{ApiJson, ApiPath};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::UploadedImage;
use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// List a product's images in display order.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<ApiResponse<Vec<ProductImage>>>> {
    let images = state.catalog().list_images(product_id).await?;
    Ok(Json(ApiResponse::ok(images)))
}

/// Upload one or more images (`multipart/form-data`, one file per part).
///
/// Parts without a filename are ignored. Files are stored in the order they
/// appear; a failure stops processing and earlier files stay uploaded.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ProductImage>>>)> {
    let mut uploaded = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();

        let image = state
            .catalog()
            .upload_image(
                product_id,
                UploadedImage {
                    bytes,
                    filename,
                    content_type,
                },
            )
            .await?;
        uploaded.push(image);
    }

    if uploaded.is_empty() {
        return Err(AppError::BadRequest("No image files in request".to_string()));
    }

    let product = product_id.to_string();
    add_breadcrumb(
        "catalog",
        "Uploaded product images",
        Some(&[("product_id", product.as_str())]),
    );
    info!(count = uploaded.len(), "Images uploaded");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(uploaded))))
}

/// Set the display order of a product's images.
///
/// Responds with the gallery in its new order.
#[instrument(skip(state, body))]
pub async fn reorder(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<ReorderImages>,
) -> Result<Json<ApiResponse<Vec<ProductImage>>>> {
    state
        .catalog()
        .reorder_images(product_id, &body.image_ids)
        .await?;
    let images = state.catalog().list_images(product_id).await?;
    Ok(Json(ApiResponse::ok(images)))
}

/// Promote an image and/or move it.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath((product_id, image_id)): ApiPath<(ProductId, ImageId)>,
    ApiJson(patch): ApiJson<ImagePatch>,
) -> Result<Json<ApiResponse<ProductImage>>> {
    let image = state
        .catalog()
        .update_image(product_id, image_id, patch)
        .await?;
    Ok(Json(ApiResponse::ok(image)))
}

/// Delete an image, re-electing the primary if needed.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    ApiPath((product_id, image_id)): ApiPath<(ProductId, ImageId)>,
) -> Result<Json<ApiResponse<()>>> {
    state.catalog().delete_image(product_id, image_id).await?;
    Ok(Json(ApiResponse::ok(())))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(err.body_text())
    }
}
