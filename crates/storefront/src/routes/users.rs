//! User API handlers.
//!
//! `POST /api/users` is the identity-provider handoff: it is called once per
//! successful external login with the provider's profile.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use virtual_craft_core::{ApiResponse, ExternalIdentity, User, UserId, UserPatch};

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::Result;
use crate::state::AppState;

/// Query for looking a user up by email.
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// Look a user up by email. `data` is `null` when no user matches.
#[instrument(skip(state, query))]
pub async fn find(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EmailQuery>,
) -> Result<Json<ApiResponse<Option<User>>>> {
    let user = state.users().find_by_email(&query.email).await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// Create or refresh the user for an external login.
#[instrument(skip(state, identity))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(identity): ApiJson<ExternalIdentity>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state.users().create_or_update_from_identity(identity).await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// Apply a partial update to a user.
#[instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state.users().set_fields(id, patch).await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// Whether the user has admin rights.
#[instrument(skip(state))]
pub async fn is_admin(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<ApiResponse<bool>>> {
    let is_admin = state.users().is_admin(id).await?;
    Ok(Json(ApiResponse::ok(is_admin)))
}
