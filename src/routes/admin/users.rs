use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{ErrorResponse, SuccessResponse};
use crate::AppState;
use crate::error::AdminError;
use crate::store::UserRecord;
use crate::tier::TierName;

// --- Types ---

#[derive(Serialize, ToSchema)]
pub struct ListUsersResponse {
    pub users: Vec<UserRecord>,
}

#[derive(Deserialize, ToSchema)]
pub struct ListUsersQuery {
    /// Substring match over email, name, and username
    pub search: Option<String>,
    pub tier: Option<TierName>,
}

/// Operator edit of a user. `proRepliesTotal` is a destructive override: it
/// replaces the stored counter rather than adjusting it.
#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub tier: Option<TierName>,
    pub pro_replies_total: Option<u64>,
}

fn error_response(e: AdminError) -> (StatusCode, Json<ErrorResponse>) {
    (
        e.status(),
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// --- Handlers ---

/// List user accounts
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(
        ("search" = Option<String>, Query, description = "Substring filter"),
        ("tier" = Option<TierName>, Query, description = "Tier filter"),
    ),
    responses(
        (status = 200, body = ListUsersResponse),
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, (StatusCode, Json<ErrorResponse>)> {
    let users = state
        .users
        .list(query.search.as_deref(), query.tier)
        .await
        .map_err(error_response)?;
    Ok(Json(ListUsersResponse { users }))
}

/// Edit a user's tier and/or overwrite their pro-reply counter
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, body = SuccessResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, Json<ErrorResponse>)> {
    if body.tier.is_none() && body.pro_replies_total.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Nothing to update".to_string(),
            }),
        ));
    }

    let updated = state
        .users
        .update(&id, body.tier, body.pro_replies_total)
        .await
        .map_err(error_response)?;
    if !updated {
        return Err(error_response(AdminError::NotFound("User")));
    }
    Ok(Json(SuccessResponse { success: true }))
}
