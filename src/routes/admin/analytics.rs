use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::ErrorResponse;
use crate::AppState;
use crate::error::AdminError;
use crate::store::users::TierUserCount;

// --- Types ---

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_users: u64,
    pub users_by_tier: Vec<TierUserCount>,
    pub tokens_total: u64,
    pub tokens_this_month: u64,
    pub pro_replies_total: u64,
    pub provider_count: u64,
    pub model_count: u64,
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

/// Roll-up of users, usage, providers, and models for the dashboard home
#[utoipa::path(
    get,
    path = "/analytics/overview",
    tag = "analytics",
    responses(
        (status = 200, body = AnalyticsOverview),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn analytics_overview(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsOverview>, (StatusCode, Json<ErrorResponse>)> {
    let totals = state.users.usage_totals().await.map_err(error_response)?;
    let provider_count = state.providers.count().await.map_err(error_response)?;
    let model_count = state.models.count().await.map_err(error_response)?;

    Ok(Json(AnalyticsOverview {
        total_users: totals.total_users,
        users_by_tier: totals.users_by_tier,
        tokens_total: totals.tokens_total,
        tokens_this_month: totals.tokens_this_month,
        pro_replies_total: totals.pro_replies_total,
        provider_count,
        model_count,
    }))
}
