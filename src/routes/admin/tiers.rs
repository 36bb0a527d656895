use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::ErrorResponse;
use crate::AppState;
use crate::error::AdminError;
use crate::tier::{
    DeepResearchUpdate, DesignsUpdate, PresentationsUpdate, TierConfig, TierFeatures, TierName,
    resolve_deep_research, resolve_designs, resolve_presentations,
};

// --- Types ---

#[derive(Serialize, ToSchema)]
pub struct ListTiersResponse {
    pub tiers: Vec<TierConfig>,
}

/// Full replacement of a tier's record. Entitlement values the operator left
/// untouched resolve against the stored config (seeding defaults on first
/// enable).
#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTierRequest {
    pub display_name: String,
    pub price_usd: f64,
    pub price_developing: f64,
    pub token_limit: u64,
    #[serde(default)]
    pub is_unlimited_tokens: bool,
    pub max_projects: u32,
    pub rag_storage_limit_bytes: u64,
    pub max_file_size_mb: u32,
    pub memory_capacity_mb: u32,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub default_vision_model: Option<String>,
    #[serde(default)]
    pub default_pro_search_model_id: Option<String>,
    #[serde(default)]
    pub features: TierFeatures,
    #[serde(default)]
    pub deep_research: Option<DeepResearchUpdate>,
    #[serde(default)]
    pub designs: Option<DesignsUpdate>,
    #[serde(default)]
    pub presentations: Option<PresentationsUpdate>,
}

fn error_response(e: AdminError) -> (StatusCode, Json<ErrorResponse>) {
    (
        e.status(),
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn parse_tier(name: &str) -> Result<TierName, (StatusCode, Json<ErrorResponse>)> {
    name.parse::<TierName>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Unknown tier: {name}"),
            }),
        )
    })
}

// --- Handlers ---

/// List all four tier configurations (missing records are synthesized from
/// defaults)
#[utoipa::path(
    get,
    path = "/tiers",
    tag = "tiers",
    responses(
        (status = 200, body = ListTiersResponse),
    )
)]
pub async fn list_tiers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListTiersResponse>, (StatusCode, Json<ErrorResponse>)> {
    let tiers = state.tiers.list().await.map_err(error_response)?;
    Ok(Json(ListTiersResponse { tiers }))
}

/// Replace a tier's configuration
#[utoipa::path(
    put,
    path = "/tiers/{tierName}",
    tag = "tiers",
    params(("tierName" = String, Path, description = "Tier name (free, tier5, tier10, tier15)")),
    request_body = UpdateTierRequest,
    responses(
        (status = 200, body = TierConfig),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn update_tier(
    State(state): State<Arc<AppState>>,
    Path(tier_name): Path<String>,
    Json(body): Json<UpdateTierRequest>,
) -> Result<Json<TierConfig>, (StatusCode, Json<ErrorResponse>)> {
    let tier = parse_tier(&tier_name)?;

    let display_name = body.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Display name cannot be empty".to_string(),
            }),
        ));
    }

    // Previous record only matters for entitlement resolution; the rest of
    // the update is a full replacement.
    let previous = state.tiers.get(tier).await.map_err(error_response)?;

    let config = TierConfig {
        tier_name: tier,
        display_name,
        price_usd: body.price_usd,
        price_developing: body.price_developing,
        token_limit: body.token_limit,
        is_unlimited_tokens: body.is_unlimited_tokens,
        max_projects: body.max_projects,
        rag_storage_limit_bytes: body.rag_storage_limit_bytes,
        max_file_size_mb: body.max_file_size_mb,
        memory_capacity_mb: body.memory_capacity_mb,
        default_model: body.default_model,
        default_vision_model: body.default_vision_model,
        default_pro_search_model_id: body.default_pro_search_model_id,
        features: body.features,
        deep_research: resolve_deep_research(
            body.deep_research.as_ref(),
            previous.deep_research.as_ref(),
        ),
        designs: resolve_designs(body.designs.as_ref(), previous.designs.as_ref()),
        presentations: resolve_presentations(
            body.presentations.as_ref(),
            previous.presentations.as_ref(),
        ),
    };

    state.tiers.replace(&config).await.map_err(error_response)?;
    Ok(Json(config))
}
