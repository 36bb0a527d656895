use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{ErrorResponse, SuccessResponse, normalize_model_entry, validate_cost};
use crate::AppState;
use crate::error::AdminError;
use crate::store::ModelAssignment;
use crate::tier::TierName;

// --- Types ---

#[derive(Serialize, ToSchema)]
pub struct ListModelsResponse {
    pub models: Vec<ModelAssignment>,
}

#[derive(Deserialize, ToSchema)]
pub struct ListModelsQuery {
    /// When set, only models usable by this tier (cascading rule) are listed
    pub tier: Option<TierName>,
}

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelRequest {
    pub provider_id: String,
    pub api_key_id: String,
    /// Discovered or manually entered upstream identifier
    pub model_id: String,
    pub display_name: Option<String>,
    pub min_tier: TierName,
    #[serde(default)]
    pub supports_vision: bool,
    #[serde(default)]
    pub is_thinking: bool,
}

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModelRequest {
    pub display_name: Option<String>,
    pub min_tier: Option<TierName>,
    pub context_window: Option<u32>,
    pub input_cost_per_1k: Option<f64>,
    pub output_cost_per_1k: Option<f64>,
    pub supports_vision: Option<bool>,
    pub is_thinking: Option<bool>,
}

fn error_response(e: AdminError) -> (StatusCode, Json<ErrorResponse>) {
    (
        e.status(),
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

fn bad_request(message: String) -> (StatusCode, Json<ErrorResponse>) {
    error_response(AdminError::Validation(message))
}

// --- Handlers ---

/// List model assignments, optionally filtered to a tier's view
#[utoipa::path(
    get,
    path = "/models",
    tag = "models",
    params(("tier" = Option<TierName>, Query, description = "Filter by tier access")),
    responses(
        (status = 200, body = ListModelsResponse),
    )
)]
pub async fn list_models(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListModelsQuery>,
) -> Result<Json<ListModelsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let models = match query.tier {
        Some(tier) => state.models.list_for_tier(tier).await,
        None => state.models.list().await,
    }
    .map_err(error_response)?;
    Ok(Json(ListModelsResponse { models }))
}

/// Create a model assignment. `contextWindow` and costs start as
/// placeholders (8192 and zero) for the operator to edit later.
#[utoipa::path(
    post,
    path = "/models",
    tag = "models",
    request_body = CreateModelRequest,
    responses(
        (status = 200, body = ModelAssignment),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn create_model(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateModelRequest>,
) -> Result<Json<ModelAssignment>, (StatusCode, Json<ErrorResponse>)> {
    let (model_id, display_name) =
        normalize_model_entry(&body.model_id, body.display_name.as_deref())
            .map_err(bad_request)?;

    if state
        .providers
        .get(&body.provider_id)
        .await
        .map_err(error_response)?
        .is_none()
    {
        return Err(error_response(AdminError::NotFound("Provider")));
    }
    if !state
        .providers
        .key_belongs_to(&body.api_key_id, &body.provider_id)
        .await
        .map_err(error_response)?
    {
        return Err(error_response(AdminError::NotFound("API key")));
    }

    let model = state
        .models
        .create(
            body.provider_id,
            body.api_key_id,
            model_id,
            display_name,
            body.min_tier,
            body.supports_vision,
            body.is_thinking,
        )
        .await
        .map_err(error_response)?;
    Ok(Json(model))
}

/// Update a model assignment
#[utoipa::path(
    put,
    path = "/models/{id}",
    tag = "models",
    params(("id" = String, Path, description = "Model assignment ID")),
    request_body = UpdateModelRequest,
    responses(
        (status = 200, body = SuccessResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn update_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateModelRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, Json<ErrorResponse>)> {
    for (label, cost) in [
        ("Input cost", body.input_cost_per_1k),
        ("Output cost", body.output_cost_per_1k),
    ] {
        if let Some(c) = cost {
            validate_cost(label, c).map_err(bad_request)?;
        }
    }
    if let Some(window) = body.context_window
        && window == 0
    {
        return Err(bad_request("Context window must be at least 1".to_string()));
    }
    let display_name = match body.display_name {
        Some(n) => {
            let n = n.trim().to_string();
            if n.is_empty() {
                return Err(bad_request("Display name cannot be empty".to_string()));
            }
            Some(n)
        }
        None => None,
    };

    let updated = state
        .models
        .update(
            &id,
            display_name,
            body.min_tier,
            body.context_window,
            body.input_cost_per_1k,
            body.output_cost_per_1k,
            body.supports_vision,
            body.is_thinking,
        )
        .await
        .map_err(error_response)?;
    if !updated {
        return Err(error_response(AdminError::NotFound("Model")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// Delete a model assignment (the provider and key are untouched)
#[utoipa::path(
    delete,
    path = "/models/{id}",
    tag = "models",
    params(("id" = String, Path, description = "Model assignment ID")),
    responses(
        (status = 200, body = SuccessResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn delete_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !state.models.delete(&id).await.map_err(error_response)? {
        return Err(error_response(AdminError::NotFound("Model")));
    }
    Ok(Json(SuccessResponse { success: true }))
}
