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
use crate::store::{PromptType, SystemPrompt};

// --- Types ---

#[derive(Serialize, ToSchema)]
pub struct ListPromptsResponse {
    pub prompts: Vec<SystemPrompt>,
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct UpdatePromptRequest {
    pub content: String,
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

/// List the system prompts (one record per type, always both)
#[utoipa::path(
    get,
    path = "/system-prompts",
    tag = "prompts",
    responses(
        (status = 200, body = ListPromptsResponse),
    )
)]
pub async fn list_prompts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListPromptsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let prompts = state.prompts.list().await.map_err(error_response)?;
    Ok(Json(ListPromptsResponse { prompts }))
}

/// Replace a system prompt's content. The id is the prompt type
/// (`master` or `proSearch`).
#[utoipa::path(
    put,
    path = "/system-prompts/{id}",
    tag = "prompts",
    params(("id" = String, Path, description = "Prompt type: master or proSearch")),
    request_body = UpdatePromptRequest,
    responses(
        (status = 200, body = SystemPrompt),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn update_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePromptRequest>,
) -> Result<Json<SystemPrompt>, (StatusCode, Json<ErrorResponse>)> {
    let Ok(prompt_type) = id.parse::<PromptType>() else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Unknown prompt type: {id}"),
            }),
        ));
    };

    let prompt = state
        .prompts
        .upsert(prompt_type, body.content)
        .await
        .map_err(error_response)?;
    Ok(Json(prompt))
}
