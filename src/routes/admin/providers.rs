use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{ErrorResponse, SuccessResponse, validate_base_url, validate_name};
use crate::AppState;
use crate::discovery::{DiscoveredModel, discover_models, select_discovery_key};
use crate::error::AdminError;
use crate::store::{ApiKey, CascadeSummary, Provider, mask_secret};

// --- Types ---

#[derive(Serialize, ToSchema)]
pub struct ListProvidersResponse {
    pub providers: Vec<Provider>,
}

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProviderRequest {
    pub name: String,
    pub base_url: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProviderRequest {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Provider deletion cascades; the counts let the dashboard tell the
/// operator exactly what went with it.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProviderResponse {
    pub success: bool,
    #[serde(flatten)]
    pub cascade: CascadeSummary,
}

/// An API key as returned to the dashboard: the secret only ever appears in
/// its masked form.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyView {
    #[serde(rename = "_id")]
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub masked_key: String,
    pub is_active: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<ApiKey> for ApiKeyView {
    fn from(key: ApiKey) -> Self {
        Self {
            masked_key: mask_secret(&key.api_key),
            id: key.id,
            provider_id: key.provider_id,
            name: key.name,
            is_active: key.is_active,
            created_at: key.created_at,
            updated_at: key.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ListApiKeysResponse {
    pub keys: Vec<ApiKeyView>,
}

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub api_key: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchModelsRequest {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct FetchModelsResponse {
    pub models: Vec<DiscoveredModel>,
}

fn default_true() -> bool {
    true
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

/// List all providers
#[utoipa::path(
    get,
    path = "/providers",
    tag = "providers",
    responses(
        (status = 200, body = ListProvidersResponse),
    )
)]
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListProvidersResponse>, (StatusCode, Json<ErrorResponse>)> {
    let providers = state.providers.list().await.map_err(error_response)?;
    Ok(Json(ListProvidersResponse { providers }))
}

/// Register a new provider
#[utoipa::path(
    post,
    path = "/providers",
    tag = "providers",
    request_body = CreateProviderRequest,
    responses(
        (status = 200, body = Provider),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn create_provider(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateProviderRequest>,
) -> Result<Json<Provider>, (StatusCode, Json<ErrorResponse>)> {
    let name = body.name.trim().to_string();
    validate_name("Provider name", &name).map_err(bad_request)?;
    validate_base_url(&body.base_url).map_err(bad_request)?;

    let provider = state
        .providers
        .create(name, body.base_url.trim().to_string(), body.is_active)
        .await
        .map_err(error_response)?;
    Ok(Json(provider))
}

/// Update a provider
#[utoipa::path(
    put,
    path = "/providers/{id}",
    tag = "providers",
    params(("id" = String, Path, description = "Provider ID")),
    request_body = UpdateProviderRequest,
    responses(
        (status = 200, body = SuccessResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn update_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProviderRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, Json<ErrorResponse>)> {
    let name = match body.name {
        Some(n) => {
            let n = n.trim().to_string();
            validate_name("Provider name", &n).map_err(bad_request)?;
            Some(n)
        }
        None => None,
    };
    if let Some(url) = &body.base_url {
        validate_base_url(url).map_err(bad_request)?;
    }

    let updated = state
        .providers
        .update(
            &id,
            name,
            body.base_url.map(|u| u.trim().to_string()),
            body.is_active,
        )
        .await
        .map_err(error_response)?;
    if !updated {
        return Err(error_response(AdminError::NotFound("Provider")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// Delete a provider and cascade to its models and API keys
#[utoipa::path(
    delete,
    path = "/providers/{id}",
    tag = "providers",
    params(("id" = String, Path, description = "Provider ID")),
    responses(
        (status = 200, body = DeleteProviderResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn delete_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteProviderResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.providers.delete(&id).await.map_err(error_response)? {
        Some(cascade) => Ok(Json(DeleteProviderResponse {
            success: true,
            cascade,
        })),
        None => Err(error_response(AdminError::NotFound("Provider"))),
    }
}

// --- API keys ---

/// List a provider's API keys (secrets masked)
#[utoipa::path(
    get,
    path = "/providers/{id}/api-keys",
    tag = "providers",
    params(("id" = String, Path, description = "Provider ID")),
    responses(
        (status = 200, body = ListApiKeysResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn list_provider_keys(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ListApiKeysResponse>, (StatusCode, Json<ErrorResponse>)> {
    if state
        .providers
        .get(&id)
        .await
        .map_err(error_response)?
        .is_none()
    {
        return Err(error_response(AdminError::NotFound("Provider")));
    }
    let keys = state.providers.list_keys(&id).await.map_err(error_response)?;
    Ok(Json(ListApiKeysResponse {
        keys: keys.into_iter().map(ApiKeyView::from).collect(),
    }))
}

/// Add an API key to a provider
#[utoipa::path(
    post,
    path = "/providers/{id}/api-keys",
    tag = "providers",
    params(("id" = String, Path, description = "Provider ID")),
    request_body = CreateApiKeyRequest,
    responses(
        (status = 200, body = ApiKeyView),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn create_provider_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CreateApiKeyRequest>,
) -> Result<Json<ApiKeyView>, (StatusCode, Json<ErrorResponse>)> {
    let name = body.name.trim().to_string();
    validate_name("Key name", &name).map_err(bad_request)?;
    let secret = body.api_key.trim().to_string();
    if secret.is_empty() {
        return Err(bad_request("API key cannot be empty".to_string()));
    }

    if state
        .providers
        .get(&id)
        .await
        .map_err(error_response)?
        .is_none()
    {
        return Err(error_response(AdminError::NotFound("Provider")));
    }

    let key = state
        .providers
        .create_key(&id, name, secret, body.is_active)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiKeyView::from(key)))
}

/// Delete an API key (the provider and its models are untouched)
#[utoipa::path(
    delete,
    path = "/api-keys/{id}",
    tag = "providers",
    params(("id" = String, Path, description = "API key ID")),
    responses(
        (status = 200, body = SuccessResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn delete_api_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !state
        .providers
        .delete_key(&id)
        .await
        .map_err(error_response)?
    {
        return Err(error_response(AdminError::NotFound("API key")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

// --- Model discovery ---

/// Discover upstream models with an explicit endpoint and key
#[utoipa::path(
    post,
    path = "/providers/fetch-models",
    tag = "providers",
    request_body = FetchModelsRequest,
    responses(
        (status = 200, body = FetchModelsResponse),
        (status = 400, body = ErrorResponse),
        (status = 502, body = ErrorResponse),
    )
)]
pub async fn fetch_models(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FetchModelsRequest>,
) -> Result<Json<FetchModelsResponse>, (StatusCode, Json<ErrorResponse>)> {
    validate_base_url(&body.base_url).map_err(bad_request)?;
    if body.api_key.trim().is_empty() {
        return Err(bad_request("API key cannot be empty".to_string()));
    }

    let models = discover_models(&state.http_client, &body.base_url, &body.api_key)
        .await
        .map_err(error_response)?;
    Ok(Json(FetchModelsResponse { models }))
}

/// Discover upstream models for a registered provider. The key to use is
/// picked server-side: first active key, else first key; zero keys is
/// rejected before any network call.
#[utoipa::path(
    post,
    path = "/providers/{id}/fetch-models",
    tag = "providers",
    params(("id" = String, Path, description = "Provider ID")),
    responses(
        (status = 200, body = FetchModelsResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
        (status = 502, body = ErrorResponse),
    )
)]
pub async fn fetch_provider_models(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FetchModelsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Some(provider) = state.providers.get(&id).await.map_err(error_response)? else {
        return Err(error_response(AdminError::NotFound("Provider")));
    };

    let keys = state.providers.list_keys(&id).await.map_err(error_response)?;
    let key = select_discovery_key(&keys).map_err(error_response)?;

    let models = discover_models(&state.http_client, &provider.base_url, &key.api_key)
        .await
        .map_err(error_response)?;
    Ok(Json(FetchModelsResponse { models }))
}
