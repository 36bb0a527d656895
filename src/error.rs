use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Model discovery was requested for a provider with zero registered
    /// API keys. Distinct from a discovery failure so the operator is told
    /// to add a key rather than shown a generic error.
    #[error("Provider has no API keys; add a key before fetching models")]
    NoApiKeys,

    /// The upstream endpoint was unreachable or rejected the key. Carries
    /// the upstream's own message for the operator.
    #[error("Failed to fetch models from provider: {0}")]
    ModelFetchFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AdminError {
    pub fn status(&self) -> StatusCode {
        match self {
            AdminError::Validation(_) | AdminError::NoApiKeys => StatusCode::BAD_REQUEST,
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::ModelFetchFailed(_) => StatusCode::BAD_GATEWAY,
            AdminError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AdminError::NoApiKeys.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AdminError::ModelFetchFailed("boom".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AdminError::NotFound("Provider").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AdminError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_no_keys_message_names_the_condition() {
        assert!(AdminError::NoApiKeys.to_string().contains("no API keys"));
    }
}
