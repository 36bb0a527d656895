//! Upstream model discovery against a provider's OpenAI-compatible endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use utoipa::ToSchema;

use crate::error::AdminError;
use crate::store::ApiKey;

/// A model as the upstream exposes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiscoveredModel {
    pub id: String,
    pub name: String,
}

/// Pick the credential to discover with. Zero keys is the distinct no-keys
/// condition and short-circuits before any network I/O; otherwise the first
/// active key wins, falling back to the first key when none are active.
pub fn select_discovery_key(keys: &[ApiKey]) -> Result<&ApiKey, AdminError> {
    if keys.is_empty() {
        return Err(AdminError::NoApiKeys);
    }
    Ok(keys.iter().find(|k| k.is_active).unwrap_or(&keys[0]))
}

/// Fetch the model list from `{base_url}/models` with the given secret.
/// Any upstream failure surfaces as [`AdminError::ModelFetchFailed`] with
/// the upstream's own message so the operator sees what went wrong.
pub async fn discover_models(
    client: &Client,
    base_url: &str,
    api_key: &str,
) -> Result<Vec<DiscoveredModel>, AdminError> {
    let url = format!("{}/models", base_url.trim_end_matches('/'));
    debug!("Discovering models from {url}");

    let response = client
        .get(&url)
        .bearer_auth(api_key)
        .send()
        .await
        .map_err(|e| AdminError::ModelFetchFailed(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AdminError::ModelFetchFailed(e.to_string()))?;

    if !status.is_success() {
        return Err(AdminError::ModelFetchFailed(upstream_message(
            status.as_u16(),
            &body,
        )));
    }

    let value: Value = serde_json::from_str(&body)
        .map_err(|e| AdminError::ModelFetchFailed(format!("invalid response body: {e}")))?;
    Ok(parse_model_list(&value))
}

/// Extract `{id, name}` pairs from an OpenAI-style model list. Accepts the
/// standard `{"data": [...]}` envelope or a bare array; the name falls back
/// to the id when the upstream omits it.
fn parse_model_list(value: &Value) -> Vec<DiscoveredModel> {
    let items = value
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| value.as_array());

    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id").and_then(Value::as_str)?.to_string();
            let name = item
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| id.clone());
            Some(DiscoveredModel { id, name })
        })
        .collect()
}

/// Compact upstream error for the operator: prefer the JSON error message,
/// fall back to a trimmed raw body.
fn upstream_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            // Truncate on a char boundary; upstream bodies are arbitrary text
            let trimmed = body.trim();
            match trimmed.char_indices().nth(200) {
                Some((cut, _)) => format!("{}...", &trimmed[..cut]),
                None => trimmed.to_string(),
            }
        });
    if detail.is_empty() {
        format!("upstream returned HTTP {status}")
    } else {
        format!("HTTP {status}: {detail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, is_active: bool) -> ApiKey {
        ApiKey {
            id: id.to_string(),
            provider_id: "p1".to_string(),
            name: format!("key-{id}"),
            api_key: "sk-test".to_string(),
            is_active,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_no_keys_is_a_distinct_condition() {
        let err = select_discovery_key(&[]).unwrap_err();
        assert!(matches!(err, AdminError::NoApiKeys));
    }

    #[test]
    fn test_prefers_first_active_key() {
        let keys = vec![key("a", false), key("b", true), key("c", true)];
        assert_eq!(select_discovery_key(&keys).unwrap().id, "b");
    }

    #[test]
    fn test_falls_back_to_first_key_when_none_active() {
        let keys = vec![key("a", false), key("b", false)];
        assert_eq!(select_discovery_key(&keys).unwrap().id, "a");
    }

    #[test]
    fn test_parse_openai_envelope() {
        let value = serde_json::json!({
            "object": "list",
            "data": [
                {"id": "gpt-4o", "object": "model"},
                {"id": "gpt-4o-mini", "name": "GPT-4o mini"},
            ]
        });
        let models = parse_model_list(&value);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "gpt-4o");
        assert_eq!(models[1].name, "GPT-4o mini");
    }

    #[test]
    fn test_parse_bare_array() {
        let value = serde_json::json!([{"id": "llama-3"}]);
        let models = parse_model_list(&value);
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "llama-3");
    }

    #[test]
    fn test_parse_entries_without_id_are_skipped() {
        let value = serde_json::json!({"data": [{"name": "nameless"}, {"id": "ok"}]});
        assert_eq!(parse_model_list(&value).len(), 1);
    }

    #[test]
    fn test_upstream_message_prefers_json_error() {
        let msg = upstream_message(401, r#"{"error": {"message": "invalid api key"}}"#);
        assert_eq!(msg, "HTTP 401: invalid api key");
    }

    #[test]
    fn test_upstream_message_falls_back_to_body() {
        let msg = upstream_message(503, "service down");
        assert_eq!(msg, "HTTP 503: service down");
    }

    #[test]
    fn test_upstream_message_empty_body() {
        let msg = upstream_message(500, "");
        assert_eq!(msg, "upstream returned HTTP 500");
    }

    #[test]
    fn test_upstream_message_truncates_multibyte_body_without_panicking() {
        // 199 ASCII chars put the multi-byte char right at the cut point
        let body = format!("{}é gateway error page, much more text follows", "x".repeat(199));
        let msg = upstream_message(502, &body);
        assert!(msg.starts_with("HTTP 502: "));
        assert!(msg.ends_with("..."));
        assert!(msg.contains('é'));
    }

    #[test]
    fn test_upstream_message_short_body_is_not_truncated() {
        let msg = upstream_message(502, "café unavailable");
        assert_eq!(msg, "HTTP 502: café unavailable");
    }
}
