mod analytics;
mod models;
mod prompts;
mod providers;
mod session;
mod tiers;
mod users;

// Glob re-exports so utoipa's `routes!()` macro can find the hidden `__path_*`
// structs alongside the handler functions at the `crate::routes::admin::*` path.
pub use analytics::*;
pub use models::*;
pub use prompts::*;
pub use providers::*;
pub use session::*;
pub use tiers::*;
pub use users::*;

use serde::Serialize;
use url::Url;
use utoipa::ToSchema;

// --- Shared response types ---

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// --- Validation helpers ---

const MAX_NAME_LENGTH: usize = 100;

pub(super) fn validate_name(label: &str, name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("{label} cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("{label} too long (max {MAX_NAME_LENGTH} characters)"));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(format!("{label} cannot contain control characters"));
    }
    Ok(())
}

/// Providers must point at an OpenAI-compatible REST endpoint.
pub(super) fn validate_base_url(base_url: &str) -> Result<(), String> {
    let parsed =
        Url::parse(base_url.trim()).map_err(|_| "Base URL is not a valid URL".to_string())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err("Base URL must use http or https".to_string());
    }
    if parsed.host_str().is_none() {
        return Err("Base URL must have a host".to_string());
    }
    Ok(())
}

const MAX_MODEL_ID_LENGTH: usize = 100;

/// Normalize a model entry: trim the id (rejecting whitespace-only input)
/// and default the display name to the id when none was given. Works the
/// same for discovered and manually entered models.
pub(super) fn normalize_model_entry(
    model_id: &str,
    display_name: Option<&str>,
) -> Result<(String, String), String> {
    let id = model_id.trim();
    if id.is_empty() {
        return Err("Model ID cannot be empty".to_string());
    }
    if id.len() > MAX_MODEL_ID_LENGTH {
        return Err(format!(
            "Model ID too long (max {MAX_MODEL_ID_LENGTH} characters)"
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '/' | '-'))
    {
        return Err(
            "Model ID can only contain letters, digits, dots, underscores, colons, slashes, and hyphens"
                .to_string(),
        );
    }

    let name = display_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(id)
        .to_string();
    Ok((id.to_string(), name))
}

pub(super) fn validate_cost(label: &str, cost: f64) -> Result<(), String> {
    if !cost.is_finite() {
        return Err(format!("{label} must be a finite number"));
    }
    if cost < 0.0 {
        return Err(format!("{label} cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Provider name", "OpenRouter").is_ok());
        assert!(validate_name("Provider name", "   ").is_err());
        assert!(validate_name("Key name", "a\tb").is_err());
        assert!(validate_name("Key name", &"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_name_length_counts_characters_not_bytes() {
        // 60 two-byte chars: 120 bytes but well under the 100-char limit
        assert!(validate_name("Provider name", &"é".repeat(60)).is_ok());
        assert!(validate_name("Provider name", &"é".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_base_url() {
        assert!(validate_base_url("https://api.openai.com/v1").is_ok());
        assert!(validate_base_url("http://localhost:8080/v1").is_ok());
        assert!(validate_base_url("ftp://example.com").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn test_model_entry_rejects_empty_id_after_trim() {
        assert!(normalize_model_entry("", None).is_err());
        assert!(normalize_model_entry("   ", Some("Friendly")).is_err());
    }

    #[test]
    fn test_model_entry_display_name_defaults_to_id() {
        let (id, name) = normalize_model_entry("  gpt-4o  ", None).unwrap();
        assert_eq!(id, "gpt-4o");
        assert_eq!(name, "gpt-4o");

        let (_, name) = normalize_model_entry("gpt-4o", Some("   ")).unwrap();
        assert_eq!(name, "gpt-4o");

        let (_, name) = normalize_model_entry("gpt-4o", Some("GPT-4o")).unwrap();
        assert_eq!(name, "GPT-4o");
    }

    #[test]
    fn test_model_entry_charset() {
        assert!(normalize_model_entry("openai/gpt-4o:free", None).is_ok());
        assert!(normalize_model_entry("bad id with spaces", None).is_err());
    }

    #[test]
    fn test_validate_cost() {
        assert!(validate_cost("Input cost", 0.0).is_ok());
        assert!(validate_cost("Input cost", 1.25).is_ok());
        assert!(validate_cost("Input cost", -0.1).is_err());
        assert!(validate_cost("Input cost", f64::NAN).is_err());
    }
}
