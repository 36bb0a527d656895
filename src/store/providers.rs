use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::timestamp_millis;
use crate::db;
use crate::error::AdminError;

/// An upstream OpenAI-compatible API endpoint grouping credentials.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub is_active: bool,
    pub created_at: u64,
}

/// A credential owned by a provider. `api_key` holds the raw secret and is
/// never serialized; API responses expose only the masked form.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub api_key: String,
    pub is_active: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

/// What a provider delete took with it. Returned to the caller so the
/// dashboard can tell the operator what cascaded.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CascadeSummary {
    pub deleted_models: u64,
    pub deleted_keys: u64,
}

/// Mask a key secret to a fixed prefix/suffix form for display. Secrets too
/// short to mask safely are hidden entirely.
pub fn mask_secret(secret: &str) -> String {
    if secret.len() >= 12 && secret.is_ascii() {
        format!("{}...{}", &secret[..6], &secret[secret.len() - 4..])
    } else {
        "*".repeat(secret.chars().count().min(12))
    }
}

pub struct ProviderStore;

impl ProviderStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn list(&self) -> Result<Vec<Provider>, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query(
                "SELECT id, name, base_url, is_active, created_at FROM providers ORDER BY created_at",
                (),
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to list providers: {e}")))?;

        let mut providers = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            if let Ok(id) = row.get::<String>(0) {
                providers.push(Provider {
                    id,
                    name: row.get::<String>(1).unwrap_or_default(),
                    base_url: row.get::<String>(2).unwrap_or_default(),
                    is_active: row.get::<i64>(3).unwrap_or(1) != 0,
                    created_at: row.get::<i64>(4).unwrap_or(0) as u64,
                });
            }
        }
        Ok(providers)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Provider>, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query(
                "SELECT id, name, base_url, is_active, created_at FROM providers WHERE id = ?",
                [id],
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to get provider: {e}")))?;

        let Ok(Some(row)) = rows.next().await else {
            return Ok(None);
        };
        Ok(Some(Provider {
            id: row.get::<String>(0).unwrap_or_default(),
            name: row.get::<String>(1).unwrap_or_default(),
            base_url: row.get::<String>(2).unwrap_or_default(),
            is_active: row.get::<i64>(3).unwrap_or(1) != 0,
            created_at: row.get::<i64>(4).unwrap_or(0) as u64,
        }))
    }

    pub async fn create(
        &self,
        name: String,
        base_url: String,
        is_active: bool,
    ) -> Result<Provider, AdminError> {
        let provider = Provider {
            id: Uuid::new_v4().to_string(),
            name,
            base_url,
            is_active,
            created_at: timestamp_millis(),
        };

        let conn = db::get_conn()?;
        conn.execute(
            "INSERT INTO providers (id, name, base_url, is_active, created_at) VALUES (?, ?, ?, ?, ?)",
            (
                provider.id.as_str(),
                provider.name.as_str(),
                provider.base_url.as_str(),
                provider.is_active as i64,
                provider.created_at as i64,
            ),
        )
        .await
        .map_err(|e| AdminError::DatabaseError(format!("Failed to create provider: {e}")))?;
        Ok(provider)
    }

    pub async fn update(
        &self,
        id: &str,
        name: Option<String>,
        base_url: Option<String>,
        is_active: Option<bool>,
    ) -> Result<bool, AdminError> {
        let conn = db::get_conn()?;
        let affected = conn
            .execute(
                "UPDATE providers SET \
                 name = COALESCE(?, name), \
                 base_url = COALESCE(?, base_url), \
                 is_active = COALESCE(?, is_active) \
                 WHERE id = ?",
                (name, base_url, is_active.map(|v| v as i64), id),
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to update provider: {e}")))?;
        Ok(affected > 0)
    }

    /// Delete a provider and everything it owns. The cascade to models and
    /// keys is done explicitly in the same operation so the counts can be
    /// reported back to the operator.
    pub async fn delete(&self, id: &str) -> Result<Option<CascadeSummary>, AdminError> {
        let conn = db::get_conn()?;

        let deleted_models = conn
            .execute("DELETE FROM models WHERE provider_id = ?", [id])
            .await
            .map_err(|e| {
                AdminError::DatabaseError(format!("Failed to delete provider models: {e}"))
            })?;
        let deleted_keys = conn
            .execute("DELETE FROM api_keys WHERE provider_id = ?", [id])
            .await
            .map_err(|e| {
                AdminError::DatabaseError(format!("Failed to delete provider keys: {e}"))
            })?;
        let affected = conn
            .execute("DELETE FROM providers WHERE id = ?", [id])
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to delete provider: {e}")))?;

        if affected == 0 {
            return Ok(None);
        }
        Ok(Some(CascadeSummary {
            deleted_models,
            deleted_keys,
        }))
    }

    pub async fn count(&self) -> Result<u64, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM providers", ())
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to count providers: {e}")))?;
        let count = rows
            .next()
            .await
            .ok()
            .flatten()
            .and_then(|r| r.get::<i64>(0).ok())
            .unwrap_or(0);
        Ok(count as u64)
    }

    // --- API keys ---

    /// List a provider's keys in their stored order, raw secrets included.
    /// Callers serving HTTP responses must mask before returning.
    pub async fn list_keys(&self, provider_id: &str) -> Result<Vec<ApiKey>, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query(
                "SELECT id, provider_id, name, api_key, is_active, created_at, updated_at \
                 FROM api_keys WHERE provider_id = ? ORDER BY sort_order, created_at",
                [provider_id],
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to list API keys: {e}")))?;

        let mut keys = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            if let Ok(id) = row.get::<String>(0) {
                keys.push(ApiKey {
                    id,
                    provider_id: row.get::<String>(1).unwrap_or_default(),
                    name: row.get::<String>(2).unwrap_or_default(),
                    api_key: row.get::<String>(3).unwrap_or_default(),
                    is_active: row.get::<i64>(4).unwrap_or(1) != 0,
                    created_at: row.get::<i64>(5).unwrap_or(0) as u64,
                    updated_at: row.get::<i64>(6).unwrap_or(0) as u64,
                });
            }
        }
        Ok(keys)
    }

    pub async fn create_key(
        &self,
        provider_id: &str,
        name: String,
        api_key: String,
        is_active: bool,
    ) -> Result<ApiKey, AdminError> {
        let conn = db::get_conn()?;

        // Append at the end of the provider's key list
        let mut rows = conn
            .query(
                "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM api_keys WHERE provider_id = ?",
                [provider_id],
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to get key order: {e}")))?;
        let next_order: i64 = rows
            .next()
            .await
            .ok()
            .flatten()
            .and_then(|r| r.get::<i64>(0).ok())
            .unwrap_or(0);

        let now = timestamp_millis();
        let key = ApiKey {
            id: Uuid::new_v4().to_string(),
            provider_id: provider_id.to_string(),
            name,
            api_key,
            is_active,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO api_keys (id, provider_id, name, api_key, is_active, sort_order, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                key.id.as_str(),
                key.provider_id.as_str(),
                key.name.as_str(),
                key.api_key.as_str(),
                key.is_active as i64,
                next_order,
                key.created_at as i64,
                key.updated_at as i64,
            ),
        )
        .await
        .map_err(|e| AdminError::DatabaseError(format!("Failed to create API key: {e}")))?;
        Ok(key)
    }

    pub async fn delete_key(&self, key_id: &str) -> Result<bool, AdminError> {
        let conn = db::get_conn()?;
        let affected = conn
            .execute("DELETE FROM api_keys WHERE id = ?", [key_id])
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to delete API key: {e}")))?;
        Ok(affected > 0)
    }

    /// Check that a key exists and belongs to the given provider.
    pub async fn key_belongs_to(
        &self,
        key_id: &str,
        provider_id: &str,
    ) -> Result<bool, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM api_keys WHERE id = ? AND provider_id = ?",
                [key_id, provider_id],
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to check API key: {e}")))?;
        let count = rows
            .next()
            .await
            .ok()
            .flatten()
            .and_then(|r| r.get::<i64>(0).ok())
            .unwrap_or(0);
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret_keeps_prefix_and_suffix() {
        let masked = mask_secret("sk-abcdefghijklmnopqrstuvwxyz");
        assert_eq!(masked, "sk-abc...wxyz");
        assert!(!masked.contains("defghijklmnopqrstuv"));
    }

    #[test]
    fn test_mask_secret_hides_short_secrets_entirely() {
        assert_eq!(mask_secret("shortkey"), "********");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn test_mask_secret_non_ascii_is_fully_masked() {
        let masked = mask_secret("clé-secrète-très-longue");
        assert!(masked.chars().all(|c| c == '*'));
    }

    #[tokio::test]
    async fn test_delete_cascade_reports_counts() {
        let path = std::env::temp_dir().join(format!("chat-admin-cascade-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        crate::db::init_db(&path).await.unwrap();

        let store = ProviderStore::new();
        let provider = store
            .create("Cascade".into(), "https://api.example.com/v1".into(), true)
            .await
            .unwrap();
        let key = store
            .create_key(&provider.id, "primary".into(), "sk-cascade-1".into(), true)
            .await
            .unwrap();
        store
            .create_key(&provider.id, "backup".into(), "sk-cascade-2".into(), false)
            .await
            .unwrap();
        crate::store::ModelStore::new()
            .create(
                provider.id.clone(),
                key.id.clone(),
                "gpt-4o".into(),
                "GPT-4o".into(),
                crate::tier::TierName::Free,
                false,
                false,
            )
            .await
            .unwrap();

        let summary = store.delete(&provider.id).await.unwrap().unwrap();
        assert_eq!(summary.deleted_models, 1);
        assert_eq!(summary.deleted_keys, 2);

        // Unknown id: no cascade, signalled as None
        assert!(store.delete("missing").await.unwrap().is_none());

        let _ = std::fs::remove_file(&path);
    }
}
