use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::timestamp_millis;
use crate::db;
use crate::error::AdminError;
use crate::tier::{TierName, is_available};

/// Placeholder context window for new assignments; the operator edits the
/// real value later.
pub const DEFAULT_CONTEXT_WINDOW: u32 = 8192;

/// Cost per 1k tokens, input and output. New assignments start at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CostPer1k {
    pub input: f64,
    pub output: f64,
}

/// An upstream model bound to a provider, a key, and a minimum tier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelAssignment {
    #[serde(rename = "_id")]
    pub id: String,
    pub provider_id: String,
    pub api_key_id: String,
    pub model_id: String,
    pub display_name: String,
    pub min_tier: TierName,
    pub context_window: u32,
    pub cost_per_1k_tokens: CostPer1k,
    pub supports_vision: bool,
    pub is_thinking: bool,
    pub created_at: u64,
}

pub struct ModelStore;

impl ModelStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn list(&self) -> Result<Vec<ModelAssignment>, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query(
                "SELECT id, provider_id, api_key_id, model_id, display_name, min_tier, \
                 context_window, input_cost_per_1k, output_cost_per_1k, supports_vision, \
                 is_thinking, created_at FROM models ORDER BY created_at",
                (),
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to list models: {e}")))?;

        let mut models = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let Ok(id) = row.get::<String>(0) else {
                continue;
            };
            let min_tier = row
                .get::<String>(5)
                .ok()
                .and_then(|s| s.parse::<TierName>().ok())
                .unwrap_or(TierName::Free);
            models.push(ModelAssignment {
                id,
                provider_id: row.get::<String>(1).unwrap_or_default(),
                api_key_id: row.get::<String>(2).unwrap_or_default(),
                model_id: row.get::<String>(3).unwrap_or_default(),
                display_name: row.get::<String>(4).unwrap_or_default(),
                min_tier,
                context_window: row.get::<i64>(6).unwrap_or(DEFAULT_CONTEXT_WINDOW as i64) as u32,
                cost_per_1k_tokens: CostPer1k {
                    input: row.get::<f64>(7).unwrap_or(0.0),
                    output: row.get::<f64>(8).unwrap_or(0.0),
                },
                supports_vision: row.get::<i64>(9).unwrap_or(0) != 0,
                is_thinking: row.get::<i64>(10).unwrap_or(0) != 0,
                created_at: row.get::<i64>(11).unwrap_or(0) as u64,
            });
        }
        Ok(models)
    }

    /// Models usable by the given tier under the cascading-access rule.
    pub async fn list_for_tier(&self, tier: TierName) -> Result<Vec<ModelAssignment>, AdminError> {
        let all = self.list().await?;
        Ok(all
            .into_iter()
            .filter(|m| is_available(tier, m.min_tier))
            .collect())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        provider_id: String,
        api_key_id: String,
        model_id: String,
        display_name: String,
        min_tier: TierName,
        supports_vision: bool,
        is_thinking: bool,
    ) -> Result<ModelAssignment, AdminError> {
        let model = ModelAssignment {
            id: Uuid::new_v4().to_string(),
            provider_id,
            api_key_id,
            model_id,
            display_name,
            min_tier,
            context_window: DEFAULT_CONTEXT_WINDOW,
            cost_per_1k_tokens: CostPer1k::default(),
            supports_vision,
            is_thinking,
            created_at: timestamp_millis(),
        };

        let conn = db::get_conn()?;
        conn.execute(
            "INSERT INTO models (id, provider_id, api_key_id, model_id, display_name, min_tier, \
             context_window, input_cost_per_1k, output_cost_per_1k, supports_vision, is_thinking, \
             created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                model.id.as_str(),
                model.provider_id.as_str(),
                model.api_key_id.as_str(),
                model.model_id.as_str(),
                model.display_name.as_str(),
                model.min_tier.as_str(),
                model.context_window as i64,
                model.cost_per_1k_tokens.input,
                model.cost_per_1k_tokens.output,
                model.supports_vision as i64,
                model.is_thinking as i64,
                model.created_at as i64,
            ),
        )
        .await
        .map_err(|e| AdminError::DatabaseError(format!("Failed to create model: {e}")))?;
        Ok(model)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        id: &str,
        display_name: Option<String>,
        min_tier: Option<TierName>,
        context_window: Option<u32>,
        input_cost: Option<f64>,
        output_cost: Option<f64>,
        supports_vision: Option<bool>,
        is_thinking: Option<bool>,
    ) -> Result<bool, AdminError> {
        let conn = db::get_conn()?;
        let affected = conn
            .execute(
                "UPDATE models SET \
                 display_name = COALESCE(?, display_name), \
                 min_tier = COALESCE(?, min_tier), \
                 context_window = COALESCE(?, context_window), \
                 input_cost_per_1k = COALESCE(?, input_cost_per_1k), \
                 output_cost_per_1k = COALESCE(?, output_cost_per_1k), \
                 supports_vision = COALESCE(?, supports_vision), \
                 is_thinking = COALESCE(?, is_thinking) \
                 WHERE id = ?",
                (
                    display_name,
                    min_tier.map(|t| t.as_str()),
                    context_window.map(|v| v as i64),
                    input_cost,
                    output_cost,
                    supports_vision.map(|v| v as i64),
                    is_thinking.map(|v| v as i64),
                    id,
                ),
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to update model: {e}")))?;
        Ok(affected > 0)
    }

    /// Hard delete of the assignment only; the provider and key survive.
    pub async fn delete(&self, id: &str) -> Result<bool, AdminError> {
        let conn = db::get_conn()?;
        let affected = conn
            .execute("DELETE FROM models WHERE id = ?", [id])
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to delete model: {e}")))?;
        Ok(affected > 0)
    }

    pub async fn count(&self) -> Result<u64, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM models", ())
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to count models: {e}")))?;
        let count = rows
            .next()
            .await
            .ok()
            .flatten()
            .and_then(|r| r.get::<i64>(0).ok())
            .unwrap_or(0);
        Ok(count as u64)
    }
}
