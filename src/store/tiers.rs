use std::collections::HashMap;

use super::timestamp_millis;
use crate::db;
use crate::error::AdminError;
use crate::tier::{TIER_ORDER, TierConfig, TierName};

/// Tier configs are stored as one JSON document per tier name. Updates are
/// whole-record replacements, so overwriting the row is the exact semantics.
pub struct TierStore;

impl TierStore {
    pub fn new() -> Self {
        Self
    }

    /// Always returns exactly one config per tier, in tier order. Tiers
    /// never written get their documented defaults.
    pub async fn list(&self) -> Result<Vec<TierConfig>, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query("SELECT tier_name, config FROM tiers", ())
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to list tiers: {e}")))?;

        let mut stored: HashMap<TierName, TierConfig> = HashMap::new();
        while let Ok(Some(row)) = rows.next().await {
            let Ok(name) = row.get::<String>(0) else {
                continue;
            };
            let Ok(tier) = name.parse::<TierName>() else {
                continue;
            };
            if let Ok(json) = row.get::<String>(1)
                && let Ok(config) = serde_json::from_str::<TierConfig>(&json)
            {
                stored.insert(tier, config);
            }
        }

        Ok(TIER_ORDER
            .iter()
            .map(|tier| {
                stored
                    .remove(tier)
                    .unwrap_or_else(|| TierConfig::defaults_for(*tier))
            })
            .collect())
    }

    pub async fn get(&self, tier: TierName) -> Result<TierConfig, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query(
                "SELECT config FROM tiers WHERE tier_name = ?",
                [tier.as_str()],
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to get tier: {e}")))?;

        if let Ok(Some(row)) = rows.next().await
            && let Ok(json) = row.get::<String>(0)
            && let Ok(config) = serde_json::from_str::<TierConfig>(&json)
        {
            return Ok(config);
        }
        Ok(TierConfig::defaults_for(tier))
    }

    /// Full replacement of the tier's record.
    pub async fn replace(&self, config: &TierConfig) -> Result<(), AdminError> {
        let json = serde_json::to_string(config)
            .map_err(|e| AdminError::DatabaseError(format!("Failed to encode tier: {e}")))?;
        let conn = db::get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO tiers (tier_name, config, updated_at) VALUES (?, ?, ?)",
            (
                config.tier_name.as_str(),
                json.as_str(),
                timestamp_millis() as i64,
            ),
        )
        .await
        .map_err(|e| AdminError::DatabaseError(format!("Failed to replace tier: {e}")))?;
        Ok(())
    }
}
