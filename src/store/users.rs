use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db;
use crate::error::AdminError;
use crate::tier::TierName;

/// Lifetime and current-month token usage for a user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub total: u64,
    pub this_month: u64,
}

/// Pro-reply counters for a user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProRepliesCount {
    pub total: u64,
    pub daily: u64,
}

/// An end-user account as the dashboard sees it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub tier: TierName,
    pub token_usage: TokenUsage,
    pub pro_replies_count: ProRepliesCount,
    pub created_at: u64,
}

/// Aggregates for the analytics overview.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub total_users: u64,
    pub users_by_tier: Vec<TierUserCount>,
    pub tokens_total: u64,
    pub tokens_this_month: u64,
    pub pro_replies_total: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierUserCount {
    pub tier: TierName,
    pub count: u64,
}

pub struct UserStore;

impl UserStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        tier: Option<TierName>,
    ) -> Result<Vec<UserRecord>, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query(
                "SELECT id, email, name, username, tier, tokens_total, tokens_this_month, \
                 pro_replies_total, pro_replies_daily, created_at FROM users ORDER BY created_at",
                (),
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to list users: {e}")))?;

        let needle = search.map(str::to_lowercase);
        let mut users = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let Ok(id) = row.get::<String>(0) else {
                continue;
            };
            let user = UserRecord {
                id,
                email: row.get::<String>(1).unwrap_or_default(),
                name: row.get::<String>(2).ok().filter(|s| !s.is_empty()),
                username: row.get::<String>(3).ok().filter(|s| !s.is_empty()),
                tier: row
                    .get::<String>(4)
                    .ok()
                    .and_then(|s| s.parse::<TierName>().ok())
                    .unwrap_or(TierName::Free),
                token_usage: TokenUsage {
                    total: row.get::<i64>(5).unwrap_or(0) as u64,
                    this_month: row.get::<i64>(6).unwrap_or(0) as u64,
                },
                pro_replies_count: ProRepliesCount {
                    total: row.get::<i64>(7).unwrap_or(0) as u64,
                    daily: row.get::<i64>(8).unwrap_or(0) as u64,
                },
                created_at: row.get::<i64>(9).unwrap_or(0) as u64,
            };

            if let Some(filter) = tier
                && user.tier != filter
            {
                continue;
            }
            if let Some(needle) = &needle
                && !matches_search(&user, needle)
            {
                continue;
            }
            users.push(user);
        }
        Ok(users)
    }

    /// Operator edit: set the tier and/or overwrite the lifetime pro-reply
    /// counter. The counter write replaces the stored value outright.
    pub async fn update(
        &self,
        id: &str,
        tier: Option<TierName>,
        pro_replies_total: Option<u64>,
    ) -> Result<bool, AdminError> {
        let conn = db::get_conn()?;
        let affected = conn
            .execute(
                "UPDATE users SET \
                 tier = COALESCE(?, tier), \
                 pro_replies_total = COALESCE(?, pro_replies_total) \
                 WHERE id = ?",
                (
                    tier.map(|t| t.as_str()),
                    pro_replies_total.map(|v| v as i64),
                    id,
                ),
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to update user: {e}")))?;
        Ok(affected > 0)
    }

    pub async fn usage_totals(&self) -> Result<UsageTotals, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query(
                "SELECT tier, COUNT(*), SUM(tokens_total), SUM(tokens_this_month), \
                 SUM(pro_replies_total) FROM users GROUP BY tier",
                (),
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to aggregate users: {e}")))?;

        let mut totals = UsageTotals::default();
        let mut by_tier: Vec<(TierName, u64)> = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let Some(tier) = row
                .get::<String>(0)
                .ok()
                .and_then(|s| s.parse::<TierName>().ok())
            else {
                continue;
            };
            let count = row.get::<i64>(1).unwrap_or(0) as u64;
            by_tier.push((tier, count));
            totals.total_users += count;
            totals.tokens_total += row.get::<i64>(2).unwrap_or(0) as u64;
            totals.tokens_this_month += row.get::<i64>(3).unwrap_or(0) as u64;
            totals.pro_replies_total += row.get::<i64>(4).unwrap_or(0) as u64;
        }

        // Report all four tiers, zero-filled, in tier order
        totals.users_by_tier = crate::tier::TIER_ORDER
            .iter()
            .map(|tier| TierUserCount {
                tier: *tier,
                count: by_tier
                    .iter()
                    .find(|(t, _)| t == tier)
                    .map(|(_, c)| *c)
                    .unwrap_or(0),
            })
            .collect();
        Ok(totals)
    }
}

fn matches_search(user: &UserRecord, needle: &str) -> bool {
    user.email.to_lowercase().contains(needle)
        || user
            .name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(needle))
        || user
            .username
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserRecord {
        UserRecord {
            id: "u1".into(),
            email: "Ada@Example.com".into(),
            name: Some("Ada Lovelace".into()),
            username: Some("ada".into()),
            tier: TierName::Tier5,
            token_usage: TokenUsage::default(),
            pro_replies_count: ProRepliesCount::default(),
            created_at: 0,
        }
    }

    #[test]
    fn test_search_matches_email_name_and_username() {
        let user = sample_user();
        assert!(matches_search(&user, "ada@example"));
        assert!(matches_search(&user, "lovelace"));
        assert!(matches_search(&user, "ada"));
        assert!(!matches_search(&user, "grace"));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let user = sample_user();
        assert!(matches_search(&user, "ada@example.com"));
    }
}
