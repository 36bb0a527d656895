use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::timestamp_millis;
use crate::db;
use crate::error::AdminError;

/// The two system prompts the product uses. Exactly one record exists per
/// type; writes are upserts keyed on the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PromptType {
    #[serde(rename = "master")]
    Master,
    #[serde(rename = "proSearch")]
    ProSearch,
}

pub const PROMPT_TYPES: [PromptType; 2] = [PromptType::Master, PromptType::ProSearch];

impl PromptType {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptType::Master => "master",
            PromptType::ProSearch => "proSearch",
        }
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(PromptType::Master),
            "proSearch" => Ok(PromptType::ProSearch),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemPrompt {
    #[serde(rename = "type")]
    pub prompt_type: PromptType,
    pub content: String,
    pub updated_at: u64,
}

pub struct PromptStore;

impl PromptStore {
    pub fn new() -> Self {
        Self
    }

    /// Returns one record per prompt type; types never written come back
    /// with empty content.
    pub async fn list(&self) -> Result<Vec<SystemPrompt>, AdminError> {
        let conn = db::get_conn()?;
        let mut rows = conn
            .query(
                "SELECT prompt_type, content, updated_at FROM system_prompts",
                (),
            )
            .await
            .map_err(|e| AdminError::DatabaseError(format!("Failed to list prompts: {e}")))?;

        let mut stored = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let Some(prompt_type) = row
                .get::<String>(0)
                .ok()
                .and_then(|s| s.parse::<PromptType>().ok())
            else {
                continue;
            };
            stored.push(SystemPrompt {
                prompt_type,
                content: row.get::<String>(1).unwrap_or_default(),
                updated_at: row.get::<i64>(2).unwrap_or(0) as u64,
            });
        }

        Ok(PROMPT_TYPES
            .iter()
            .map(|t| {
                stored
                    .iter()
                    .find(|p| p.prompt_type == *t)
                    .cloned()
                    .unwrap_or(SystemPrompt {
                        prompt_type: *t,
                        content: String::new(),
                        updated_at: 0,
                    })
            })
            .collect())
    }

    pub async fn upsert(
        &self,
        prompt_type: PromptType,
        content: String,
    ) -> Result<SystemPrompt, AdminError> {
        let prompt = SystemPrompt {
            prompt_type,
            content,
            updated_at: timestamp_millis(),
        };
        let conn = db::get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO system_prompts (prompt_type, content, updated_at) VALUES (?, ?, ?)",
            (
                prompt.prompt_type.as_str(),
                prompt.content.as_str(),
                prompt.updated_at as i64,
            ),
        )
        .await
        .map_err(|e| AdminError::DatabaseError(format!("Failed to upsert prompt: {e}")))?;
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_type_round_trip() {
        for t in PROMPT_TYPES {
            assert_eq!(t.as_str().parse::<PromptType>(), Ok(t));
        }
        assert!("prosearch".parse::<PromptType>().is_err());
    }

    #[test]
    fn test_prompt_type_serde_names() {
        assert_eq!(
            serde_json::to_string(&PromptType::ProSearch).unwrap(),
            "\"proSearch\""
        );
    }
}
