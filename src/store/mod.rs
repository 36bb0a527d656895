//! Persistence layer. Each store is a thin handle over the global database;
//! all authoritative state lives in SQLite, nothing is cached in memory.

pub mod models;
pub mod prompts;
pub mod providers;
pub mod tiers;
pub mod users;

pub use models::{ModelAssignment, ModelStore};
pub use prompts::{PromptStore, PromptType, SystemPrompt};
pub use providers::{ApiKey, CascadeSummary, Provider, ProviderStore, mask_secret};
pub use tiers::TierStore;
pub use users::{UserRecord, UserStore};

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
