use std::path::Path;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;
use turso::{Builder, Connection, Database};

use crate::error::AdminError;

/// Global database instance
static DATABASE: OnceCell<Arc<Database>> = OnceCell::const_new();

/// Initialize the database and create all tables
pub async fn init_db(path: &Path) -> Result<(), AdminError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AdminError::DatabaseError(format!("Failed to create DB directory: {e}"))
        })?;
    }

    let path_str = path.to_str().unwrap_or("admin.db");
    let db = Builder::new_local(path_str)
        .build()
        .await
        .map_err(|e| AdminError::DatabaseError(format!("Failed to open database: {e}")))?;

    let conn = db
        .connect()
        .map_err(|e| AdminError::DatabaseError(format!("Failed to connect: {e}")))?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS providers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            base_url TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        )
        "#,
        (),
    )
    .await
    .map_err(|e| AdminError::DatabaseError(format!("Failed to create providers table: {e}")))?;

    // Ordered per provider via sort_order; secrets stored raw, masked on read
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS api_keys (
            id TEXT PRIMARY KEY,
            provider_id TEXT NOT NULL REFERENCES providers(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            api_key TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
        (),
    )
    .await
    .map_err(|e| AdminError::DatabaseError(format!("Failed to create api_keys table: {e}")))?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS models (
            id TEXT PRIMARY KEY,
            provider_id TEXT NOT NULL REFERENCES providers(id) ON DELETE CASCADE,
            api_key_id TEXT NOT NULL,
            model_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            min_tier TEXT NOT NULL,
            context_window INTEGER NOT NULL,
            input_cost_per_1k REAL NOT NULL DEFAULT 0,
            output_cost_per_1k REAL NOT NULL DEFAULT 0,
            supports_vision INTEGER NOT NULL DEFAULT 0,
            is_thinking INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
        "#,
        (),
    )
    .await
    .map_err(|e| AdminError::DatabaseError(format!("Failed to create models table: {e}")))?;

    // Full TierConfig serialized as JSON; updates are whole-record replacements
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS tiers (
            tier_name TEXT PRIMARY KEY,
            config TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
        (),
    )
    .await
    .map_err(|e| AdminError::DatabaseError(format!("Failed to create tiers table: {e}")))?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            name TEXT,
            username TEXT,
            tier TEXT NOT NULL DEFAULT 'free',
            tokens_total INTEGER NOT NULL DEFAULT 0,
            tokens_this_month INTEGER NOT NULL DEFAULT 0,
            pro_replies_total INTEGER NOT NULL DEFAULT 0,
            pro_replies_daily INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
        "#,
        (),
    )
    .await
    .map_err(|e| AdminError::DatabaseError(format!("Failed to create users table: {e}")))?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS system_prompts (
            prompt_type TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
        (),
    )
    .await
    .map_err(|e| {
        AdminError::DatabaseError(format!("Failed to create system_prompts table: {e}"))
    })?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS admin_sessions (
            token TEXT PRIMARY KEY,
            expires_at INTEGER NOT NULL
        )
        "#,
        (),
    )
    .await
    .map_err(|e| {
        AdminError::DatabaseError(format!("Failed to create admin_sessions table: {e}"))
    })?;

    DATABASE
        .set(Arc::new(db))
        .map_err(|_| AdminError::DatabaseError("Database already initialized".into()))?;

    info!("Database initialized at {}", path_str);
    Ok(())
}

/// Get a database connection
pub fn get_conn() -> Result<Connection, AdminError> {
    let db = DATABASE
        .get()
        .ok_or_else(|| AdminError::DatabaseError("Database not initialized".into()))?;
    db.connect()
        .map_err(|e| AdminError::DatabaseError(format!("Failed to get connection: {e}")))
}
