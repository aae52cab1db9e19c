//! SQLite-backed subscription store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;

use super::SubscriptionStore;
use crate::db::DbPool;
use crate::{BotError, Result};

/// Subscription store persisting namespaces in the `kv_entries` table.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Create a new store on the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the revision of a key, or None if absent.
    ///
    /// The revision starts at 1 and grows with every overwrite.
    pub async fn revision(&self, channel: &str, key: &str) -> Result<Option<i64>> {
        let revision: Option<i64> = sqlx::query_scalar(
            "SELECT revision FROM kv_entries WHERE channel = $1 AND entry_key = $2",
        )
        .bind(channel)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BotError::StoreUnavailable(e.to_string()))?;

        Ok(revision)
    }
}

#[async_trait]
impl SubscriptionStore for SqliteStore {
    async fn get(&self, channel: &str, key: &str) -> Result<String> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT entry_value FROM kv_entries WHERE channel = $1 AND entry_key = $2",
        )
        .bind(channel)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BotError::StoreUnavailable(e.to_string()))?;

        value.ok_or_else(|| BotError::NotFound(format!("key {key} in {channel}")))
    }

    async fn put(&self, channel: &str, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO kv_entries (channel, entry_key, entry_value, revision, updated_at)
            VALUES ($1, $2, $3, 1, $4)
            ON CONFLICT (channel, entry_key) DO UPDATE SET
                entry_value = excluded.entry_value,
                revision = kv_entries.revision + 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(channel)
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| BotError::StoreUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, channel: &str, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE channel = $1 AND entry_key = $2")
            .bind(channel)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BotError::StoreUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn list_keys(&self, channel: &str) -> Result<BTreeSet<String>> {
        let keys: Vec<String> =
            sqlx::query_scalar("SELECT entry_key FROM kv_entries WHERE channel = $1")
                .bind(channel)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| BotError::StoreUnavailable(e.to_string()))?;

        Ok(keys.into_iter().collect())
    }
}
