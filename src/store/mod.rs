//! Per-channel key-value store.
//!
//! Each channel owns a namespace of string keys. The namespace holds one
//! subscription record under [`CONFIG_KEY`] and one dedup record per tracked
//! feed item, keyed by the item identifier. Every call is atomic on its own;
//! nothing is atomic across keys.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::Result;

/// Key of the subscription record inside a channel namespace.
pub const CONFIG_KEY: &str = "config";

/// Key-value namespace keyed by channel.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Read a value.
    ///
    /// Fails with `NotFound` if the key is absent and `StoreUnavailable`
    /// if the backend fails.
    async fn get(&self, channel: &str, key: &str) -> Result<String>;

    /// Insert or replace a value.
    async fn put(&self, channel: &str, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key succeeds.
    async fn delete(&self, channel: &str, key: &str) -> Result<()>;

    /// List every key in the channel namespace.
    async fn list_keys(&self, channel: &str) -> Result<BTreeSet<String>>;
}
