//! In-memory subscription store.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SubscriptionStore;
use crate::{BotError, Result};

/// Volatile store keeping every namespace in a map.
#[derive(Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held for a channel.
    pub async fn len(&self, channel: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(channel)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get(&self, channel: &str, key: &str) -> Result<String> {
        self.namespaces
            .read()
            .await
            .get(channel)
            .and_then(|ns| ns.get(key))
            .cloned()
            .ok_or_else(|| BotError::NotFound(format!("key {key} in {channel}")))
    }

    async fn put(&self, channel: &str, key: &str, value: &str) -> Result<()> {
        self.namespaces
            .write()
            .await
            .entry(channel.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, channel: &str, key: &str) -> Result<()> {
        let mut namespaces = self.namespaces.write().await;
        if let Some(ns) = namespaces.get_mut(channel) {
            ns.remove(key);
            if ns.is_empty() {
                namespaces.remove(channel);
            }
        }
        Ok(())
    }

    async fn list_keys(&self, channel: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(channel)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }
}
