//! RSS service for rssbot.
//!
//! Channel-level operations behind the bot commands. Everything except
//! [`RssService::refresh`] is a plain read or write on the channel namespace.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::rss::engine::{RefreshEngine, RefreshReport};
use crate::rss::types::Subscription;
use crate::store::{SubscriptionStore, CONFIG_KEY};
use crate::{BotError, Result};

/// Request to subscribe a channel to a feed.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    /// Channel to subscribe.
    pub channel: String,
    /// Whether the channel is a team channel.
    pub team: bool,
    /// User issuing the request.
    pub user: String,
    /// Feed URL.
    pub url: String,
}

impl SubscribeRequest {
    /// Create a new subscribe request for a direct conversation.
    pub fn new(
        channel: impl Into<String>,
        user: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            team: false,
            user: user.into(),
            url: url.into(),
        }
    }

    /// Mark the channel as a team channel.
    pub fn in_team(mut self, team: bool) -> Self {
        self.team = team;
        self
    }
}

/// Service for channel subscription operations.
pub struct RssService {
    store: Arc<dyn SubscriptionStore>,
    engine: RefreshEngine,
}

impl RssService {
    /// Create a new service over a store and a refresh engine sharing it.
    pub fn new(store: Arc<dyn SubscriptionStore>, engine: RefreshEngine) -> Self {
        Self { store, engine }
    }

    /// Subscribe a channel, replacing any previous subscription.
    ///
    /// A URL without `http` in it is accepted with a warning.
    pub async fn subscribe(&self, request: &SubscribeRequest) -> Result<Subscription> {
        if !request.url.contains("http") {
            warn!(
                "Subscribing {} to {} which does not look like an http URL ({})",
                request.channel, request.url, request.user
            );
        }

        let subscription = Subscription::new(
            &request.channel,
            request.team,
            &request.user,
            &request.url,
        );
        let json = serde_json::to_string(&subscription)?;
        self.store.put(&request.channel, CONFIG_KEY, &json).await?;

        info!(
            "{} subscribed {} to {}",
            request.user, request.channel, request.url
        );
        Ok(subscription)
    }

    /// Delete every key in the channel namespace.
    ///
    /// Stops at the first failed delete; keys removed before it stay removed.
    /// Returns the number of keys deleted.
    pub async fn unsubscribe(&self, channel: &str) -> Result<usize> {
        let keys = self.store.list_keys(channel).await?;

        for (deleted, key) in keys.iter().enumerate() {
            if let Err(e) = self.store.delete(channel, key).await {
                error!(
                    "Failed to delete {} from {} after {} deletions: {}",
                    key, channel, deleted, e
                );
                return Err(e);
            }
        }

        info!("Unsubscribed {} ({} keys removed)", channel, keys.len());
        Ok(keys.len())
    }

    /// Raw subscription record of a channel.
    pub async fn status(&self, channel: &str) -> Result<String> {
        match self.store.get(channel, CONFIG_KEY).await {
            Err(BotError::NotFound(_)) => Err(BotError::NoSubscription(channel.to_string())),
            other => other,
        }
    }

    /// Raw item record stored under `id`.
    pub async fn get_by_id(&self, channel: &str, id: &str) -> Result<String> {
        self.store.get(channel, id).await
    }

    /// Run a refresh cycle for the channel.
    pub async fn refresh(&self, channel: &str) -> Result<RefreshReport> {
        self.engine.refresh(channel).await
    }

    /// Run a refresh cycle measuring item ages against `now`.
    pub async fn refresh_at(&self, channel: &str, now: DateTime<Utc>) -> Result<RefreshReport> {
        self.engine.refresh_at(channel, now).await
    }
}
