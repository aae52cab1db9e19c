//! Feed refresh engine.
//!
//! A refresh reads the channel subscription, snapshots the keys already in
//! the channel namespace, fetches the feed and then walks the items in feed
//! order. Each item is classified once against that snapshot:
//!
//! - [`ItemAction::Retire`]: already recorded. The record is deleted. Records
//!   younger than the retention window are retired on the first refresh that
//!   sees them, older ones because they have aged out.
//! - [`ItemAction::NotifyAndStore`]: not recorded and younger than the
//!   freshness window. A notification is sent, then the record is stored.
//! - [`ItemAction::Skip`]: anything else, including items without a readable
//!   publish time.
//!
//! Because a recorded item is retired on the next refresh while it is still
//! within the retention window, an item that stays fresh across refreshes is
//! announced, retired, and announced again on alternating cycles.
//!
//! The engine keeps no state between calls and takes no lock. Store and
//! notifier failures end the cycle; mutations already made stay in place.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::RssConfig;
use crate::datetime::{age, window};
use crate::notify::{format_notification, Notifier};
use crate::rss::fetcher::FeedFetcher;
use crate::rss::types::{FeedItem, ItemRecord, Subscription};
use crate::store::{SubscriptionStore, CONFIG_KEY};
use crate::{BotError, Result};

/// What a refresh does with one feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    /// Announce the item and store its record.
    NotifyAndStore,
    /// Delete the item's record.
    Retire {
        /// The item is at or past the retention window.
        aged_out: bool,
    },
    /// Leave the store untouched.
    Skip,
}

/// Classify an item.
///
/// `age` is `None` when the publish time could not be read.
pub fn classify(
    exists: bool,
    age: Option<Duration>,
    freshness: Duration,
    retention: Duration,
) -> ItemAction {
    let Some(age) = age else {
        return ItemAction::Skip;
    };

    if exists {
        ItemAction::Retire {
            aged_out: age >= retention,
        }
    } else if age < freshness {
        ItemAction::NotifyAndStore
    } else {
        ItemAction::Skip
    }
}

/// Counters for one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Items returned by the fetcher.
    pub fetched: usize,
    /// Notifications delivered.
    pub notified: usize,
    /// Records written.
    pub stored: usize,
    /// Records deleted.
    pub retired: usize,
    /// Deleted records that were past the retention window.
    pub expired: usize,
    /// Items left alone.
    pub skipped: usize,
}

impl fmt::Display for RefreshReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fetched, {} notified, {} stored, {} retired ({} expired), {} skipped",
            self.fetched, self.notified, self.stored, self.retired, self.expired, self.skipped
        )
    }
}

/// Runs refresh cycles for channels.
pub struct RefreshEngine {
    store: Arc<dyn SubscriptionStore>,
    fetcher: Arc<dyn FeedFetcher>,
    notifier: Arc<dyn Notifier>,
    freshness: Duration,
    retention: Duration,
}

impl RefreshEngine {
    /// Create an engine with the windows from the `[rss]` section.
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        fetcher: Arc<dyn FeedFetcher>,
        notifier: Arc<dyn Notifier>,
        config: &RssConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            freshness: window(config.freshness_window_secs),
            retention: window(config.retention_window_secs),
        }
    }

    /// Refresh a channel as of now.
    pub async fn refresh(&self, channel: &str) -> Result<RefreshReport> {
        self.refresh_at(channel, Utc::now()).await
    }

    /// Refresh a channel, measuring item ages against `now`.
    pub async fn refresh_at(&self, channel: &str, now: DateTime<Utc>) -> Result<RefreshReport> {
        let subscription = self.subscription(channel).await?;
        let existing = self.store.list_keys(channel).await?;

        let items = self.fetcher.fetch(&subscription.url).await.map_err(|e| {
            warn!("Fetch failed for {} ({}): {}", channel, subscription.url, e);
            e
        })?;

        let mut report = RefreshReport {
            fetched: items.len(),
            ..RefreshReport::default()
        };

        for item in &items {
            self.process_item(channel, item, &existing, now, &mut report)
                .await?;
        }

        info!("Refreshed {}: {}", channel, report);
        Ok(report)
    }

    async fn subscription(&self, channel: &str) -> Result<Subscription> {
        let raw = match self.store.get(channel, CONFIG_KEY).await {
            Ok(raw) => raw,
            Err(BotError::NotFound(_)) => {
                return Err(BotError::NoSubscription(channel.to_string()));
            }
            Err(e) => return Err(e),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    async fn process_item(
        &self,
        channel: &str,
        item: &FeedItem,
        existing: &BTreeSet<String>,
        now: DateTime<Utc>,
        report: &mut RefreshReport,
    ) -> Result<()> {
        let record = ItemRecord::from_feed_item(item);
        let exists = existing.contains(&record.id);
        let item_age = item.published_at.map(|published| age(now, published));
        let action = classify(exists, item_age, self.freshness, self.retention);

        debug!(
            "Item {} in {}: exists={} age={:?} -> {:?}",
            record.id, channel, exists, item_age, action
        );

        match action {
            ItemAction::Retire { aged_out } => {
                self.store.delete(channel, &record.id).await?;
                report.retired += 1;
                if aged_out {
                    report.expired += 1;
                }
            }
            ItemAction::NotifyAndStore => {
                self.notifier
                    .send(channel, &format_notification(&record))
                    .await?;
                report.notified += 1;

                let json = serde_json::to_string(&record)?;
                self.store.put(channel, &record.id, &json).await?;
                report.stored += 1;
            }
            ItemAction::Skip => {
                report.skipped += 1;
            }
        }

        Ok(())
    }
}
