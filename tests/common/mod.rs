//! Test helpers for integration tests.
//!
//! Provides a scripted feed fetcher, a recording notifier, a store that can
//! be made to fail, and a harness wiring them to a SQLite-backed service.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use rssbot::config::RssConfig;
use rssbot::{
    BotError, Database, FeedFetcher, FeedItem, Notifier, RefreshEngine, Result, RssService,
    SqliteStore, SubscribeRequest, SubscriptionStore,
};

/// Fixed clock used by refresh tests.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Build a feed item published `age` before [`now`].
pub fn item(guid: &str, link: &str, age: Duration) -> FeedItem {
    FeedItem::new(guid, link)
        .with_title(format!("Title {guid}"))
        .with_description("Body<br />text")
        .with_published_at(now() - age)
}

/// Fetcher returning whatever items were last set.
#[derive(Default)]
pub struct StaticFetcher {
    items: Mutex<Vec<FeedItem>>,
    urls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn set_items(&self, items: Vec<FeedItem>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(self.items.lock().unwrap().clone())
    }
}

/// Notifier recording every message.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, channel: &str, message: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }
}

/// Store wrapper whose writes can be switched to fail.
pub struct FlakyStore<S> {
    inner: S,
    fail_writes: AtomicBool,
}

impl<S: SubscriptionStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BotError::StoreUnavailable("backend offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: SubscriptionStore> SubscriptionStore for FlakyStore<S> {
    async fn get(&self, channel: &str, key: &str) -> Result<String> {
        self.inner.get(channel, key).await
    }

    async fn put(&self, channel: &str, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.inner.put(channel, key, value).await
    }

    async fn delete(&self, channel: &str, key: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(channel, key).await
    }

    async fn list_keys(&self, channel: &str) -> Result<BTreeSet<String>> {
        self.inner.list_keys(channel).await
    }
}

/// Service wired to an in-memory SQLite database.
pub struct TestBot {
    pub db: Database,
    pub store: Arc<FlakyStore<SqliteStore>>,
    pub fetcher: Arc<StaticFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: Arc<RssService>,
}

impl TestBot {
    pub async fn new() -> Self {
        let db = Database::open_in_memory().await.unwrap();
        let store = Arc::new(FlakyStore::new(SqliteStore::new(db.pool().clone())));
        let fetcher = Arc::new(StaticFetcher::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let engine = RefreshEngine::new(
            store.clone(),
            fetcher.clone(),
            notifier.clone(),
            &RssConfig::default(),
        );
        let service = Arc::new(RssService::new(store.clone(), engine));

        Self {
            db,
            store,
            fetcher,
            notifier,
            service,
        }
    }

    /// Subscribe `channel` to a test feed.
    pub async fn subscribe(&self, channel: &str) {
        let request = SubscribeRequest::new(channel, "alice", "https://example.com/feed")
            .in_team(channel.contains('#'));
        self.service.subscribe(&request).await.unwrap();
    }
}
