//! rssbot - a chat bot that follows one RSS feed per channel.
//!
//! Each channel keeps its subscription and the dedup records of announced
//! items in its own key-value namespace. A refresh fetches the feed,
//! announces fresh items and retires records inside the retention window.

pub mod bot;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod notify;
pub mod rss;
pub mod store;

pub use bot::{BotCommand, ChatTransport, ConsoleTransport, Dispatcher, InboundMessage};
pub use config::Config;
pub use db::Database;
pub use error::{BotError, Result};
pub use notify::{format_notification, Notifier};
pub use rss::{
    FeedFetcher, FeedItem, ItemAction, ItemRecord, RefreshEngine, RefreshReport, RssFetcher,
    RssService, SubscribeRequest, Subscription,
};
pub use store::{MemoryStore, SqliteStore, SubscriptionStore, CONFIG_KEY};
