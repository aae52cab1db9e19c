//! Feed subscription and refresh for rssbot.
//!
//! Each channel follows at most one feed. The [`RefreshEngine`] decides which
//! items to announce and which dedup records to drop; [`RssService`] wraps it
//! with the subscribe, unsubscribe, status and lookup operations.

pub mod engine;
pub mod fetcher;
pub mod service;
pub mod types;

pub use engine::{classify, ItemAction, RefreshEngine, RefreshReport};
pub use fetcher::{parse_feed, validate_url, FeedFetcher, RssFetcher};
pub use service::{RssService, SubscribeRequest};
pub use types::{normalize_markup, resolve_id, FeedItem, ItemRecord, Subscription};
