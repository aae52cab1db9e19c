//! RSS types for rssbot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Markup variants normalised to a single space in titles and descriptions.
const LINE_BREAK_MARKUP: &[&str] = &["<br />", "<br/>", "<br>"];

/// Query parameter used to derive an identifier when the feed gives no GUID.
const ID_PARAM: &str = "id=";

/// A channel's feed subscription.
///
/// Stored under the `config` key of the channel namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Channel the subscription belongs to.
    pub channel: String,
    /// Whether the channel is a team channel rather than a direct conversation.
    #[serde(rename = "is_team")]
    pub team: bool,
    /// User who subscribed.
    pub user: String,
    /// Feed URL.
    pub url: String,
}

impl Subscription {
    /// Create a new subscription.
    pub fn new(
        channel: impl Into<String>,
        team: bool,
        user: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            team,
            user: user.into(),
            url: url.into(),
        }
    }
}

/// Dedup record for a feed item, keyed by `id` inside the channel namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item title.
    pub title: String,
    /// Item description.
    pub description: String,
    /// Link to the original article.
    pub link: String,
    /// Resolved identifier.
    pub id: String,
    /// Publish date as given by the feed.
    #[serde(rename = "pubDate")]
    pub pub_date: String,
}

impl ItemRecord {
    /// Build the record for a fetched item.
    ///
    /// Line-break markup in title and description becomes a space and the
    /// identifier is resolved with [`resolve_id`].
    pub fn from_feed_item(item: &FeedItem) -> Self {
        Self {
            title: normalize_markup(&item.title),
            description: normalize_markup(&item.description),
            link: item.link.clone(),
            id: resolve_id(&item.guid, &item.link),
            pub_date: item.published.clone(),
        }
    }
}

/// A normalized item produced by a feed fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    /// Item title.
    pub title: String,
    /// Item description.
    pub description: String,
    /// Link to the original article.
    pub link: String,
    /// GUID as given by the feed. Empty when absent.
    pub guid: String,
    /// Publish date string as given by the feed.
    pub published: String,
    /// Parsed publish time, if the feed gave a readable one.
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// Create a new item with a GUID and link.
    pub fn new(guid: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            link: link.into(),
            ..Self::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the publish time, rendering the feed string as RFC 2822.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published = published_at.to_rfc2822();
        self.published_at = Some(published_at);
        self
    }
}

/// Replace line-break markup with a single space.
pub fn normalize_markup(text: &str) -> String {
    LINE_BREAK_MARKUP
        .iter()
        .fold(text.to_string(), |acc, markup| acc.replace(markup, " "))
}

/// Resolve an item identifier.
///
/// Uses the GUID when present, otherwise everything after the last `id=`
/// in the link. A link without `id=` is used whole.
pub fn resolve_id(guid: &str, link: &str) -> String {
    if !guid.is_empty() {
        return guid.to_string();
    }
    link.rsplit(ID_PARAM).next().unwrap_or_default().to_string()
}
