//! Outbound notifications.

use async_trait::async_trait;

use crate::rss::ItemRecord;
use crate::Result;

/// Delivers a message to a channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message` to `channel`.
    async fn send(&self, channel: &str, message: &str) -> Result<()>;
}

/// Render the announcement for a new feed item.
///
/// The title and publish date are quoted lines, the description sits in a
/// fenced block, and the link comes last.
pub fn format_notification(record: &ItemRecord) -> String {
    format!(
        ">{}\n```{}\n```\n>{}\n{}",
        record.title, record.description, record.pub_date, record.link
    )
}

/// Render the reply to a `get` command.
pub fn format_record_reply(raw: &str) -> String {
    format!("```{}```", raw)
}

/// Render the reply to a `status` command.
pub fn format_status_reply(raw: &str) -> String {
    format!("Current status: ```{}```", raw)
}
