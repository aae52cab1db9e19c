//! Date/time utilities for feed timestamps.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Parse a feed-provided publish timestamp.
///
/// Accepts RFC 2822 (RSS `pubDate`), RFC 3339 (Atom) and the plain
/// `YYYY-MM-DD HH:MM:SS` form, which is taken as UTC.
pub fn parse_feed_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    None
}

/// Age of an item at `now`. Negative for future-dated items.
pub fn age(now: DateTime<Utc>, published_at: DateTime<Utc>) -> Duration {
    now.signed_duration_since(published_at)
}

/// Convert a window in seconds to a chrono duration, saturating on overflow.
pub fn window(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}
