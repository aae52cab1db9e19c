//! RSS feed fetcher with security measures.
//!
//! Fetches a feed over HTTP, guards against SSRF and oversized bodies, and
//! normalizes RSS 2.0, Atom and JSON Feed documents into [`FeedItem`]s.

use std::io::Cursor;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use crate::config::RssConfig;
use crate::datetime::parse_feed_timestamp;
use crate::rss::types::FeedItem;
use crate::{BotError, Result};

/// Source of feed items for a URL.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch the feed at `url` and return its items in document order.
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>>;
}

/// HTTP feed fetcher.
pub struct RssFetcher {
    client: Client,
    max_feed_size: u64,
    allow_private_hosts: bool,
}

impl RssFetcher {
    /// Create a fetcher from the `[rss]` configuration section.
    pub fn from_config(config: &RssConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| BotError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BotError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BotError::Fetch(format!("HTTP error: {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(self.too_large(content_length));
            }
        }

        // Content-Length may be missing or wrong, so enforce the cap while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| BotError::Fetch(format!("failed to read response: {}", e)))?
        {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > self.max_feed_size {
                return Err(self.too_large(body.len() as u64));
            }
        }

        Ok(body)
    }

    fn too_large(&self, size: u64) -> BotError {
        BotError::Fetch(format!(
            "feed too large: {} bytes (max {} bytes)",
            size, self.max_feed_size
        ))
    }
}

#[async_trait]
impl FeedFetcher for RssFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        validate_url(url, self.allow_private_hosts)?;

        let body = self.download(url).await?;
        let items = parse_feed(&body)?;
        debug!("Fetched {} items from {}", items.len(), url);

        Ok(items)
    }
}

/// Validate a feed URL.
///
/// The URL must use http or https and have a host. Unless `allow_private`
/// is set, loopback, private, link-local and internal hosts are rejected.
pub fn validate_url(url: &str, allow_private: bool) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| BotError::Fetch(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(BotError::Fetch(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| BotError::Fetch("URL has no host".to_string()))?;

    if allow_private {
        return Ok(());
    }

    match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(BotError::Fetch(format!("forbidden host: {}", domain)));
            }
        }
        url::Host::Ipv4(ipv4) => check_ip(IpAddr::V4(ipv4))?,
        url::Host::Ipv6(ipv6) => check_ip(IpAddr::V6(ipv6))?,
    }

    Ok(())
}

fn check_ip(ip: IpAddr) -> Result<()> {
    if is_private_ip(&ip) {
        return Err(BotError::Fetch(format!(
            "private IP address not allowed: {}",
            ip
        )));
    }
    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: &[&str] = &[
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|s| host.ends_with(s))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                || ipv4.is_documentation()
                // Carrier-grade NAT: 100.64.0.0/10
                || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
        }
        IpAddr::V6(ipv6) => {
            let segments = ipv6.segments();
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (segments[0] & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (segments[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Parse a feed document into items.
///
/// RSS (0.9x, 1.0 and 2.0) is read first so the item GUID and `pubDate`
/// (or `dc:date`) come through exactly as written. Anything else goes
/// through feed-rs.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedItem>> {
    match ::rss::Channel::read_from(Cursor::new(bytes)) {
        Ok(channel) => Ok(channel.items().iter().map(item_from_rss).collect()),
        Err(rss_err) => {
            debug!("Not an RSS 2.0 document ({}), trying feed-rs", rss_err);
            let feed = parser::parse(bytes)
                .map_err(|e| BotError::Fetch(format!("failed to parse feed: {}", e)))?;
            Ok(feed.entries.into_iter().map(item_from_entry).collect())
        }
    }
}

fn item_from_rss(item: &::rss::Item) -> FeedItem {
    // RSS 1.0 and some RSS 2.0 feeds only date items with dc:date
    let published = item
        .pub_date()
        .or_else(|| {
            item.dublin_core_ext()
                .and_then(|dc| dc.dates().first())
                .map(String::as_str)
        })
        .unwrap_or_default()
        .to_string();
    let published_at = parse_feed_timestamp(&published);

    FeedItem {
        title: item.title().unwrap_or_default().to_string(),
        description: item.description().unwrap_or_default().to_string(),
        link: item.link().unwrap_or_default().to_string(),
        guid: item
            .guid()
            .map(|g| g.value().to_string())
            .unwrap_or_default(),
        published,
        published_at,
    }
}

fn item_from_entry(entry: feed_rs::model::Entry) -> FeedItem {
    let published_at = entry.published.or(entry.updated);

    FeedItem {
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        description: entry
            .summary
            .map(|t| t.content)
            .or(entry.content.and_then(|c| c.body))
            .unwrap_or_default(),
        link: entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default(),
        guid: entry.id,
        published: published_at.map(|dt| dt.to_rfc2822()).unwrap_or_default(),
        published_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a loopback port and return its URL.
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            // The client may hang up early once it has seen enough
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}/feed", addr)
    }

    fn local_fetcher(max_feed_size_bytes: u64) -> RssFetcher {
        RssFetcher::from_config(&RssConfig {
            allow_private_hosts: true,
            max_feed_size_bytes,
            ..RssConfig::default()
        })
        .unwrap()
    }

    fn chunked(chunks: &[&str]) -> String {
        let mut response = String::from(
            "HTTP/1.1 200 OK\r\nContent-Type: application/rss+xml\r\n\
             Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        );
        for chunk in chunks {
            response.push_str(&format!("{:x}\r\n{}\r\n", chunk.len(), chunk));
        }
        response.push_str("0\r\n\r\n");
        response
    }

    #[test]
    fn test_validate_url_valid() {
        assert!(validate_url("https://example.com/feed.xml", false).is_ok());
        assert!(validate_url("http://example.com/rss", false).is_ok());
    }

    #[test]
    fn test_validate_url_invalid_scheme() {
        let result = validate_url("ftp://example.com/feed.xml", false);
        assert!(matches!(result, Err(BotError::Fetch(_))));

        assert!(validate_url("file:///etc/passwd", true).is_err());
        assert!(validate_url("not a url", true).is_err());
    }

    #[test]
    fn test_validate_url_forbidden_hosts() {
        assert!(validate_url("http://localhost/feed", false).is_err());
        assert!(validate_url("http://printer.local/feed", false).is_err());
        assert!(validate_url("http://wiki.internal/feed", false).is_err());
        assert!(validate_url("http://127.0.0.1/feed", false).is_err());
        assert!(validate_url("http://10.1.2.3/feed", false).is_err());
        assert!(validate_url("http://172.20.0.1/feed", false).is_err());
        assert!(validate_url("http://192.168.1.1/feed", false).is_err());
        assert!(validate_url("http://169.254.169.254/latest", false).is_err());
        assert!(validate_url("http://[::1]/feed", false).is_err());
    }

    #[test]
    fn test_validate_url_allow_private() {
        assert!(validate_url("http://localhost:8080/feed", true).is_ok());
        assert!(validate_url("http://127.0.0.1/feed", true).is_ok());
    }

    #[test]
    fn test_is_forbidden_hostname() {
        assert!(is_forbidden_hostname("localhost"));
        assert!(is_forbidden_hostname("LOCALHOST"));
        assert!(is_forbidden_hostname("nas.lan"));
        assert!(is_forbidden_hostname("mail.corp"));
        assert!(!is_forbidden_hostname("example.com"));
        assert!(!is_forbidden_hostname("localhost.example.com"));
    }

    #[test]
    fn test_is_private_ip() {
        let private = [
            "127.0.0.1",
            "10.0.0.1",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.0.1",
            "169.254.1.1",
            "0.0.0.0",
            "255.255.255.255",
            "192.0.2.1",
            "100.64.0.1",
            "::1",
            "::",
            "fd00::1",
            "fe80::1",
            "::ffff:127.0.0.1",
        ];
        for ip in private {
            assert!(is_private_ip(&ip.parse().unwrap()), "{ip} should be private");
        }

        let public = ["8.8.8.8", "172.32.0.1", "100.128.0.1", "2001:4860::8888"];
        for ip in public {
            assert!(!is_private_ip(&ip.parse().unwrap()), "{ip} should be public");
        }
    }

    #[test]
    fn test_parse_feed_rss() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com</link>
    <description>A test feed</description>
    <item>
      <title>First Post</title>
      <link>https://example.com/post/1</link>
      <description>Line one&lt;br /&gt;line two</description>
      <guid>42</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Second Post</title>
      <link>https://example.com/view?id=99</link>
    </item>
  </channel>
</rss>"#;

        let items = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "First Post");
        assert_eq!(first.link, "https://example.com/post/1");
        assert_eq!(first.description, "Line one<br />line two");
        assert_eq!(first.guid, "42");
        assert_eq!(first.published, "Mon, 01 Jan 2024 00:00:00 +0000");
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );

        let second = &items[1];
        assert_eq!(second.guid, "");
        assert_eq!(second.published, "");
        assert!(second.published_at.is_none());
    }

    #[test]
    fn test_parse_feed_rss_unreadable_date() {
        let xml = r#"<rss version="2.0"><channel><title>T</title><link>https://e.com</link>
<description>d</description>
<item><guid>7</guid><pubDate>sometime last week</pubDate></item>
</channel></rss>"#;

        let items = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(items[0].published, "sometime last week");
        assert!(items[0].published_at.is_none());
    }

    #[test]
    fn test_parse_feed_rss_dublin_core_date() {
        let xml = r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
<channel><title>T</title><link>https://e.com</link><description>d</description>
<item><guid>a1</guid><dc:date>2024-05-31T11:00:00Z</dc:date></item>
<item><guid>a2</guid><pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
<dc:date>2024-05-31T11:00:00Z</dc:date></item>
</channel></rss>"#;

        let items = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].published, "2024-05-31T11:00:00Z");
        assert_eq!(
            items[0].published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 31, 11, 0, 0).unwrap())
        );
        // pubDate wins when both are present
        assert_eq!(items[1].published, "Mon, 01 Jan 2024 00:00:00 +0000");
    }

    #[test]
    fn test_parse_feed_rdf() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns="http://purl.org/rss/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://example.com/">
    <title>RDF Feed</title>
    <link>https://example.com/</link>
    <description>An RSS 1.0 feed</description>
  </channel>
  <item rdf:about="https://example.com/view?id=77">
    <title>RDF Item</title>
    <link>https://example.com/view?id=77</link>
    <description>Dated with Dublin Core</description>
    <dc:date>2024-05-31T11:00:00Z</dc:date>
  </item>
</rdf:RDF>"#;

        let items = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.title, "RDF Item");
        assert_eq!(item.link, "https://example.com/view?id=77");
        assert_eq!(
            item.published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 31, 11, 0, 0).unwrap())
        );
        assert!(!item.published.is_empty());
    }

    #[test]
    fn test_parse_feed_atom() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <id>urn:uuid:feed</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>Atom Entry</title>
    <link href="https://example.com/atom/1"/>
    <id>urn:uuid:entry-1</id>
    <updated>2024-01-02T03:04:05Z</updated>
    <summary>Entry summary</summary>
  </entry>
</feed>"#;

        let items = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.title, "Atom Entry");
        assert_eq!(item.link, "https://example.com/atom/1");
        assert_eq!(item.guid, "urn:uuid:entry-1");
        assert_eq!(item.description, "Entry summary");
        let updated = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(item.published_at, Some(updated));
        assert_eq!(item.published, updated.to_rfc2822());
    }

    #[test]
    fn test_parse_feed_empty_channel() {
        let xml = r#"<rss version="2.0"><channel><title>Empty</title>
<link>https://e.com</link><description>d</description></channel></rss>"#;
        assert!(parse_feed(xml.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_feed_invalid() {
        let result = parse_feed(b"this is not a feed");
        assert!(matches!(result, Err(BotError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_private_host_before_request() {
        let fetcher = RssFetcher::from_config(&RssConfig::default()).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:1/feed").await;

        match result {
            Err(BotError::Fetch(msg)) => assert!(msg.contains("private IP")),
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_local_feed() {
        let body = r#"<rss version="2.0"><channel><title>T</title><link>https://e.com</link>
<description>d</description><item><guid>1</guid></item></channel></rss>"#;
        let url = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ))
        .await;

        let items = local_fetcher(4096).fetch(&url).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "1");
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\n\
             Connection: close\r\n\r\noops"
                .to_string(),
        )
        .await;

        match local_fetcher(4096).fetch(&url).await {
            Err(BotError::Fetch(msg)) => assert!(msg.contains("500"), "{msg}"),
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_content_length_over_cap() {
        let body = "x".repeat(200);
        let url = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ))
        .await;

        match local_fetcher(64).fetch(&url).await {
            Err(BotError::Fetch(msg)) => assert!(msg.contains("feed too large: 200"), "{msg}"),
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_chunked_body_over_cap() {
        let chunk = "y".repeat(40);
        let url = serve_once(chunked(&[&chunk, &chunk, &chunk])).await;

        match local_fetcher(64).fetch(&url).await {
            Err(BotError::Fetch(msg)) => {
                assert!(msg.contains("feed too large"), "{msg}");
                assert!(msg.contains("max 64 bytes"), "{msg}");
            }
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }
}
