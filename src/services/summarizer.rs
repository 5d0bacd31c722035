//! Short descriptions of web pages for link announcements.
//!
//! A page is described as `URL: <status> <content-type> [<title>]`. The title
//! comes from an oEmbed provider when the link points at one, otherwise from
//! the page's `<title>` element.

use std::sync::LazyLock;

use async_trait::async_trait;
use bytes::Bytes;
use fancy_regex::Regex;
use futures::{Stream, StreamExt};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info};

use crate::common::error::SummarizeError;
use crate::config::types::LinksConfig;

/// Most of a page read while looking for its title.
pub const MAX_HTML_PREFIX: usize = 64 * 1024;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("valid title regex"));

/// Fetches a URL and produces a one-line description of it.
#[async_trait]
pub trait PageSummarizer: Send + Sync {
    async fn summarize(&self, url: &str) -> Result<String, SummarizeError>;
}

/// An oEmbed endpoint and the URL prefixes it serves.
struct OEmbedProvider {
    prefixes: &'static [&'static str],
    endpoint: &'static str,
}

const OEMBED_PROVIDERS: &[OEmbedProvider] = &[
    OEmbedProvider {
        prefixes: &[
            "https://www.youtube.com/watch",
            "http://www.youtube.com/watch",
            "https://youtube.com/watch",
            "https://youtu.be/",
            "http://youtu.be/",
        ],
        endpoint: "https://www.youtube.com/oembed",
    },
    OEmbedProvider {
        prefixes: &["https://vimeo.com/", "http://vimeo.com/"],
        endpoint: "https://vimeo.com/api/oembed.json",
    },
];

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    provider_name: Option<String>,
}

/// Page summarizer backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSummarizer {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpSummarizer {
    pub fn new(config: &LinksConfig) -> Result<Self, SummarizeError> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Title as `<title> - <provider>` for URLs served by a known oEmbed
    /// provider. Any failure just means no title.
    async fn oembed_title(&self, url: &str) -> Option<String> {
        let provider = OEMBED_PROVIDERS
            .iter()
            .find(|p| p.prefixes.iter().any(|prefix| url.starts_with(prefix)))?;

        let response = self
            .client
            .get(provider.endpoint)
            .query(&[("url", url), ("format", "json")])
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let body = match response {
            Ok(r) => r.bytes().await,
            Err(e) => {
                info!("oEmbed lookup for {} failed: {}", url, e);
                return None;
            }
        };

        match body.map(|b| oembed_title_from(&b)) {
            Ok(Ok(title)) => title,
            Ok(Err(e)) => {
                info!("oEmbed response for {} unreadable: {}", url, e);
                None
            }
            Err(e) => {
                info!("oEmbed lookup for {} failed: {}", url, e);
                None
            }
        }
    }
}

/// `<title> - <provider>` from an oEmbed JSON document.
fn oembed_title_from(body: &[u8]) -> serde_json::Result<Option<String>> {
    let embed: OEmbedResponse = serde_json::from_slice(body)?;
    let Some(title) = embed.title.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    Ok(Some(match embed.provider_name {
        Some(provider) => format!("{} - {}", title, provider),
        None => title,
    }))
}

#[async_trait]
impl PageSummarizer for HttpSummarizer {
    async fn summarize(&self, url: &str) -> Result<String, SummarizeError> {
        let mut title = self.oembed_title(url).await;

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type)
            .unwrap_or_default()
            .to_string();

        if title.is_none() && status == reqwest::StatusCode::OK && content_type == "text/html" {
            let html = read_head(std::pin::pin!(response.bytes_stream()), MAX_HTML_PREFIX).await?;
            title = Some(parse_title(&html)).filter(|t| !t.is_empty());
        }

        debug!("{} -> {} {} {:?}", url, status.as_u16(), content_type, title);
        Ok(format_summary(status.as_u16(), &content_type, title.as_deref()))
    }
}

/// Read a body until `</title` has been seen or `limit` bytes have arrived.
/// The rest of the body is never requested.
pub async fn read_head<S, E>(mut chunks: S, limit: usize) -> Result<String, E>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    const TITLE_END: &[u8] = b"</title";

    let mut head: Vec<u8> = Vec::new();
    while let Some(chunk) = chunks.next().await {
        // Rescan the tail of the previous chunk so a split tag is found.
        let scan_from = head.len().saturating_sub(TITLE_END.len() - 1);
        head.extend_from_slice(&chunk?);

        let title_done = head[scan_from..]
            .windows(TITLE_END.len())
            .any(|w| w.eq_ignore_ascii_case(TITLE_END));
        if title_done || head.len() >= limit {
            break;
        }
    }

    head.truncate(limit);
    Ok(String::from_utf8_lossy(&head).into_owned())
}

/// `text/html; charset=utf-8` -> `text/html`.
fn media_type(header: &str) -> &str {
    header.split(';').next().unwrap_or_default().trim()
}

pub fn format_summary(status: u16, content_type: &str, title: Option<&str>) -> String {
    match title {
        Some(title) => format!("URL: {} {} [{}]", status, content_type, title),
        None => format!("URL: {} {}", status, content_type),
    }
}

/// Extract the text of the first `<title>` element, whitespace collapsed.
///
/// Returns an empty string when there is no usable title.
pub fn parse_title(html: &str) -> String {
    let raw = match TITLE_RE.captures(html) {
        Ok(Some(caps)) => caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
        Ok(None) => return String::new(),
        Err(e) => {
            info!("Title extraction failed: {}", e);
            return String::new();
        }
    };

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    decode_entities(&collapsed)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
