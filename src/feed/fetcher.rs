use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::feed::opml::OpmlFeed;
use crate::feed::parser::{parse_feed, FeedEntry};
use crate::util::validate_link;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a single feed.
///
/// None of these abort the run: the feed simply contributes no links.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, malformed address, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Outcome of fetching one subscription.
#[derive(Debug)]
pub struct FetchResult {
    /// Feed address as listed in the subscription document
    pub url: String,
    /// Links of entries newer than the cutoff, or the error that occurred
    pub result: Result<Vec<String>, FetchError>,
}

/// Fetches every subscription and selects links published after `cutoff`.
///
/// With `concurrency` of 1 (the default) feeds are fetched strictly one after
/// another. Larger values fetch up to that many feeds at once. Either way the
/// results come back in subscription order.
///
/// A failing feed never stops the others; its [`FetchResult`] carries the error
/// and a warning is logged.
pub async fn fetch_all(
    client: &reqwest::Client,
    feeds: &[OpmlFeed],
    cutoff: DateTime<Utc>,
    concurrency: usize,
) -> Vec<FetchResult> {
    stream::iter(feeds)
        .map(|feed| async move {
            tracing::info!(url = %feed.xml_url, "Fetching: {}", feed.xml_url);
            let result = fetch_recent_links(client, &feed.xml_url, cutoff).await;
            match &result {
                Ok(links) => {
                    tracing::debug!(url = %feed.xml_url, recent = links.len(), "Feed fetched");
                }
                Err(e) => {
                    tracing::warn!(
                        url = %feed.xml_url,
                        title = %feed.title,
                        error = %e,
                        "Feed fetch failed, skipping"
                    );
                }
            }
            FetchResult {
                url: feed.xml_url.clone(),
                result,
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Fetches one feed and returns the links of entries newer than `cutoff`.
///
/// No retries: a single failed request is reported as-is.
///
/// # Errors
///
/// - [`FetchError::Network`] - Connection, TLS or address errors
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - Response exceeded 10MB
/// - [`FetchError::IncompleteResponse`] - Body shorter than its Content-Length
/// - [`FetchError::Parse`] - Invalid RSS/Atom XML
pub async fn fetch_recent_links(
    client: &reqwest::Client,
    url: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<String>, FetchError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    // Relative entry links point into the site the feed was served from.
    let base = response.url().clone();
    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    let entries =
        parse_feed(&bytes, Some(&base)).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(select_recent(entries, cutoff))
}

/// Keeps the links of entries whose effective publish time is strictly after `cutoff`.
///
/// Entries without a timestamp, without a link, or whose link is not an
/// absolute http(s) address are dropped.
pub fn select_recent(entries: Vec<FeedEntry>, cutoff: DateTime<Utc>) -> Vec<String> {
    let total = entries.len();
    let mut undated = 0usize;
    let mut unlinked = 0usize;

    let links: Vec<String> = entries
        .into_iter()
        .filter_map(|entry| {
            let Some(published) = entry.published else {
                undated += 1;
                return None;
            };
            if published <= cutoff {
                return None;
            }
            let Some(link) = entry.link else {
                unlinked += 1;
                return None;
            };
            match validate_link(&link) {
                Ok(_) => Some(link),
                Err(e) => {
                    tracing::debug!(link = %link, error = %e, "Skipping entry with unusable link");
                    unlinked += 1;
                    None
                }
            }
        })
        .collect();

    if undated > 0 || unlinked > 0 {
        tracing::debug!(
            total = total,
            undated = undated,
            unlinked = unlinked,
            "Entries skipped"
        );
    }

    links
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
