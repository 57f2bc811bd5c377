//! Subscription loading and feed retrieval.
//!
//! - [`opml`] - OPML subscription list parsing
//! - [`parser`] - RSS/Atom entry extraction using the `feed-rs` crate
//! - [`fetcher`] - HTTP retrieval and the recency filter
//!
//! # Example
//!
//! ```ignore
//! use kindle_digest::feed::{fetch_all, parse};
//!
//! let feeds = parse(Path::new("/path/to/subscriptions.opml")).await?;
//! let results = fetch_all(&client, &feeds, cutoff, 1).await;
//! ```

mod fetcher;
mod opml;
mod parser;

pub use fetcher::{fetch_all, fetch_recent_links, select_recent, FetchError, FetchResult};
pub use opml::{parse, OpmlError, OpmlFeed};
pub use parser::{parse_feed, FeedEntry};
