//! Builds a Kindle-friendly HTML digest from the recent entries of the feeds
//! listed in an OPML file, and mails it to a send-to-Kindle address.

pub mod config;
pub mod delivery;
pub mod digest;
pub mod feed;
pub mod pipeline;
pub mod util;
