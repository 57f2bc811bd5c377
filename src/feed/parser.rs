use chrono::{DateTime, Utc};
use feed_rs::model::Link;
use feed_rs::parser;
use url::Url;

/// One entry of a fetched feed, reduced to what the digest needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// `published` if the feed gave one, otherwise `updated`.
    pub published: Option<DateTime<Utc>>,
    pub link: Option<String>,
}

/// Parses an RSS or Atom document.
///
/// Relative entry links are resolved against `base`, normally the address
/// the feed was fetched from. Without a base they are kept as written.
pub fn parse_feed(
    bytes: &[u8],
    base: Option<&Url>,
) -> Result<Vec<FeedEntry>, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            published: entry.published.or(entry.updated),
            link: article_link(&entry.links).map(|href| resolve(&href, base)),
        })
        .collect();

    Ok(entries)
}

/// Picks the entry's article link: the first `alternate` (or rel-less) link,
/// else whatever link comes first.
fn article_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn resolve(href: &str, base: Option<&Url>) -> String {
    match base.map(|base| base.join(href)) {
        Some(Ok(url)) => url.to_string(),
        _ => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rss_pub_date_and_link() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
    <item>
        <title>One</title>
        <link>https://example.com/one</link>
        <pubDate>Tue, 10 Jun 2025 04:00:00 GMT</pubDate>
    </item>
</channel></rss>"#;

        let entries = parse_feed(rss.as_bytes(), None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/one"));
        assert_eq!(
            entries[0].published,
            Some(Utc.with_ymd_and_hms(2025, 6, 10, 4, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_rss_item_without_date_or_link() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
    <item><guid>1</guid><title>Bare</title></item>
</channel></rss>"#;

        let entries = parse_feed(rss.as_bytes(), None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].published, None);
        assert_eq!(entries[0].link, None);
    }

    #[test]
    fn test_atom_falls_back_to_updated() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <id>urn:feed</id>
  <updated>2025-06-10T12:00:00Z</updated>
  <entry>
    <title>Only updated</title>
    <id>urn:entry:1</id>
    <updated>2025-06-09T08:30:00Z</updated>
    <link rel="alternate" href="https://example.com/atom-1"/>
  </entry>
</feed>"#;

        let entries = parse_feed(atom.as_bytes(), None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].published,
            Some(Utc.with_ymd_and_hms(2025, 6, 9, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_atom_published_wins_over_updated() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <id>urn:feed</id>
  <updated>2025-06-10T12:00:00Z</updated>
  <entry>
    <title>Both</title>
    <id>urn:entry:1</id>
    <published>2025-06-01T00:00:00Z</published>
    <updated>2025-06-09T08:30:00Z</updated>
    <link href="https://example.com/atom-1"/>
  </entry>
</feed>"#;

        let entries = parse_feed(atom.as_bytes(), None).unwrap();
        assert_eq!(
            entries[0].published,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_atom_prefers_alternate_link() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <id>urn:feed</id>
  <updated>2025-06-10T12:00:00Z</updated>
  <entry>
    <title>Links</title>
    <id>urn:entry:1</id>
    <updated>2025-06-09T08:30:00Z</updated>
    <link rel="replies" href="https://example.com/atom-1#comments"/>
    <link rel="alternate" href="https://example.com/atom-1"/>
  </entry>
</feed>"#;

        let entries = parse_feed(atom.as_bytes(), None).unwrap();
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/atom-1"));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(parse_feed(b"<not valid xml", None).is_err());
        assert!(parse_feed(b"definitely not a feed", None).is_err());
    }

    #[test]
    fn test_relative_links_resolved_against_base() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
    <item><title>Rel</title><link>/posts/1</link></item>
    <item><title>Sibling</title><link>2.html</link></item>
    <item><title>Abs</title><link>https://other.example.org/x</link></item>
</channel></rss>"#;

        let base = Url::parse("https://blog.example.com/feeds/main.xml").unwrap();
        let links: Vec<_> = parse_feed(rss.as_bytes(), Some(&base))
            .unwrap()
            .into_iter()
            .map(|e| e.link)
            .collect();
        assert_eq!(
            links,
            vec![
                Some("https://blog.example.com/posts/1".to_string()),
                Some("https://blog.example.com/feeds/2.html".to_string()),
                Some("https://other.example.org/x".to_string()),
            ]
        );
    }
}
