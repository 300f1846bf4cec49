use chrono::{DateTime, FixedOffset, Utc};
use std::collections::BTreeMap;

pub const UNTITLED_ENTRY: &str = "No Title";
pub const UNTITLED_ARTICLE: &str = "Untitled";

/// One item pulled out of a syndication feed.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    /// Raw title; may be empty.
    pub title: String,
    pub published: Option<DateTime<Utc>>,
    pub link: String,
    pub summary: String,
}

impl FeedEntry {
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            UNTITLED_ENTRY
        } else {
            title
        }
    }
}

/// A feed after fetching: where it came from and what it contained.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub source_name: String,
    pub entries: Vec<FeedEntry>,
}

/// The persisted markdown form of a feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRecord {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub link: String,
    pub source: String,
    pub body: String,
    /// Metadata keys other than title/date/link/source.
    pub extra: BTreeMap<String, String>,
}

impl ArticleRecord {
    /// The `date` field as a timestamp, if it parses as RFC 3339 or RFC 2822.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        let date = self.date.trim();
        DateTime::parse_from_rfc3339(date)
            .or_else(|_| DateTime::parse_from_rfc2822(date))
            .ok()
    }

    /// Plain-text rendering of the HTML body.
    pub fn excerpt(&self) -> String {
        html2text::from_read(self.body.as_bytes(), 80)
            .trim()
            .to_string()
    }
}
