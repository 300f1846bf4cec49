use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{FeedEntry, FetchedFeed};

/// Anything that can turn a feed URL into entries.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed>;
}

pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rss-newsletter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| Error::Retrieval {
                url: String::new(),
                source,
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed> {
        let retrieval = |source| Error::Retrieval {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(retrieval)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status,
                body,
            });
        }

        let bytes = response.bytes().await.map_err(retrieval)?;
        debug!(url, bytes = bytes.len(), "fetched feed");

        parse_feed(&bytes, url)
    }
}

/// Parse RSS, Atom or JSON Feed content fetched from `url`.
pub fn parse_feed(content: &[u8], url: &str) -> Result<FetchedFeed> {
    let feed = feed_rs::parser::parse(content).map_err(|e| Error::FeedParse {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let source_name = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            url::Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(String::from))
        })
        .unwrap_or_else(|| url.to_string());

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            published: entry.published.or(entry.updated),
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            summary: entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default(),
        })
        .collect();

    Ok(FetchedFeed {
        source_name,
        entries,
    })
}
