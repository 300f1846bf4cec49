use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::feed::FeedFetcher;
use crate::io::write_article_if_absent;
use crate::models::{ArticleRecord, FeedEntry};
use crate::slug::derive_slug;

/// What happened to one feed source during a run.
#[derive(Debug)]
pub struct SourceReport {
    pub url: String,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<String>,
    /// Entries that could not be written, by slug.
    pub failed: Vec<(String, Error)>,
    /// Set when the feed itself could not be fetched or parsed.
    pub error: Option<Error>,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub sources: Vec<SourceReport>,
}

impl IngestReport {
    pub fn written_count(&self) -> usize {
        self.sources.iter().map(|s| s.written.len()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.sources.iter().map(|s| s.skipped.len()).sum()
    }

    pub fn failed_entry_count(&self) -> usize {
        self.sources.iter().map(|s| s.failed.len()).sum()
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| s.error.is_some())
    }
}

#[derive(Debug)]
pub enum IngestOutcome {
    /// The feed list was empty after trimming; nothing was fetched.
    NoSources,
    Completed(IngestReport),
}

/// Build the record persisted for `entry`.
pub fn build_record(entry: &FeedEntry, source_name: &str) -> ArticleRecord {
    let now = Utc::now();
    let published = entry.published.unwrap_or(now);

    ArticleRecord {
        slug: derive_slug(&entry.title, &entry.link, now),
        title: entry.display_title().to_string(),
        date: published.to_rfc3339_opts(SecondsFormat::Secs, true),
        link: entry.link.trim().to_string(),
        source: source_name.trim().to_string(),
        body: entry.summary.clone(),
        extra: BTreeMap::new(),
    }
}

/// Fetches feeds one at a time and writes each new entry as an article file.
pub struct Ingester<'a, F: FeedFetcher> {
    fetcher: &'a F,
    output_dir: &'a Path,
}

impl<'a, F: FeedFetcher> Ingester<'a, F> {
    pub fn new(fetcher: &'a F, output_dir: &'a Path) -> Self {
        Self {
            fetcher,
            output_dir,
        }
    }

    /// Ingest every source. A failing source is recorded and the rest continue.
    pub async fn run(&self, sources: &[String]) -> Result<IngestOutcome> {
        if sources.is_empty() {
            return Ok(IngestOutcome::NoSources);
        }

        fs::create_dir_all(self.output_dir).map_err(|e| Error::io(self.output_dir, e))?;

        let mut report = IngestReport::default();
        for url in sources {
            println!("📡 Fetching {}", url);
            let source = self.ingest_source(url).await;
            if let Some(ref e) = source.error {
                warn!(url = %url, error = %e, "feed source failed");
                println!("  ✗ {}", e);
            }
            report.sources.push(source);
        }

        Ok(IngestOutcome::Completed(report))
    }

    async fn ingest_source(&self, url: &str) -> SourceReport {
        let mut report = SourceReport {
            url: url.to_string(),
            written: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            error: None,
        };

        let feed = match self.fetcher.fetch(url).await {
            Ok(feed) => feed,
            Err(e) => {
                report.error = Some(e);
                return report;
            }
        };
        debug!(url, entries = feed.entries.len(), "parsed feed");

        for entry in &feed.entries {
            let record = build_record(entry, &feed.source_name);
            match write_article_if_absent(self.output_dir, &record) {
                Ok(Some(path)) => {
                    println!("  ✓ Wrote {}", path.display());
                    report.written.push(path);
                }
                Ok(None) => report.skipped.push(record.slug),
                Err(e) => {
                    warn!(slug = %record.slug, error = %e, "could not write article");
                    println!("  ✗ {}", e);
                    report.failed.push((record.slug, e));
                }
            }
        }

        report
    }
}
