// Public modules
pub mod campaign;
pub mod config;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod io;
pub mod models;
pub mod newsletter;
pub mod slug;

// Re-export commonly used types
pub use campaign::{
    default_subject, send_campaign, send_newsletter, CampaignApi, CampaignSettings,
    MailchimpClient, SendOutcome,
};
pub use config::{Config, MailchimpConfig, TemplateEngine};
pub use error::{Error, Result};
pub use feed::{parse_feed, FeedFetcher, HttpFeedFetcher};
pub use ingest::{IngestOutcome, IngestReport, Ingester};
pub use io::{load_articles, parse_article, write_article_if_absent};
pub use models::{ArticleRecord, FeedEntry, FetchedFeed};
pub use newsletter::{load_template, renderer_for, Composer, TemplateRenderer};
pub use slug::{derive_slug, slugify};
