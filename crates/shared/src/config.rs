use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_OUTPUT_DIR: &str = "website/_articles";
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";
pub const DEFAULT_ARTICLE_LIMIT: usize = 5;
pub const DEFAULT_SUBJECT_PREFIX: &str = "Weekly Newsletter";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Which template renderer the composer runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateEngine {
    Loop,
    Raw,
}

/// Mailchimp settings, present only when every required key is set.
#[derive(Debug, Clone)]
pub struct MailchimpConfig {
    pub api_key: String,
    pub server_prefix: String,
    pub list_id: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_urls: Vec<String>,
    pub output_dir: PathBuf,
    pub articles_dir: PathBuf,
    pub template_dir: PathBuf,
    pub template_engine: TemplateEngine,
    pub article_limit: usize,
    pub subject_prefix: String,
    pub http_timeout: Duration,
    mailchimp: std::result::Result<MailchimpConfig, Vec<&'static str>>,
}

impl Config {
    pub fn from_env() -> Self {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let feed_urls = parse_feed_list(&get("RSS_FEED_URLS").unwrap_or_default());

        let output_dir = get("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let articles_dir = get("ARTICLES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.clone());
        let template_dir = get("TEMPLATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR));

        let template_engine = match get("TEMPLATE_ENGINE").as_deref() {
            Some("none") | Some("raw") => TemplateEngine::Raw,
            _ => TemplateEngine::Loop,
        };

        let article_limit = get("NEWSLETTER_ARTICLE_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ARTICLE_LIMIT);

        let subject_prefix =
            get("NEWSLETTER_SUBJECT_PREFIX").unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string());

        let http_timeout = Duration::from_secs(
            get("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );

        let api_key = get("MAILCHIMP_API_KEY");
        let server_prefix = get("MAILCHIMP_SERVER_PREFIX");
        let list_id = get("MAILCHIMP_LIST_ID");
        let from_email = get("EMAIL_FROM");
        let from_name = get("EMAIL_FROM_NAME");

        let mailchimp = match (api_key, server_prefix, list_id, from_email) {
            (Some(api_key), Some(server_prefix), Some(list_id), Some(from_email)) => {
                Ok(MailchimpConfig {
                    api_key,
                    server_prefix,
                    list_id,
                    from_name: from_name.unwrap_or_else(|| from_email.clone()),
                    from_email,
                })
            }
            (api_key, server_prefix, list_id, from_email) => {
                let mut missing = Vec::new();
                if api_key.is_none() {
                    missing.push("MAILCHIMP_API_KEY");
                }
                if server_prefix.is_none() {
                    missing.push("MAILCHIMP_SERVER_PREFIX");
                }
                if list_id.is_none() {
                    missing.push("MAILCHIMP_LIST_ID");
                }
                if from_email.is_none() {
                    missing.push("EMAIL_FROM");
                }
                Err(missing)
            }
        };

        Self {
            feed_urls,
            output_dir,
            articles_dir,
            template_dir,
            template_engine,
            article_limit,
            subject_prefix,
            http_timeout,
            mailchimp,
        }
    }

    /// Mailchimp settings, or `ConfigurationMissing` naming the absent keys.
    pub fn mailchimp(&self) -> Result<&MailchimpConfig> {
        self.mailchimp
            .as_ref()
            .map_err(|missing| Error::ConfigurationMissing(missing.clone()))
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/rss-newsletter/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("rss-newsletter").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

/// Split a comma-delimited feed list, trimming entries and dropping blanks.
pub fn parse_feed_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
        .collect()
}
