use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use shared::{
    default_subject, load_articles, load_template, renderer_for, send_newsletter, Composer,
    Config, Error, SendOutcome,
};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "send-newsletter")]
#[command(about = "Render the latest articles as an HTML newsletter and send it via Mailchimp")]
struct Args {
    /// Directory of markdown articles (overrides ARTICLES_DIR)
    #[arg(short, long)]
    articles_dir: Option<PathBuf>,

    /// Number of articles to include (overrides NEWSLETTER_ARTICLE_LIMIT)
    #[arg(short, long)]
    limit: Option<usize>,

    /// Subject line (defaults to "<prefix> - YYYY-MM-DD")
    #[arg(short, long)]
    subject: Option<String>,

    /// Write the rendered HTML here instead of sending
    #[arg(long, value_name = "FILE")]
    dry_run: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = Config::from_env();
    if let Some(dir) = args.articles_dir {
        config.articles_dir = dir;
    }
    if let Some(limit) = args.limit {
        config.article_limit = limit;
    }

    println!("📖 Loading articles from {}", config.articles_dir.display());
    let articles = match load_articles(&config.articles_dir, config.article_limit) {
        Ok(articles) => articles,
        Err(Error::MissingDirectory(dir)) => {
            println!("Directory {} does not exist. Exiting.", dir.display());
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to load articles"),
    };
    println!("✓ Loaded {} articles", articles.len());

    let subject = args
        .subject
        .unwrap_or_else(|| default_subject(&config.subject_prefix, Utc::now()));

    println!("\n📝 Rendering newsletter...");
    let composer = Composer::new(
        renderer_for(config.template_engine),
        load_template(&config.template_dir),
    );
    let html = composer.compose(&articles, &subject);

    if let Some(path) = args.dry_run {
        fs::write(&path, &html)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("✓ HTML saved to: {}", path.display());
        return Ok(());
    }

    println!("\n📨 Sending \"{}\"...", subject);
    match send_newsletter(&config, &subject, &html)
        .await
        .context("Failed to send newsletter")?
    {
        SendOutcome::Sent { campaign_id } => {
            println!("\n✅ Newsletter sent! (campaign {})", campaign_id);
        }
        SendOutcome::Skipped(reason) => {
            println!("Skipping send: {}", reason);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
