use anyhow::{Context, Result};
use clap::Parser;
use shared::config::parse_feed_list;
use shared::{Config, HttpFeedFetcher, IngestOutcome, Ingester};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fetch-feeds")]
#[command(about = "Fetch RSS/Atom feeds and save each new entry as a markdown article")]
struct Args {
    /// Comma-separated feed URLs (overrides RSS_FEED_URLS)
    #[arg(short, long)]
    feeds: Option<String>,

    /// Directory to write articles into (overrides OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = Config::from_env();
    if let Some(feeds) = args.feeds {
        config.feed_urls = parse_feed_list(&feeds);
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    let fetcher = HttpFeedFetcher::new(config.http_timeout)?;
    let outcome = Ingester::new(&fetcher, &config.output_dir)
        .run(&config.feed_urls)
        .await
        .context("Failed to ingest feeds")?;

    let report = match outcome {
        IngestOutcome::NoSources => {
            println!("No RSS_FEED_URLS provided in environment.");
            return Ok(());
        }
        IngestOutcome::Completed(report) => report,
    };

    println!(
        "\n✅ Wrote {} new articles to {} ({} already present)",
        report.written_count(),
        config.output_dir.display(),
        report.skipped_count()
    );

    if report.failed_entry_count() > 0 {
        println!(
            "\n⚠ {} entries could not be written:",
            report.failed_entry_count()
        );
        for (slug, e) in report.sources.iter().flat_map(|s| &s.failed) {
            println!("  ✗ {}: {}", slug, e);
        }
    }

    let failed: Vec<_> = report.failed_sources().collect();
    if !failed.is_empty() {
        println!("\n⚠ {} feeds could not be fetched:", failed.len());
        for source in failed {
            println!("  ✗ {}", source.url);
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
