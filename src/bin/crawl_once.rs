//! One crawl without the HTTP service or the database. Prints the outcome as
//! JSON on stdout.
//!
//!     crawl_once                          # live, configured from the environment
//!     crawl_once --replay a.html b.html   # replay saved feed snapshots

use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenv::dotenv;

use creation_crawler::browser::Page;
use creation_crawler::config::AppConfig;
use creation_crawler::crawler::{CrawlOutcome, CrawlSettings, ScrollCrawler};
use creation_crawler::snapshot::SnapshotPage;
use creation_crawler::worker::{check_prerequisites, crawl_with_chrome};

fn replay(config: &AppConfig, files: &[String]) -> Result<CrawlOutcome> {
    if files.is_empty() {
        bail!("--replay needs at least one HTML file");
    }

    let page = SnapshotPage::from_files(files)?;
    let selectors = &config.crawl.selectors;
    let settings = CrawlSettings {
        scroll_delay: Duration::ZERO,
        ..config.crawl.settings.clone()
    };

    page.wait_for_selector(&selectors.list_container)
        .context("feed list missing from the first snapshot")?;
    let span = tracing::info_span!("replay", snapshots = files.len());
    Ok(ScrollCrawler::new(&page, selectors, &settings, span).run()?)
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = AppConfig::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    let outcome = match args.first().map(String::as_str) {
        Some("--replay") => replay(&config, &args[1..])?,
        Some(other) => bail!("unknown argument {other:?}; usage: crawl_once [--replay FILE...]"),
        None => {
            check_prerequisites(&config.crawl)?;
            let span = tracing::info_span!("crawl_once", url = %config.crawl.target_url);
            crawl_with_chrome(&config.browser, &config.crawl, span)?
        }
    };

    tracing::info!(
        articles = outcome.articles.len(),
        iterations = outcome.iterations,
        failed_cards = outcome.failed_cards,
        "crawl finished"
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
