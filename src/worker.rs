use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, Span};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::AppState;
use crate::chrome::{self, BrowserConfig, ChromePage};
use crate::crawler::{crawl_feed, CrawlConfig, CrawlOutcome, StopReason};
use crate::db;
use crate::error::{BoxError, CrawlError};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("cookie file {} does not exist", .0.display())]
    Prerequisite(PathBuf),

    #[error("a crawl is already running")]
    InProgress,

    #[error("failed to start the browser")]
    Browser(#[source] BoxError),

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error("failed to store articles")]
    Storage(#[source] BoxError),

    #[error("crawl task did not complete")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of one crawl job.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CrawlSummary {
    pub crawl_id: String,
    pub article_count: usize,
    pub rows_written: u64,
    pub iterations: u32,
    pub failed_cards: usize,
    pub stop_reason: StopReason,
    pub duration_ms: u64,
}

pub fn check_prerequisites(config: &CrawlConfig) -> Result<(), JobError> {
    if !config.cookies_file.exists() {
        return Err(JobError::Prerequisite(config.cookies_file.clone()));
    }
    Ok(())
}

/// Launches Chrome, crawls the feed on a fresh tab and closes Chrome again.
/// Blocking.
pub fn crawl_with_chrome(browser: &BrowserConfig, crawl: &CrawlConfig, span: Span) -> Result<CrawlOutcome, JobError> {
    let chrome = chrome::launch(browser).map_err(|e| JobError::Browser(e.into()))?;
    let page = ChromePage::open(&chrome, browser).map_err(|e| JobError::Browser(e.into()))?;

    Ok(crawl_feed(&page, crawl, span)?)
}

/// Crawls the feed and upserts what it found. At most one job runs at a time.
pub async fn run_crawl_job(state: Arc<AppState>) -> Result<CrawlSummary, JobError> {
    let _running = state.crawl_lock.try_lock().map_err(|_| JobError::InProgress)?;
    check_prerequisites(&state.config.crawl)?;

    let crawl_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("crawl", %crawl_id);
    let started = Instant::now();

    let browser = state.config.browser.clone();
    let crawl = state.config.crawl.clone();
    let task_span = span.clone();
    let outcome = tokio::task::spawn_blocking(move || crawl_with_chrome(&browser, &crawl, task_span)).await??;

    let rows_written = db::upsert_articles(&state.pool, &outcome.articles)
        .instrument(span.clone())
        .await
        .map_err(|e| JobError::Storage(e.into()))?;

    let summary = CrawlSummary {
        crawl_id,
        article_count: outcome.articles.len(),
        rows_written,
        iterations: outcome.iterations,
        failed_cards: outcome.failed_cards,
        stop_reason: outcome.stop_reason,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    span.in_scope(|| {
        tracing::info!(
            articles = summary.article_count,
            iterations = summary.iterations,
            duration_ms = summary.duration_ms,
            "crawl job finished"
        );
    });
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::FeedSelectors;
    use crate::crawler::CrawlSettings;

    #[test]
    fn test_missing_cookie_file_fails_prerequisites() {
        let config = CrawlConfig {
            target_url: "https://example.com".to_string(),
            cookies_file: PathBuf::from("/nonexistent/cookies.json"),
            selectors: FeedSelectors::default(),
            settings: CrawlSettings::default(),
        };
        let err = check_prerequisites(&config).unwrap_err();
        assert!(matches!(err, JobError::Prerequisite(_)));
        assert!(err.to_string().contains("/nonexistent/cookies.json"));
    }
}
