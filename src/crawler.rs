use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::Span;
use utoipa::ToSchema;

use crate::browser::{CookieSink, Page, SCROLL_TO_BOTTOM};
use crate::card::{parse_card, ArticleCard, FeedSelectors};
use crate::dedup::SeenLinks;
use crate::error::CrawlError;
use crate::session::bootstrap_session;

pub const DEFAULT_TARGET_URL: &str = "https://www.zhihu.com/creator/manage/creation/article";

/// Tuning for the scroll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Fixed pause after each scroll for lazily loaded cards to render.
    pub scroll_delay: Duration,
    /// Consecutive iterations without a new card before the feed counts as exhausted.
    pub stable_iterations: u32,
    /// Hard stop. `None` means convergence is the only exit.
    pub max_iterations: Option<u32>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            scroll_delay: Duration::from_secs(3),
            stable_iterations: 3,
            max_iterations: None,
        }
    }
}

/// Everything a crawl of the feed needs.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub target_url: String,
    pub cookies_file: PathBuf,
    pub selectors: FeedSelectors,
    pub settings: CrawlSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Converged,
    IterationCap,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutcome {
    /// Unique by link, in first-seen order.
    pub articles: Vec<ArticleCard>,
    pub iterations: u32,
    /// Cards dropped because extraction failed, summed over all iterations.
    pub failed_cards: usize,
    pub stop_reason: StopReason,
}

#[derive(Debug, Default)]
struct CrawlState {
    seen: SeenLinks,
    articles: Vec<ArticleCard>,
    stable_iterations: u32,
}

impl CrawlState {
    fn accept(&mut self, card: ArticleCard) -> bool {
        if !self.seen.insert(&card.link) {
            return false;
        }
        self.articles.push(card);
        true
    }
}

/// Scrolls the feed until it stops producing new cards.
///
/// Each iteration scrolls to the bottom, waits, re-reads every rendered card
/// and keeps the ones whose link was not seen before. Scroll and query
/// failures abort; a card that fails to parse is logged and dropped.
pub struct ScrollCrawler<'p, P: Page> {
    page: &'p P,
    selectors: &'p FeedSelectors,
    settings: &'p CrawlSettings,
    span: Span,
}

impl<'p, P: Page> ScrollCrawler<'p, P> {
    pub fn new(page: &'p P, selectors: &'p FeedSelectors, settings: &'p CrawlSettings, span: Span) -> Self {
        Self {
            page,
            selectors,
            settings,
            span,
        }
    }

    pub fn run(self) -> Result<CrawlOutcome, CrawlError> {
        let _entered = self.span.enter();
        tracing::info!("starting feed extraction");

        let mut state = CrawlState::default();
        let mut iteration: u32 = 0;
        let mut failed_cards = 0;

        let stop_reason = loop {
            iteration = iteration.saturating_add(1);

            self.page
                .evaluate(SCROLL_TO_BOTTOM)
                .map_err(|e| CrawlError::Scroll { iteration, source: e.into() })?;

            if !self.settings.scroll_delay.is_zero() {
                std::thread::sleep(self.settings.scroll_delay);
            }

            let handles = self
                .page
                .query_all(&self.selectors.card)
                .map_err(|e| CrawlError::Query {
                    selector: self.selectors.card.clone(),
                    iteration,
                    source: e.into(),
                })?;

            let before = state.articles.len();
            for (index, handle) in handles.iter().enumerate() {
                match parse_card(handle, self.selectors) {
                    Ok(card) => {
                        let (title, link) = (card.title.clone(), card.link.clone());
                        if state.accept(card) {
                            tracing::info!(%title, %link, total = state.articles.len(), "article extracted");
                        }
                    }
                    Err(e) => {
                        failed_cards += 1;
                        tracing::warn!(iteration, index, error = %e, "card extraction failed, skipping");
                    }
                }
            }

            if state.articles.len() == before {
                state.stable_iterations += 1;
                tracing::info!(
                    iteration,
                    stable = state.stable_iterations,
                    total = state.articles.len(),
                    "no new articles after scroll"
                );
                if state.stable_iterations >= self.settings.stable_iterations {
                    tracing::info!(iteration, total = state.articles.len(), "reached end of feed");
                    break StopReason::Converged;
                }
            } else {
                state.stable_iterations = 0;
            }

            if self.settings.max_iterations.is_some_and(|cap| iteration >= cap) {
                tracing::warn!(iteration, total = state.articles.len(), "iteration cap hit before feed converged");
                break StopReason::IterationCap;
            }
        };

        Ok(CrawlOutcome {
            articles: state.articles,
            iterations: iteration,
            failed_cards,
            stop_reason,
        })
    }
}

/// Full crawl on a fresh page: cookies, navigation, then the scroll loop.
pub fn crawl_feed<P: Page + CookieSink>(page: &P, config: &CrawlConfig, span: Span) -> Result<CrawlOutcome, CrawlError> {
    span.in_scope(|| -> Result<(), CrawlError> {
        bootstrap_session(page, &config.cookies_file, &span)?;

        tracing::info!(url = %config.target_url, "navigating to feed");
        page.navigate(&config.target_url).map_err(|e| CrawlError::Navigation {
            url: config.target_url.clone(),
            source: e.into(),
        })?;

        page.wait_for_selector(&config.selectors.list_container)
            .map_err(|e| CrawlError::Navigation {
                url: config.target_url.clone(),
                source: e.into(),
            })
    })?;

    ScrollCrawler::new(page, &config.selectors, &config.settings, span).run()
}
