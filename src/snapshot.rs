//! Replays saved HTML of the feed as a [`Page`].
//!
//! Each scroll moves on to the next saved document; once they run out the
//! last one keeps being served, which lets the crawl converge exactly as it
//! would on a fully loaded feed.

use std::cell::Cell;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::browser::{CookieSink, ItemHandle, Page, SessionCookie, SCROLL_TO_BOTTOM};

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector `{selector}`: {e:?}"))
}

pub struct SnapshotPage {
    documents: Vec<Html>,
    scrolls: Cell<usize>,
    cookies: Cell<usize>,
}

impl SnapshotPage {
    pub fn from_html<S: AsRef<str>>(pages: impl IntoIterator<Item = S>) -> Self {
        Self {
            documents: pages.into_iter().map(|p| Html::parse_document(p.as_ref())).collect(),
            scrolls: Cell::new(0),
            cookies: Cell::new(0),
        }
    }

    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let pages = paths
            .iter()
            .map(|p| {
                std::fs::read_to_string(p.as_ref())
                    .with_context(|| format!("failed to read snapshot {}", p.as_ref().display()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_html(pages))
    }

    /// Cookies handed to this page. They have no effect on saved HTML.
    pub fn cookies_received(&self) -> usize {
        self.cookies.get()
    }

    fn current(&self) -> Result<&Html> {
        if self.documents.is_empty() {
            return Err(anyhow!("no snapshots loaded"));
        }
        let index = self.scrolls.get().saturating_sub(1).min(self.documents.len() - 1);
        Ok(&self.documents[index])
    }
}

impl Page for SnapshotPage {
    type Item<'a> = ElementRef<'a>;

    fn navigate(&self, url: &str) -> Result<()> {
        tracing::debug!(%url, "snapshot replay ignores navigation");
        Ok(())
    }

    fn wait_for_selector(&self, selector: &str) -> Result<()> {
        let sel = parse_selector(selector)?;
        if self.current()?.select(&sel).next().is_none() {
            return Err(anyhow!("`{selector}` not present in snapshot"));
        }
        Ok(())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementRef<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.current()?.select(&sel).collect())
    }

    fn evaluate(&self, script: &str) -> Result<Option<Value>> {
        if script == SCROLL_TO_BOTTOM {
            self.scrolls.set(self.scrolls.get() + 1);
        }
        Ok(None)
    }
}

impl<'a> ItemHandle for ElementRef<'a> {
    fn query_selector(&self, selector: &str) -> Result<Option<Self>> {
        let sel = parse_selector(selector)?;
        Ok(self.select(&sel).next())
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self>> {
        let sel = parse_selector(selector)?;
        Ok(self.select(&sel).collect())
    }

    /// Text nodes joined, runs of whitespace collapsed to one space.
    fn inner_text(&self) -> Result<String> {
        let text = self.text().collect::<String>();
        Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.value().attr(name).map(str::to_string))
    }
}

impl CookieSink for SnapshotPage {
    fn add_cookies(&self, cookies: Vec<SessionCookie>) -> Result<()> {
        self.cookies.set(self.cookies.get() + cookies.len());
        Ok(())
    }
}
