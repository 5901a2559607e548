//! Deterministic in-memory page for tests.

use std::cell::{Cell, RefCell};

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::browser::{CookieSink, ItemHandle, Page, SessionCookie, SCROLL_TO_BOTTOM};
use crate::card::FeedSelectors;

/// A node whose children are keyed by the selector that finds them.
#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    text: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<(String, FakeNode)>,
}

impl FakeNode {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// A node whose text cannot be read.
    pub fn broken() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, selector: &str, child: FakeNode) -> Self {
        self.children.push((selector.to_string(), child));
        self
    }

    pub fn without(mut self, selector: &str) -> Self {
        self.children.retain(|(s, _)| s != selector);
        self
    }
}

impl ItemHandle for FakeNode {
    fn query_selector(&self, selector: &str) -> Result<Option<Self>> {
        Ok(self
            .children
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, child)| child.clone()))
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self>> {
        Ok(self
            .children
            .iter()
            .filter(|(s, _)| s == selector)
            .map(|(_, child)| child.clone())
            .collect())
    }

    fn inner_text(&self) -> Result<String> {
        self.text.clone().ok_or_else(|| anyhow!("node detached"))
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone()))
    }
}

/// A well-formed feed card using the default selectors.
pub fn card_node(title: &str, link: &str, description: &str, published: &str, stats: &[&str]) -> FakeNode {
    let sel = FeedSelectors::default();
    let mut node = FakeNode::default()
        .with_child(&sel.title, FakeNode::text(title))
        .with_child(&sel.link, FakeNode::text("").attr("href", link))
        .with_child(&sel.description, FakeNode::text(description))
        .with_child(&sel.published_time, FakeNode::text(published));
    for fragment in stats {
        node = node.with_child(&sel.stats_fragment, FakeNode::text(fragment));
    }
    node
}

/// Card with only a link and a title derived from it.
pub fn simple_card(link: &str) -> FakeNode {
    card_node(&format!("title {link}"), link, "desc", "2024-01-01", &["1", "阅读"])
}

/// Serves one DOM snapshot per scroll. Before the first scroll, and after the
/// last snapshot, the nearest snapshot is served.
#[derive(Default)]
pub struct FakePage {
    snapshots: Vec<Vec<FakeNode>>,
    scrolls: Cell<usize>,
    queries: Cell<usize>,
    fail_scroll_at: Option<usize>,
    fail_query_at: Option<usize>,
    fail_navigation: bool,
    fail_cookies: bool,
    pub navigated: RefCell<Vec<String>>,
    pub waited: RefCell<Vec<String>>,
    pub cookies: RefCell<Vec<SessionCookie>>,
}

impl FakePage {
    pub fn new(snapshots: Vec<Vec<FakeNode>>) -> Self {
        Self {
            snapshots,
            ..Self::default()
        }
    }

    /// The `n`th scroll (1-based) fails.
    pub fn failing_scroll_at(mut self, n: usize) -> Self {
        self.fail_scroll_at = Some(n);
        self
    }

    /// The `n`th query (1-based) fails.
    pub fn failing_query_at(mut self, n: usize) -> Self {
        self.fail_query_at = Some(n);
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn failing_cookies(mut self) -> Self {
        self.fail_cookies = true;
        self
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.get()
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl Page for FakePage {
    type Item<'a> = FakeNode;

    fn navigate(&self, url: &str) -> Result<()> {
        if self.fail_navigation {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED"));
        }
        self.navigated.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn wait_for_selector(&self, selector: &str) -> Result<()> {
        self.waited.borrow_mut().push(selector.to_string());
        Ok(())
    }

    fn query_all(&self, _selector: &str) -> Result<Vec<FakeNode>> {
        let n = self.queries.get() + 1;
        self.queries.set(n);
        if self.fail_query_at == Some(n) {
            return Err(anyhow!("target closed"));
        }
        if self.snapshots.is_empty() {
            return Ok(Vec::new());
        }
        let index = self.scrolls.get().saturating_sub(1).min(self.snapshots.len() - 1);
        Ok(self.snapshots[index].clone())
    }

    fn evaluate(&self, script: &str) -> Result<Option<Value>> {
        if script == SCROLL_TO_BOTTOM {
            let n = self.scrolls.get() + 1;
            if self.fail_scroll_at == Some(n) {
                return Err(anyhow!("execution context was destroyed"));
            }
            self.scrolls.set(n);
        }
        Ok(None)
    }
}

impl CookieSink for FakePage {
    fn add_cookies(&self, cookies: Vec<SessionCookie>) -> Result<()> {
        if self.fail_cookies {
            return Err(anyhow!("browser context closed"));
        }
        self.cookies.borrow_mut().extend(cookies);
        Ok(())
    }
}
