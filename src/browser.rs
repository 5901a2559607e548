//! Browser capability consumed by the crawler.
//!
//! The crawl engine never talks to Chrome directly. It drives a [`Page`],
//! reads fields through [`ItemHandle`]s and injects the session through a
//! [`CookieSink`]. `crate::chrome` backs these with `headless_chrome`,
//! `crate::snapshot` with saved HTML.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

/// Script used to trigger lazy loading of the next page of the feed.
pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// One rendered DOM node the crawler can look inside.
pub trait ItemHandle: Sized {
    /// First descendant matching `selector`, `None` when there is none.
    fn query_selector(&self, selector: &str) -> Result<Option<Self>>;

    /// Every descendant matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self>>;

    fn inner_text(&self) -> Result<String>;

    fn attribute(&self, name: &str) -> Result<Option<String>>;
}

/// A navigable page. Every call is a blocking round trip.
pub trait Page {
    type Item<'a>: ItemHandle
    where
        Self: 'a;

    fn navigate(&self, url: &str) -> Result<()>;

    fn wait_for_selector(&self, selector: &str) -> Result<()>;

    /// Everything currently rendered that matches `selector`. Not incremental.
    fn query_all(&self, selector: &str) -> Result<Vec<Self::Item<'_>>>;

    fn evaluate(&self, script: &str) -> Result<Option<Value>>;
}

/// Cookie `SameSite` policy. `Unspecified` leaves the browser default in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
    #[default]
    Unspecified,
}

/// A cookie ready for injection into a browsing session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix seconds. `None` makes it a session cookie.
    pub expires: Option<f64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

pub trait CookieSink {
    /// Adds all cookies in a single batch.
    fn add_cookies(&self, cookies: Vec<SessionCookie>) -> Result<()>;
}
