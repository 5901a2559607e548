use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use serde_json::Value;

use crate::browser::{CookieSink, ItemHandle, Page, SameSite, SessionCookie};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Chrome is killed after this long without a CDP event.
    pub idle_timeout: Duration,
    /// Upper bound for `wait_for_selector`.
    pub wait_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            idle_timeout: Duration::from_secs(300),
            wait_timeout: Duration::from_secs(30),
        }
    }
}

pub fn launch(config: &BrowserConfig) -> Result<Browser> {
    let mut args = vec![
        OsStr::new("--no-sandbox"),
        OsStr::new("--disable-dev-shm-usage"),
        OsStr::new("--disable-infobars"),
        OsStr::new("--window-position=0,0"),
    ];
    if config.headless {
        args.push(OsStr::new("--headless=new"));
    }

    tracing::info!(headless = config.headless, "launching chrome");
    Browser::new(LaunchOptions {
        // headless mode is selected through --headless=new above
        headless: false,
        window_size: Some(config.window_size),
        idle_browser_timeout: config.idle_timeout,
        args,
        ..Default::default()
    })
}

/// A Chrome tab driven over CDP.
pub struct ChromePage {
    tab: Arc<Tab>,
    wait_timeout: Duration,
}

impl ChromePage {
    pub fn open(browser: &Browser, config: &BrowserConfig) -> Result<Self> {
        let tab = browser.new_tab()?;
        Ok(Self {
            tab,
            wait_timeout: config.wait_timeout,
        })
    }
}

impl Page for ChromePage {
    type Item<'a> = Element<'a>;

    fn navigate(&self, url: &str) -> Result<()> {
        self.tab.navigate_to(url)?.wait_until_navigated()?;
        Ok(())
    }

    fn wait_for_selector(&self, selector: &str) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, self.wait_timeout)?;
        Ok(())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Element<'_>>> {
        match self.tab.find_elements(selector) {
            Ok(elements) => Ok(elements),
            Err(e) if e.is::<NoElementFound>() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn evaluate(&self, script: &str) -> Result<Option<Value>> {
        Ok(self.tab.evaluate(script, false)?.value)
    }
}

impl<'a> ItemHandle for Element<'a> {
    fn query_selector(&self, selector: &str) -> Result<Option<Self>> {
        match self.find_element(selector) {
            Ok(element) => Ok(Some(element)),
            Err(e) if e.is::<NoElementFound>() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self>> {
        match self.find_elements(selector) {
            Ok(elements) => Ok(elements),
            Err(e) if e.is::<NoElementFound>() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn inner_text(&self) -> Result<String> {
        self.get_inner_text()
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.get_attribute_value(name)
    }
}

impl CookieSink for ChromePage {
    fn add_cookies(&self, cookies: Vec<SessionCookie>) -> Result<()> {
        let cookies = cookies.into_iter().map(to_cookie_param).collect();
        self.tab.call_method(Network::SetCookies { cookies })?;
        Ok(())
    }
}

fn to_cookie_param(cookie: SessionCookie) -> Network::CookieParam {
    let same_site = match cookie.same_site {
        SameSite::Strict => Some(Network::CookieSameSite::Strict),
        SameSite::Lax => Some(Network::CookieSameSite::Lax),
        SameSite::None => Some(Network::CookieSameSite::None),
        SameSite::Unspecified => None,
    };

    Network::CookieParam {
        name: cookie.name,
        value: cookie.value,
        url: None,
        domain: Some(cookie.domain).filter(|d| !d.is_empty()),
        path: Some(cookie.path).filter(|p| !p.is_empty()),
        secure: Some(cookie.secure),
        http_only: Some(cookie.http_only),
        same_site,
        expires: cookie.expires,
        priority: None,
        same_party: None,
        source_scheme: None,
        source_port: None,
        partition_key: None,
    }
}
