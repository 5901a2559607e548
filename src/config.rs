//! Environment configuration. A `.env` file is honoured when present.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::card::FeedSelectors;
use crate::chrome::BrowserConfig;
use crate::crawler::{CrawlConfig, CrawlSettings, DEFAULT_TARGET_URL};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: String,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub crawl: CrawlConfig,
    pub browser: BrowserConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let stable_iterations: u32 = parse_or(&var, "STABLE_ITERATIONS", 3)?;
        if stable_iterations == 0 {
            bail!("STABLE_ITERATIONS must be at least 1");
        }

        let settings = CrawlSettings {
            scroll_delay: Duration::from_millis(parse_or(&var, "SCROLL_DELAY_MS", 3000)?),
            stable_iterations,
            max_iterations: parse_opt(&var, "MAX_ITERATIONS")?,
        };

        let defaults = FeedSelectors::default();
        let selectors = FeedSelectors {
            list_container: var("SELECTOR_LIST").unwrap_or(defaults.list_container),
            card: var("SELECTOR_CARD").unwrap_or(defaults.card),
            title: var("SELECTOR_TITLE").unwrap_or(defaults.title),
            link: var("SELECTOR_LINK").unwrap_or(defaults.link),
            description: var("SELECTOR_DESCRIPTION").unwrap_or(defaults.description),
            published_time: var("SELECTOR_PUBLISHED_TIME").unwrap_or(defaults.published_time),
            stats_fragment: var("SELECTOR_STATS").unwrap_or(defaults.stats_fragment),
        };

        let browser_defaults = BrowserConfig::default();
        let browser = BrowserConfig {
            headless: parse_or(&var, "HEADLESS", browser_defaults.headless)?,
            wait_timeout: Duration::from_secs(parse_or(
                &var,
                "WAIT_TIMEOUT_SECS",
                browser_defaults.wait_timeout.as_secs(),
            )?),
            ..browser_defaults
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 5)?,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            crawl: CrawlConfig {
                target_url: var("TARGET_URL").unwrap_or_else(|| DEFAULT_TARGET_URL.to_string()),
                cookies_file: PathBuf::from(var("COOKIES_FILE").unwrap_or_else(|| "cookies.json".to_string())),
                selectors,
                settings,
            },
            browser,
        })
    }
}

fn parse_opt<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|raw| raw.parse::<T>().with_context(|| format!("invalid {key}: {raw:?}")))
        .transpose()
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(var, key)?.unwrap_or(default))
}
