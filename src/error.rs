use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by errors that wrap a browser capability failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal crawl failures. Any of these aborts the whole crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("failed to read cookie file {}", path.display())]
    SessionLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cookie file {} is not a JSON array of cookie records", path.display())]
    SessionParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to inject {count} cookies into the browsing session")]
    SessionInject {
        count: usize,
        #[source]
        source: BoxError,
    },

    #[error("failed to navigate to {url}")]
    Navigation {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("scroll failed on iteration {iteration}")]
    Scroll {
        iteration: u32,
        #[source]
        source: BoxError,
    },

    #[error("querying `{selector}` failed on iteration {iteration}")]
    Query {
        selector: String,
        iteration: u32,
        #[source]
        source: BoxError,
    },
}

/// Per-card extraction failure. The card is dropped and the crawl goes on.
#[derive(Debug, Error)]
pub enum CardError {
    #[error("anchor `{selector}` not found in card")]
    MissingAnchor { selector: String },

    #[error("anchor `{selector}` has no `{attribute}` attribute")]
    MissingAttribute { selector: String, attribute: String },

    #[error("failed to read `{selector}`")]
    Read {
        selector: String,
        #[source]
        source: BoxError,
    },
}
