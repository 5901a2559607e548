//! Session bootstrap from an exported cookie file.
//!
//! The file is the JSON array written by the usual browser cookie export
//! extensions:
//!
//! ```json
//! [{"domain": ".zhihu.com", "expirationDate": 1767225600.5, "name": "z_c0",
//!   "path": "/", "sameSite": "Lax", "httpOnly": true, "secure": true, "value": "..."}]
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::Span;

use crate::browser::{CookieSink, SameSite, SessionCookie};
use crate::error::CrawlError;

/// One record of the cookie file, as stored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CookieRecord {
    pub domain: String,
    pub expiration_date: Option<f64>,
    pub name: String,
    pub path: String,
    pub same_site: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    pub value: String,
}

impl CookieRecord {
    /// Never fails: an unknown `sameSite` degrades to `Unspecified`.
    pub fn to_session_cookie(&self) -> SessionCookie {
        SessionCookie {
            name: self.name.clone(),
            value: self.value.clone(),
            domain: self.domain.clone(),
            path: self.path.clone(),
            expires: self.expiration_date.filter(|&e| e != 0.0),
            http_only: self.http_only,
            secure: self.secure,
            same_site: parse_same_site(self.same_site.as_deref().unwrap_or_default()),
        }
    }
}

/// Case-insensitive. Besides `Strict`, `Lax` and `None` it also accepts the
/// `no_restriction` spelling that browser cookie exports write for `None`.
/// Anything else is `Unspecified`.
pub fn parse_same_site(value: &str) -> SameSite {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "lax" => SameSite::Lax,
        "none" | "no_restriction" => SameSite::None,
        _ => SameSite::Unspecified,
    }
}

pub fn load_cookie_records(path: &Path) -> Result<Vec<CookieRecord>, CrawlError> {
    let content = std::fs::read(path).map_err(|source| CrawlError::SessionLoad {
        path: path.to_path_buf(),
        source,
    })?;

    // Decoding happens in serde_json so invalid UTF-8 is a content error too.
    serde_json::from_slice(&content).map_err(|source| CrawlError::SessionParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the cookie file and injects every cookie in one batch. Must run
/// before the first navigation. Logs under `span`.
pub fn bootstrap_session<S: CookieSink + ?Sized>(sink: &S, path: &Path, span: &Span) -> Result<usize, CrawlError> {
    let _entered = span.enter();
    tracing::info!(path = %path.display(), "🍪 loading cookies");

    let records = load_cookie_records(path)?;
    let cookies: Vec<SessionCookie> = records.iter().map(CookieRecord::to_session_cookie).collect();
    let count = cookies.len();

    sink.add_cookies(cookies)
        .map_err(|e| CrawlError::SessionInject { count, source: e.into() })?;

    tracing::info!(count, "🍪 cookies injected");
    Ok(count)
}
