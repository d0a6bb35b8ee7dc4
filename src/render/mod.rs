//! Rendering engine seam
//!
//! The page fetcher never talks to the network directly. It drives a
//! [`RenderContext`]: one long-lived execution context per worker slot that is
//! rebound to a new page on every load. [`HttpRenderer`] is the bundled
//! implementation; tests script their own.

mod http;

pub use http::{build_http_client, HttpRenderer, DEFAULT_POLL_INTERVAL};

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a rendering context
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Timed out after {timeout_ms}ms waiting for {url}")]
    Timeout { url: String, timeout_ms: u128 },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("No element matches selector '{selector}'")]
    SelectorNotFound { selector: String },

    #[error("Invalid CSS selector '{0}'")]
    InvalidSelector(String),

    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("No page is loaded in this context")]
    NotLoaded,
}

impl RenderError {
    /// Builds a timeout error for `url`
    pub fn timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout_ms: timeout.as_millis(),
        }
    }
}

/// One execution context of the rendering engine
///
/// A context holds at most one loaded page. `load` replaces it; the other
/// operations act on whatever is currently loaded.
#[async_trait]
pub trait RenderContext: Send {
    /// Navigates to `url`, failing if it does not load within `timeout`
    async fn load(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Triggers the control matching `selector` (a reload or expand button)
    async fn interact(&mut self, selector: &str) -> Result<(), RenderError>;

    /// Waits until the loaded page contains an element matching `selector`
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Restarts the walk over the content surfaces of the loaded page
    fn rewind_surfaces(&mut self);

    /// Returns the next content surface of the loaded page: the page itself
    /// first, then its embedded frames in document order
    ///
    /// Surfaces are produced on demand; a caller that stops early never pays
    /// for the remaining ones. Loading or interacting restarts the walk.
    async fn next_surface(&mut self) -> Option<Surface>;

    /// Lists every content surface of the loaded page
    async fn candidate_surfaces(&mut self) -> Vec<Surface> {
        self.rewind_surfaces();

        let mut surfaces = Vec::new();
        while let Some(surface) = self.next_surface().await {
            surfaces.push(surface);
        }
        surfaces
    }
}

/// A rendered content region (a page or one of its frames)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    /// Where the surface was loaded from
    pub source: String,

    /// Rendered markup
    pub html: String,
}

impl Surface {
    pub fn new(source: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            html: html.into(),
        }
    }

    /// Returns the raw text content of every table cell, in document order
    pub fn extract_cells(&self) -> Vec<String> {
        let document = Html::parse_document(&self.html);

        match Selector::parse("td") {
            Ok(cell_selector) => document
                .select(&cell_selector)
                .map(|cell| cell.text().collect::<String>())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
