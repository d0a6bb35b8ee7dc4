//! HTTP rendering context
//!
//! This module renders pages without a script engine:
//! - Loading a page is a GET with a per-request timeout
//! - Interactions follow the target of the matched control, or reload the page
//! - Waiting for content re-polls the page until the markers appear
//! - Frames are fetched on demand and exposed as extra content surfaces

use crate::config::UserAgentConfig;
use crate::render::{RenderContext, RenderError, Surface};
use crate::url::resolve_link;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Delay between two polls while waiting for content markers
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How deep nested frames are followed
const MAX_FRAME_DEPTH: usize = 3;

/// Attributes that carry the target of a reveal control
const TARGET_ATTRIBUTES: &[&str] = &["href", "formaction", "data-href"];

/// Builds the HTTP client shared by every rendering context
///
/// # Example
///
/// ```no_run
/// use pagesweep::config::UserAgentConfig;
/// use pagesweep::render::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// A loaded page
#[derive(Debug, Clone)]
struct LoadedDocument {
    url: Url,
    html: String,
}

/// A surface waiting in the frame walk
#[derive(Debug)]
enum PendingSurface {
    Loaded(LoadedDocument, usize),
    Frame(Url, usize),
}

/// Breadth-first walk over a page and its frames
#[derive(Debug)]
struct SurfaceWalk {
    queue: VecDeque<PendingSurface>,
    visited: HashSet<String>,
}

impl SurfaceWalk {
    fn new(root: LoadedDocument) -> Self {
        let mut visited = HashSet::new();
        visited.insert(root.url.to_string());

        Self {
            queue: VecDeque::from([PendingSurface::Loaded(root, 0)]),
            visited,
        }
    }

    /// Queues the frames of a yielded document, skipping ones already seen
    fn enqueue_frames(&mut self, doc: &LoadedDocument, depth: usize) {
        if depth >= MAX_FRAME_DEPTH {
            return;
        }

        for frame_url in frame_sources(&doc.html, &doc.url) {
            if self.visited.insert(frame_url.to_string()) {
                self.queue
                    .push_back(PendingSurface::Frame(frame_url, depth + 1));
            }
        }
    }
}

/// Rendering context backed by plain HTTP requests
///
/// Cloning the underlying [`Client`] is cheap, so every worker slot gets its
/// own renderer over a shared connection pool.
pub struct HttpRenderer {
    client: Client,
    request_timeout: Duration,
    poll_interval: Duration,
    current: Option<LoadedDocument>,
    walk: Option<SurfaceWalk>,
}

impl HttpRenderer {
    /// Creates a renderer
    ///
    /// `request_timeout` bounds the secondary requests (interactions, frames).
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            current: None,
            walk: None,
        }
    }

    /// Overrides the delay between content polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Replaces the loaded page; any surface walk over the old one is dropped
    fn set_current(&mut self, doc: Option<LoadedDocument>) {
        self.current = doc;
        self.walk = None;
    }

    async fn get(&self, url: &Url, timeout: Duration) -> Result<LoadedDocument, RenderError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| classify_error(url, timeout, e))?;

        Ok(LoadedDocument {
            url: final_url,
            html,
        })
    }
}

#[async_trait]
impl RenderContext for HttpRenderer {
    async fn load(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError> {
        let url = Url::parse(url).map_err(|_| RenderError::InvalidUrl(url.to_string()))?;

        // A failed navigation leaves nothing usable behind
        self.set_current(None);

        let loaded = self.get(&url, timeout).await?;
        tracing::trace!("Loaded {} ({} bytes)", loaded.url, loaded.html.len());
        self.set_current(Some(loaded));
        Ok(())
    }

    async fn interact(&mut self, selector: &str) -> Result<(), RenderError> {
        let doc = self.current.as_ref().ok_or(RenderError::NotLoaded)?;
        let target = interaction_target(&doc.html, selector, &doc.url)?;

        tracing::trace!("Interaction '{}' navigates to {}", selector, target);
        let loaded = self.get(&target, self.request_timeout).await?;
        self.set_current(Some(loaded));
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError> {
        parse_selector(selector)?;
        let deadline = Instant::now() + timeout;

        loop {
            let doc = self.current.as_ref().ok_or(RenderError::NotLoaded)?;
            if document_matches(&doc.html, selector) {
                return Ok(());
            }

            let url = doc.url.clone();
            let now = Instant::now();
            if now >= deadline {
                return Err(RenderError::timeout(url.as_str(), timeout));
            }

            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                continue;
            }

            match self.get(&url, remaining).await {
                Ok(loaded) => self.set_current(Some(loaded)),
                Err(e) => tracing::trace!("Poll of {} failed: {}", url, e),
            }
        }
    }

    fn rewind_surfaces(&mut self) {
        self.walk = None;
    }

    async fn next_surface(&mut self) -> Option<Surface> {
        if self.walk.is_none() {
            let root = self.current.clone()?;
            self.walk = Some(SurfaceWalk::new(root));
        }

        loop {
            let pending = self.walk.as_mut()?.queue.pop_front()?;

            let (doc, depth) = match pending {
                PendingSurface::Loaded(doc, depth) => (doc, depth),
                PendingSurface::Frame(frame_url, depth) => {
                    match self.get(&frame_url, self.request_timeout).await {
                        Ok(loaded) => (loaded, depth),
                        Err(e) => {
                            tracing::debug!("Skipping frame {}: {}", frame_url, e);
                            continue;
                        }
                    }
                }
            };

            if let Some(walk) = self.walk.as_mut() {
                walk.enqueue_frames(&doc, depth);
            }

            return Some(Surface::new(doc.url.to_string(), doc.html));
        }
    }
}

fn classify_error(url: &Url, timeout: Duration, error: reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::timeout(url.as_str(), timeout)
    } else {
        RenderError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, RenderError> {
    Selector::parse(selector).map_err(|_| RenderError::InvalidSelector(selector.to_string()))
}

fn document_matches(html: &str, selector: &str) -> bool {
    match Selector::parse(selector) {
        Ok(parsed) => Html::parse_document(html).select(&parsed).next().is_some(),
        Err(_) => false,
    }
}

/// Finds where triggering the first control matching `selector` leads
///
/// Controls without a target attribute regenerate the current page.
fn interaction_target(html: &str, selector: &str, base_url: &Url) -> Result<Url, RenderError> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);

    let control = document
        .select(&parsed)
        .next()
        .ok_or_else(|| RenderError::SelectorNotFound {
            selector: selector.to_string(),
        })?;

    let target = TARGET_ATTRIBUTES
        .iter()
        .filter_map(|attr| control.value().attr(attr))
        .find_map(|href| resolve_link(href, base_url));

    Ok(target.unwrap_or_else(|| base_url.clone()))
}

/// Lists the resolved `src` of every frame in document order
fn frame_sources(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    let Ok(frame_selector) = Selector::parse("iframe[src], frame[src]") else {
        return Vec::new();
    };

    document
        .select(&frame_selector)
        .filter_map(|frame| frame.value().attr("src"))
        .filter_map(|src| resolve_link(src, base_url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn renderer() -> HttpRenderer {
        let client = build_http_client(&UserAgentConfig::default()).unwrap();
        HttpRenderer::new(client, Duration::from_secs(2)).with_poll_interval(Duration::from_millis(20))
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_string(format!("<html><body>{}</body></html>", body))
            .insert_header("content-type", "text/html")
    }

    #[test]
    fn test_interaction_target_prefers_href() {
        let base = Url::parse("https://example.com/index.html?start=0").unwrap();
        let target = interaction_target(
            r#"<a id="btnGenerate" href="/regen?start=0">Reload</a>"#,
            "#btnGenerate",
            &base,
        )
        .unwrap();
        assert_eq!(target.as_str(), "https://example.com/regen?start=0");
    }

    #[test]
    fn test_interaction_target_defaults_to_reload() {
        let base = Url::parse("https://example.com/index.html?start=0").unwrap();
        let target =
            interaction_target(r#"<button id="btnGenerate">Reload</button>"#, "#btnGenerate", &base)
                .unwrap();
        assert_eq!(target, base);
    }

    #[test]
    fn test_interaction_target_missing_control() {
        let base = Url::parse("https://example.com/").unwrap();
        let result = interaction_target("<p>nothing</p>", "#btnGenerate", &base);
        assert!(matches!(result, Err(RenderError::SelectorNotFound { .. })));
    }

    #[test]
    fn test_frame_sources_in_document_order() {
        let base = Url::parse("https://example.com/challenge/index.html").unwrap();
        let frames = frame_sources(
            r#"<iframe src="a.html"></iframe><p></p><iframe src="/b.html"></iframe><iframe></iframe>"#,
            &base,
        );
        let frames: Vec<String> = frames.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            frames,
            vec![
                "https://example.com/challenge/a.html",
                "https://example.com/b.html"
            ]
        );
    }

    #[tokio::test]
    async fn test_load_success_and_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(html("<table><tr><td>a</td></tr></table>"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let mut renderer = renderer();

        renderer
            .load(&format!("{}/ok", mock_server.uri()), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(renderer.current.is_some());

        let result = renderer
            .load(&format!("{}/broken", mock_server.uri()), Duration::from_secs(2))
            .await;
        assert!(matches!(result, Err(RenderError::Status { status: 503, .. })));
        assert!(renderer.current.is_none());
    }

    #[tokio::test]
    async fn test_load_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(html("late").set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let mut renderer = renderer();
        let result = renderer
            .load(&mock_server.uri(), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(RenderError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_operations_require_loaded_page() {
        let mut renderer = renderer();

        assert!(matches!(
            renderer.interact("#btnGenerate").await,
            Err(RenderError::NotLoaded)
        ));
        assert!(matches!(
            renderer.wait_for("tr", Duration::from_millis(10)).await,
            Err(RenderError::NotLoaded)
        ));
        assert!(renderer.candidate_surfaces().await.is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_present_marker() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(html("<table><tr><td>x</td></tr></table>"))
            .mount(&mock_server)
            .await;

        let mut renderer = renderer();
        renderer
            .load(&mock_server.uri(), Duration::from_secs(2))
            .await
            .unwrap();

        assert!(renderer
            .wait_for("tr, iframe", Duration::from_millis(100))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_times_out_without_marker() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(html("<p>Loading...</p>"))
            .mount(&mock_server)
            .await;

        let mut renderer = renderer();
        renderer
            .load(&mock_server.uri(), Duration::from_secs(2))
            .await
            .unwrap();

        let result = renderer.wait_for("tr", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(RenderError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_interact_follows_control() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(html(r#"<a id="btnGenerate" href="/generated">Reload</a>"#))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/generated"))
            .respond_with(html("<table><tr><td>x</td></tr></table>"))
            .mount(&mock_server)
            .await;

        let mut renderer = renderer();
        renderer
            .load(
                &format!("{}/index.html", mock_server.uri()),
                Duration::from_secs(2),
            )
            .await
            .unwrap();

        renderer.interact("#btnGenerate").await.unwrap();
        assert_eq!(renderer.current.as_ref().unwrap().url.path(), "/generated");
    }

    #[tokio::test]
    async fn test_candidate_surfaces_include_frames() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/index.html"))
            .and(query_param("start", "0"))
            .respond_with(html(
                r#"<iframe src="/frame.html"></iframe><iframe src="/missing.html"></iframe>"#,
            ))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/frame.html"))
            .respond_with(html("<table><tr><td>a</td><td>b</td><td>1€</td></tr></table>"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/missing.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let mut renderer = renderer();
        renderer
            .load(
                &format!("{}/index.html?start=0", mock_server.uri()),
                Duration::from_secs(2),
            )
            .await
            .unwrap();

        let surfaces = renderer.candidate_surfaces().await;
        assert_eq!(surfaces.len(), 2);
        assert!(surfaces[0].source.ends_with("/index.html?start=0"));
        assert!(surfaces[1].source.ends_with("/frame.html"));
        assert_eq!(surfaces[1].extract_cells(), vec!["a", "b", "1€"]);
    }

    #[tokio::test]
    async fn test_frames_fetched_only_when_reached() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(html(
                r#"<iframe src="/frame.html"></iframe>
                <table><tr><td>a</td><td>b</td><td>1€</td></tr></table>"#,
            ))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/frame.html"))
            .respond_with(html("<p>frame</p>"))
            .mount(&mock_server)
            .await;

        let frame_requests = |requests: Vec<wiremock::Request>| {
            requests
                .iter()
                .filter(|request| request.url.path() == "/frame.html")
                .count()
        };

        let mut renderer = renderer();
        renderer
            .load(
                &format!("{}/index.html", mock_server.uri()),
                Duration::from_secs(2),
            )
            .await
            .unwrap();

        renderer.rewind_surfaces();
        let main = renderer.next_surface().await.unwrap();
        assert!(main.source.ends_with("/index.html"));

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(frame_requests(requests), 0);

        let frame = renderer.next_surface().await.unwrap();
        assert!(frame.source.ends_with("/frame.html"));
        assert!(renderer.next_surface().await.is_none());

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(frame_requests(requests), 1);

        // Rewinding starts over from the loaded page
        renderer.rewind_surfaces();
        let again = renderer.next_surface().await.unwrap();
        assert_eq!(again.source, main.source);
    }
}
