use serde::Deserialize;
use std::time::Duration;

/// Largest accepted worker pool
pub const MAX_POOL_SIZE: usize = 1024;

/// Main configuration structure for Pagesweep
///
/// Every section is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// The paginated resource
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// URL with a `{start}` placeholder substituted by the page offset
    #[serde(rename = "url-template")]
    pub url_template: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url_template: "https://web.bankin.com/challenge/index.html?start={start}".to_string(),
        }
    }
}

/// Offset range walked by the sequencer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// First offset to fetch
    #[serde(rename = "start-min")]
    pub start_min: u64,

    /// Records per full page, also the increment between offsets
    pub step: u64,

    /// Watchdog bound (inclusive): no offset above it is ever reserved
    #[serde(rename = "start-max")]
    pub start_max: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            start_min: 0,
            step: 50,
            start_max: 100_100,
        }
    }
}

/// Per-page fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Total load attempts per offset before the crawl fails
    #[serde(rename = "retry-budget")]
    pub retry_budget: u32,

    /// Maximum time for a page load (milliseconds)
    #[serde(rename = "load-timeout-ms")]
    pub load_timeout_ms: u64,

    /// Maximum time for the reveal interaction and content wait (milliseconds)
    #[serde(rename = "interaction-timeout-ms")]
    pub interaction_timeout_ms: u64,

    /// Markers that signal the table content has rendered
    #[serde(rename = "content-selector")]
    pub content_selector: String,

    /// Control that reveals or regenerates the table
    #[serde(rename = "reload-selector")]
    pub reload_selector: String,

    /// Extra reloads attempted before accepting a short page
    #[serde(rename = "short-page-confirmations")]
    pub short_page_confirmations: u32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            retry_budget: 3,
            load_timeout_ms: 10_123,
            interaction_timeout_ms: 30_123,
            content_selector: "tr, iframe".to_string(),
            reload_selector: "#btnGenerate".to_string(),
            short_page_confirmations: 0,
        }
    }
}

impl PageConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn interaction_timeout(&self) -> Duration {
        Duration::from_millis(self.interaction_timeout_ms)
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Explicit number of fetch slots; overrides `per-core`
    pub size: Option<usize>,

    /// Slots per available hardware thread
    #[serde(rename = "per-core")]
    pub per_core: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: None,
            per_core: 8,
        }
    }
}

impl PoolConfig {
    /// Resolves the number of fetch slots
    ///
    /// An explicit `size` wins; otherwise the pool is `per-core` times the
    /// available parallelism (1 if that cannot be determined), capped at
    /// [`MAX_POOL_SIZE`].
    pub fn resolved_size(&self) -> usize {
        self.size.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            cores.saturating_mul(self.per_core).min(MAX_POOL_SIZE)
        })
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value: `Name/Version`
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}
