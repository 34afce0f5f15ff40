use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Sumi-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub delay: DelayConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub incremental: IncrementalConfig,
    #[serde(default)]
    pub resume: ResumeConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    pub output: OutputConfig,
    /// Exclusion rules (literal prefixes, globs, or `re:` regexes)
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// The site to mirror
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Root URL; its directory is the crawl scope
    pub url: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum link depth from the target URL
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of page tasks accepted by the frontier
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Size of the page worker pool
    #[serde(default = "default_workers")]
    pub crawl_workers: usize,

    /// Size of the static resource worker pool
    #[serde(default = "default_workers")]
    pub resource_workers: usize,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_files: default_max_files(),
            crawl_workers: default_workers(),
            resource_workers: default_workers(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Delay applied between network requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum DelayConfig {
    #[default]
    None,
    Fixed { ms: u64 },
    Random {
        #[serde(rename = "min-ms")]
        min_ms: u64,
        #[serde(rename = "max-ms")]
        max_ms: u64,
    },
}

/// What to do with an item once its retries are used up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailureDisposition {
    /// Record the failure and carry on as if the item produced nothing
    #[default]
    Log,
    /// Mark the item processed and drop it silently
    Skip,
    /// Stop the whole crawl
    Abort,
}

/// Retry/backoff parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Upper bound for any single wait, including server-requested ones
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default)]
    pub on_exhausted: FailureDisposition,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
            max_delay_ms: default_max_delay_ms(),
            on_exhausted: FailureDisposition::Log,
        }
    }
}

/// Incremental update settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IncrementalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub force_download: bool,

    /// Whether a missing or unreadable `Last-Modified` means "fetch"
    #[serde(default = "default_true")]
    pub assume_stale_without_timestamp: bool,
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            force_download: false,
            assume_stale_without_timestamp: true,
        }
    }
}

/// Resume (checkpoint) settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResumeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            state_file: default_state_file(),
            save_interval_secs: default_save_interval(),
        }
    }
}

/// JavaScript renderer settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RendererConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_render_timeout")]
    pub timeout_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: default_render_timeout(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory the mirror is written into
    pub directory: PathBuf,
}

fn default_max_depth() -> u32 {
    3
}

fn default_max_files() -> usize {
    500
}

fn default_workers() -> usize {
    4
}

fn default_user_agent() -> String {
    format!("sumi-mirror/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state/sumi-mirror.json")
}

fn default_save_interval() -> u64 {
    300
}

fn default_render_timeout() -> u64 {
    30_000
}
