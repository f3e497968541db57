use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CACHE_CAPACITY: usize = 500;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;
const DEFAULT_CONCURRENCY: usize = 20;
const MAX_CONCURRENCY: usize = 100;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

pub const PARALLEL_CONCURRENCY_ENV: &str = "PARALLEL_CONCURRENCY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Max spreadsheets whose sheet lists are cached (LRU beyond this).
    pub cache_capacity: usize,
    /// Metadata cache TTL; a read within the window resets the clock.
    pub cache_ttl_secs: u64,
    pub fuzzy_matching: bool,
    pub fuzzy_threshold: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            fuzzy_matching: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl ResolverConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Concurrently-pending task ceiling, clamped to [1, 100].
    pub concurrency: usize,
    pub retry_on_error: bool,
    /// Extra attempts after the first, per task.
    pub max_retries: u32,
    /// Base backoff delay; doubled on each subsequent retry.
    pub retry_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry_on_error: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl ExecutorConfig {
    /// Defaults with the `PARALLEL_CONCURRENCY` environment override applied.
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = env_concurrency() {
            config.concurrency = value;
        }
        config.clamped()
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn clamped(mut self) -> Self {
        self.concurrency = self.concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }
}

/// Combined configuration for embedders that load both components from one
/// file. Omitted fields keep their defaults; the concurrency env override is
/// applied last.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct KitConfig {
    pub resolver: ResolverConfig,
    pub executor: ExecutorConfig,
}

impl KitConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let partial = load_config_file(path)?;
        Ok(Self::from_partial(partial))
    }

    fn from_partial(partial: PartialConfig) -> Self {
        let defaults = Self::default();
        let mut resolver = ResolverConfig {
            cache_capacity: partial
                .cache_capacity
                .unwrap_or(defaults.resolver.cache_capacity),
            cache_ttl_secs: partial
                .cache_ttl_secs
                .unwrap_or(defaults.resolver.cache_ttl_secs),
            fuzzy_matching: partial
                .fuzzy_matching
                .unwrap_or(defaults.resolver.fuzzy_matching),
            fuzzy_threshold: partial
                .fuzzy_threshold
                .unwrap_or(defaults.resolver.fuzzy_threshold),
        };
        resolver.cache_capacity = resolver.cache_capacity.max(1);
        resolver.fuzzy_threshold = resolver.fuzzy_threshold.clamp(0.0, 1.0);

        let executor = ExecutorConfig {
            concurrency: env_concurrency()
                .or(partial.concurrency)
                .unwrap_or(defaults.executor.concurrency),
            retry_on_error: partial
                .retry_on_error
                .unwrap_or(defaults.executor.retry_on_error),
            max_retries: partial.max_retries.unwrap_or(defaults.executor.max_retries),
            retry_delay_ms: partial
                .retry_delay_ms
                .unwrap_or(defaults.executor.retry_delay_ms),
        }
        .clamped();

        Self { resolver, executor }
    }
}

fn env_concurrency() -> Option<usize> {
    let raw = std::env::var(PARALLEL_CONCURRENCY_ENV).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(
                value = raw.as_str(),
                "ignoring unparseable {PARALLEL_CONCURRENCY_ENV}"
            );
            None
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    cache_capacity: Option<usize>,
    cache_ttl_secs: Option<u64>,
    fuzzy_matching: Option<bool>,
    fuzzy_threshold: Option<f64>,
    concurrency: Option<usize>,
    retry_on_error: Option<bool>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
