use serde::Deserialize;

/// Main configuration structure for Shelf-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub refill: RefillConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub test: TestConfig,
    pub output: OutputConfig,
    pub store: StoresConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

impl Config {
    /// Resolves every queue and marker key for this source
    pub fn queue_keys(&self) -> QueueKeys {
        let name = &self.source.name;
        QueueKeys {
            master: self
                .source
                .master_queue
                .clone()
                .unwrap_or_else(|| format!("{}_sitemap_urls_master", name)),
            working: self
                .source
                .working_queue
                .clone()
                .unwrap_or_else(|| format!("{}_urls_temp", name)),
            state: self
                .source
                .state_key
                .clone()
                .unwrap_or_else(|| format!("{}_scraping_state", name)),
            proxies: self
                .proxy
                .key
                .clone()
                .unwrap_or_else(|| format!("{}_proxies", name)),
            test: self
                .test
                .queue
                .clone()
                .unwrap_or_else(|| format!("{}_test_set", name)),
        }
    }

    /// Whether records bypass validation and durable writes
    pub fn is_test_mode(&self) -> bool {
        self.test.enabled
    }
}

/// Fully resolved store keys for one harvesting source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    /// Remote master set holding every known URL
    pub master: String,
    /// Local working set drained by the workers
    pub working: String,
    /// Local value holding the last refill date
    pub state: String,
    /// Local set of outbound proxy addresses
    pub proxies: String,
    /// Local set seeded with test URLs in test mode
    pub test: String,
}

/// Harvesting source identification
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Short source name used in queue keys and object key prefixes
    pub name: String,

    /// Value written to the `retailer` field of every record
    pub retailer: String,

    #[serde(rename = "master-queue")]
    pub master_queue: Option<String>,

    #[serde(rename = "working-queue")]
    pub working_queue: Option<String>,

    #[serde(rename = "state-key")]
    pub state_key: Option<String>,
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent workers
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Number of URLs popped from the working queue per batch
    #[serde(rename = "urls-per-batch", default = "default_urls_per_batch")]
    pub urls_per_batch: u32,

    /// Number of records buffered before a flush
    #[serde(rename = "bulk-size", default = "default_bulk_size")]
    pub bulk_size: u32,

    /// Upper bound for a single page fetch (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            urls_per_batch: default_urls_per_batch(),
            bulk_size: default_bulk_size(),
            fetch_timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Master → working queue refill configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RefillConfig {
    /// Number of members requested per scan page of the master queue
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: u32,
}

impl Default for RefillConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Local set holding proxy addresses (defaults to `<source>_proxies`)
    pub key: Option<String>,
}

/// Test-mode configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TestConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Proxy used for every fetch in test mode
    pub proxy: Option<String>,

    /// URLs seeded into the test queue before the workers start
    #[serde(default)]
    pub urls: Vec<String>,

    /// Queue drained when test URLs are given (defaults to `<source>_test_set`)
    pub queue: Option<String>,

    /// Maximum number of URLs each worker processes in test mode
    #[serde(rename = "sample-size", default = "default_sample_size")]
    pub sample_size: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            proxy: None,
            urls: Vec::new(),
            queue: None,
            sample_size: default_sample_size(),
        }
    }
}

/// Batch output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory that receives flushed batch objects
    pub bucket: String,
}

/// Local and remote queue store connections
#[derive(Debug, Clone, Deserialize)]
pub struct StoresConfig {
    /// Store holding the working queue, the refill marker and proxies
    pub local: StoreConfig,

    /// Store holding the master queue
    pub remote: StoreConfig,
}

/// Connection parameters for one set store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum StoreConfig {
    /// SQLite database file
    Sqlite { path: String },

    /// Redis server, e.g. `redis://:password@host:6379/0`
    Redis { url: String },

    /// Process-local store; contents vanish on exit
    Memory,
}

/// A CSS selector and the attribute to read (text content when absent)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldRule {
    pub selector: String,
    pub attr: Option<String>,
}

impl FieldRule {
    pub fn text(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attr: None,
        }
    }

    pub fn attr(selector: &str, attr: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attr: Some(attr.to_string()),
        }
    }
}

/// Field extraction rules for product pages
///
/// Defaults match the O'Reilly Auto product page layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub price: FieldRule,
    pub title: FieldRule,
    pub brand: FieldRule,
    pub mpn: FieldRule,
    pub upc: FieldRule,
    pub image: FieldRule,
    pub rating: FieldRule,
    #[serde(rename = "review-count")]
    pub review_count: FieldRule,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            price: FieldRule::text("strong.pricing_price"),
            title: FieldRule::text("h1.js-ga-product-name"),
            brand: FieldRule::attr("img.pdp-brand", "alt"),
            mpn: FieldRule::text("dd.js-ga-product-line-number"),
            upc: FieldRule::text(r#"span[itemprop="sku"]"#),
            image: FieldRule::attr("img.main-image", "src"),
            rating: FieldRule::text(r#"div[itemprop="ratingValue"]"#),
            review_count: FieldRule::attr(r#"meta[itemprop="reviewCount"]"#, "content"),
        }
    }
}

fn default_concurrency() -> u32 {
    5
}

fn default_urls_per_batch() -> u32 {
    100
}

fn default_bulk_size() -> u32 {
    100
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}

fn default_chunk_size() -> u32 {
    500
}

fn default_sample_size() -> u32 {
    1
}
