use std::time::Duration;

// region:        --- Constants

pub const COLLINFO_URL: &str = "https://index.commoncrawl.org/collinfo.json";

// timeouts
pub const HTTP_REQUEST_TIMEOUT_MS: u64 = 30000;

// concurrency numbers
pub const COLLECTIONS_QUERY_CONCURRENCY: usize = 4;

// endregion:     --- Constants

#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint listing the crawl collections.
    pub collinfo_url: String,
    /// Query only the first `n` collections, all of them when `None`.
    pub limit: Option<usize>,
    /// Collections queried at the same time.
    pub concurrency: usize,
    /// Upper bound of each HTTP request, body included.
    pub request_timeout: Duration,
    /// Skip index lines not mentioning the domain before parsing them.
    pub prefilter: bool,
    /// Deadline of the whole run.
    pub max_time: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collinfo_url: COLLINFO_URL.to_string(),
            limit: None,
            concurrency: COLLECTIONS_QUERY_CONCURRENCY,
            request_timeout: Duration::from_millis(HTTP_REQUEST_TIMEOUT_MS),
            prefilter: false,
            max_time: None,
        }
    }
}
