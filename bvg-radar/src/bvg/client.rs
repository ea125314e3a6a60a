//! BVG HTTP client.
//!
//! Issues GET requests against `/stops` and `/radar` while honouring the
//! API's caching headers and its rate limit (100 requests per minute).
//!
//! Outcome of [`BvgClient::call`]:
//! - `Ok(Some(body))` on a 200, or on a cache hit (fresh, or revalidated by 304)
//! - `Ok(None)` when upstream answered with an error status, or kept
//!   answering 429 until the retries ran out
//! - `Err(_)` for transport faults and undecodable bodies

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{CACHE_CONTROL, ETAG, HeaderMap, IF_NONE_MATCH};
use serde_json::Value;
use tracing::{error, info, warn};

use super::cache::{CacheEntry, ResponseCache, ResponseCacheConfig};
use super::cache_control::parse_max_age;
use super::error::BvgError;

/// Default base URL for the BVG REST API.
pub const DEFAULT_BASE_URL: &str = "https://v6.bvg.transport.rest";

/// Default number of attempts per call.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause after a 429.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Configuration for the BVG client.
#[derive(Debug, Clone)]
pub struct BvgConfig {
    /// Base URL for the API (defaults to the public v6 endpoint)
    pub base_url: String,
    /// Attempts per call when rate limited (at least 1)
    pub max_retries: u32,
    /// Fixed wait between rate-limited attempts
    pub retry_delay: Duration,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Response cache bounds
    pub cache: ResponseCacheConfig,
}

impl BvgConfig {
    /// Create a config with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the number of attempts per call.
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the wait between rate-limited attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the maximum number of cached URLs.
    pub fn with_cache_capacity(mut self, n: u64) -> Self {
        self.cache.max_capacity = n;
        self
    }

    /// Set how long an untouched cache entry survives.
    pub fn with_cache_idle_ttl(mut self, ttl: Duration) -> Self {
        self.cache.idle_ttl = ttl;
        self
    }
}

impl Default for BvgConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout_secs: 30,
            cache: ResponseCacheConfig::default(),
        }
    }
}

/// Parameters for `/stops`.
#[derive(Debug, Clone, PartialEq)]
pub struct StopsQuery {
    /// Stop name or part of one; `None` lists all stops
    pub query: Option<String>,
    /// Allow imperfect matches (only sent with a query)
    pub fuzzy: bool,
    /// Maximum number of results (the API's own default is 5)
    pub max_results: u32,
}

impl StopsQuery {
    /// Every stop, up to the default result limit.
    pub fn all() -> Self {
        Self::default()
    }

    /// Stops whose name matches `query`.
    pub fn matching(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn with_max_results(mut self, n: u32) -> Self {
        self.max_results = n;
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("results", self.max_results.to_string())];
        if let Some(query) = &self.query {
            params.push(("query", query.clone()));
            params.push(("completion", true.to_string()));
            params.push(("fuzzy", self.fuzzy.to_string()));
        }
        params
    }
}

impl Default for StopsQuery {
    fn default() -> Self {
        Self {
            query: None,
            fuzzy: true,
            max_results: 10_000,
        }
    }
}

/// A latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(north: f64, west: f64, south: f64, east: f64) -> Self {
        Self {
            north,
            west,
            south,
            east,
        }
    }
}

/// Parameters for `/radar`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarQuery {
    pub bbox: BoundingBox,
    /// Maximum number of vehicles
    pub max_vehicles: u32,
    /// Compute frames for the next n seconds
    pub seconds_between_frames: u32,
    /// Number of frames to compute
    pub frames: u32,
    /// Fetch a geographic shape for each vehicle's movement
    pub polylines: bool,
    /// Language of the results
    pub language: String,
    /// Ask upstream to pretty-print its JSON
    pub pretty: bool,
}

impl RadarQuery {
    /// Query the given area with default options.
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            max_vehicles: 256,
            seconds_between_frames: 30,
            frames: 1,
            polylines: false,
            language: "en".to_string(),
            pretty: false,
        }
    }

    pub fn with_max_vehicles(mut self, n: u32) -> Self {
        self.max_vehicles = n;
        self
    }

    pub fn with_frames(mut self, frames: u32, seconds_between: u32) -> Self {
        self.frames = frames;
        self.seconds_between_frames = seconds_between;
        self
    }

    pub fn with_polylines(mut self, polylines: bool) -> Self {
        self.polylines = polylines;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("north", self.bbox.north.to_string()),
            ("west", self.bbox.west.to_string()),
            ("south", self.bbox.south.to_string()),
            ("east", self.bbox.east.to_string()),
            ("results", self.max_vehicles.to_string()),
            ("duration", self.seconds_between_frames.to_string()),
            ("frames", self.frames.to_string()),
            ("polylines", self.polylines.to_string()),
            ("language", self.language.clone()),
            ("pretty", self.pretty.to_string()),
        ]
    }
}

/// BVG REST API client.
///
/// Clones share the connection pool and the response cache. The pool is
/// released when the last clone is dropped.
#[derive(Clone)]
pub struct BvgClient {
    http: reqwest::Client,
    base_url: String,
    cache: ResponseCache,
    max_retries: u32,
    retry_delay: Duration,
}

impl BvgClient {
    /// Create a new client with the given configuration.
    pub fn new(config: BvgConfig) -> Result<Self, BvgError> {
        if config.max_retries == 0 {
            return Err(BvgError::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: ResponseCache::new(&config.cache),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The response cache (shared with clones of this client).
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Fetch `url`, using the current time for cache freshness.
    pub async fn call(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Option<Value>, BvgError> {
        self.call_at(url, params, Utc::now()).await
    }

    /// Fetch `url`, judging cache freshness against `now`.
    ///
    /// The cache key is `url` alone: `params` do not take part in lookups.
    pub async fn call_at(
        &self,
        url: &str,
        params: &[(&str, String)],
        now: DateTime<Utc>,
    ) -> Result<Option<Value>, BvgError> {
        let cached = self.cache.get(url).await;

        if let Some(entry) = &cached
            && entry.is_fresh(now)
        {
            info!(%url, "cached response has not expired yet");
            return Ok(Some(Value::clone(&entry.body)));
        }

        for attempt in 1..=self.max_retries {
            info!(%url, "attempt {attempt}/{}", self.max_retries);

            let mut request = self.http.get(url).query(params);
            if let Some(entry) = &cached {
                request = request.header(IF_NONE_MATCH, entry.etag.as_str());
            }
            let response = request.send().await?;
            let status = response.status();

            match (status, &cached) {
                (StatusCode::NOT_MODIFIED, Some(entry)) => {
                    info!(%url, "cached response is still valid");
                    return Ok(Some(Value::clone(&entry.body)));
                }
                (StatusCode::TOO_MANY_REQUESTS, _) => {
                    warn!(%url, attempt, "rate limit reached");
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                (StatusCode::OK, _) => {
                    info!(%url, "response is successful");
                    return self.accept(url, response, now).await.map(Some);
                }
                _ => {
                    let body = response.text().await.unwrap_or_default();
                    warn!(
                        %url,
                        status = status.as_u16(),
                        %body,
                        "response is unsuccessful"
                    );
                    return Ok(None);
                }
            }
        }

        error!(%url, attempts = self.max_retries, "all attempts have failed");
        Ok(None)
    }

    /// Decode a 200 response and cache it when it carries an ETag.
    async fn accept(
        &self,
        url: &str,
        response: reqwest::Response,
        now: DateTime<Utc>,
    ) -> Result<Value, BvgError> {
        let headers = response.headers();
        let etag = header_str(headers, ETAG).map(str::to_string);
        let max_age = parse_max_age(header_str(headers, CACHE_CONTROL).unwrap_or_default());

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).map_err(|e| BvgError::json(&e, &text))?;

        if let Some(etag) = etag {
            info!(%url, %etag, ?max_age, "ETag provided, caching the response");
            let expiry = max_age.and_then(|secs| expiry_after(now, secs));
            self.cache
                .insert(url, CacheEntry::new(etag, body.clone(), expiry))
                .await;
        }

        Ok(body)
    }

    /// Return matching stops, or all stops when the query has no name.
    pub async fn get_stops(&self, query: &StopsQuery) -> Result<Option<Value>, BvgError> {
        let url = format!("{}/stops", self.base_url);
        self.call(&url, &query.params()).await
    }

    /// Find all vehicles currently in an area as well as their movements.
    ///
    /// Degenerate boxes are passed through untouched; upstream answers them
    /// with an error payload and status 200, which is returned like any
    /// other body.
    pub async fn get_radar(&self, query: &RadarQuery) -> Result<Option<Value>, BvgError> {
        let url = format!("{}/radar", self.base_url);
        self.call(&url, &query.params()).await
    }
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `now + secs`, or `None` (always revalidate) if that is not representable.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    let expiry = chrono::Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d));
    if expiry.is_none() {
        warn!(secs, "max-age out of range, treating response as always stale");
    }
    expiry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = BvgConfig::new()
            .with_base_url("http://localhost:8080")
            .with_max_retries(10)
            .with_retry_delay(Duration::from_secs(5))
            .with_timeout(60)
            .with_cache_capacity(16)
            .with_cache_idle_ttl(Duration::from_secs(120));

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.cache.max_capacity, 16);
        assert_eq!(config.cache.idle_ttl, Duration::from_secs(120));
    }

    #[test]
    fn config_defaults() {
        let config = BvgConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.retry_delay, DEFAULT_RETRY_DELAY);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn client_creation() {
        let client = BvgClient::new(BvgConfig::new().with_base_url("http://localhost:1/"));
        assert_eq!(client.unwrap().base_url(), "http://localhost:1");
    }

    #[test]
    fn zero_retries_rejected() {
        let result = BvgClient::new(BvgConfig::new().with_max_retries(0));
        assert!(matches!(result, Err(BvgError::InvalidConfig(_))));
    }

    #[test]
    fn stops_params_without_query() {
        assert_eq!(
            StopsQuery::all().params(),
            vec![("results", "10000".to_string())]
        );
    }

    #[test]
    fn stops_params_with_query() {
        let params = StopsQuery::matching("Gleisdreieck")
            .with_max_results(1)
            .params();
        assert_eq!(
            params,
            vec![
                ("results", "1".to_string()),
                ("query", "Gleisdreieck".to_string()),
                ("completion", "true".to_string()),
                ("fuzzy", "true".to_string()),
            ]
        );

        let params = StopsQuery::matching("x").with_fuzzy(false).params();
        assert!(params.contains(&("fuzzy", "false".to_string())));
    }

    #[test]
    fn radar_params_defaults() {
        let query = RadarQuery::new(BoundingBox::new(52.52411, 13.41002, 52.51942, 13.41709));
        assert_eq!(
            query.params(),
            vec![
                ("north", "52.52411".to_string()),
                ("west", "13.41002".to_string()),
                ("south", "52.51942".to_string()),
                ("east", "13.41709".to_string()),
                ("results", "256".to_string()),
                ("duration", "30".to_string()),
                ("frames", "1".to_string()),
                ("polylines", "false".to_string()),
                ("language", "en".to_string()),
                ("pretty", "false".to_string()),
            ]
        );
    }

    #[test]
    fn radar_params_overrides() {
        let query = RadarQuery::new(BoundingBox::new(1.0, 2.0, 3.0, 4.0))
            .with_max_vehicles(10)
            .with_frames(3, 15)
            .with_polylines(true)
            .with_language("de")
            .with_pretty(true);
        let params = query.params();

        assert!(params.contains(&("results", "10".to_string())));
        assert!(params.contains(&("frames", "3".to_string())));
        assert!(params.contains(&("duration", "15".to_string())));
        assert!(params.contains(&("polylines", "true".to_string())));
        assert!(params.contains(&("language", "de".to_string())));
        assert!(params.contains(&("pretty", "true".to_string())));
    }

    #[test]
    fn expiry_after_adds_seconds() {
        let now = DateTime::from_timestamp(946_684_800, 0).unwrap();
        let expiry = expiry_after(now, 3600).unwrap();
        assert_eq!(expiry.timestamp(), 946_688_400);
    }

    #[test]
    fn expiry_after_overflow_is_none() {
        let now = Utc::now();
        assert!(expiry_after(now, i64::MAX).is_none());
    }
}
