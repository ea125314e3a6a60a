//! BVG transport.rest client.
//!
//! This module provides an HTTP client for the public BVG real-time API
//! (`v6.bvg.transport.rest`), covering stop lookup and the vehicle radar.
//!
//! Key characteristics of the API:
//! - No authentication, but a rate limit of 100 requests per minute;
//!   exceeding it yields `429 Too Many Requests`
//! - Responses carry `ETag` and `Cache-Control` headers, the latter with a
//!   non-standard `max-age: <n>` directive
//! - Bad radar parameters are reported in a JSON body with status 200

mod cache;
mod cache_control;
mod client;
mod error;
mod types;

#[cfg(test)]
mod log_capture;

pub use cache::{CacheEntry, ResponseCache, ResponseCacheConfig};
pub use cache_control::parse_max_age;
pub use client::{BoundingBox, BvgClient, BvgConfig, DEFAULT_BASE_URL, RadarQuery, StopsQuery};
pub use error::BvgError;
pub use types::{Line, LineProduct, Location, Movement, RadarResponse, Stop};
