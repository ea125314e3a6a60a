//! BVG radar poller.
//!
//! Polls the BVG real-time API for vehicles inside a bounding box. The
//! interesting part is the API client, which caches responses by ETag and
//! rides out the upstream rate limit.

pub mod bvg;
pub mod config;
pub mod poller;
