//! Environment-keyed configuration.
//!
//! `ENV` selects a profile (`prod` or `test`) that fixes the retry policy
//! and the default log level. A few optional variables override the rest.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::bvg::{BoundingBox, BvgConfig, DEFAULT_BASE_URL};

/// Area polled when `RADAR_BBOX` is unset (around Alexanderplatz).
const DEFAULT_BBOX: BoundingBox = BoundingBox {
    north: 52.52411,
    west: 13.41002,
    south: 52.51942,
    east: 13.41709,
};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ENV is not set (expected one of: prod, test)")]
    MissingEnvironment,

    #[error("unknown environment {0:?} (expected one of: prod, test)")]
    UnknownEnvironment(String),

    #[error("invalid {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Deployment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Prod,
    Test,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prod" => Ok(Environment::Prod),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,

    /// Attempts per API call while rate limited.
    pub max_retries: u32,

    /// Seconds to wait after a 429.
    pub retry_delay_secs: u64,

    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_level: &'static str,

    pub base_url: String,

    /// Area covered by each radar poll.
    pub bbox: BoundingBox,

    /// Seconds between radar polls.
    pub poll_interval_secs: u64,
}

impl AppConfig {
    /// The built-in profile for an environment, without overrides.
    pub fn for_environment(environment: Environment) -> Self {
        let (max_retries, retry_delay_secs, log_level) = match environment {
            Environment::Prod => (10, 5, "warn"),
            Environment::Test => (3, 0, "debug"),
        };

        Self {
            environment,
            max_retries,
            retry_delay_secs,
            log_level,
            base_url: DEFAULT_BASE_URL.to_string(),
            bbox: DEFAULT_BBOX,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Read configuration from a variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let environment: Environment = vars
            .get("ENV")
            .ok_or(ConfigError::MissingEnvironment)?
            .parse()?;

        let mut config = Self::for_environment(environment);

        if let Some(url) = vars.get("BVG_BASE_URL") {
            config.base_url = url.clone();
        }
        if let Some(bbox) = vars.get("RADAR_BBOX") {
            config.bbox = parse_bbox(bbox)?;
        }
        if let Some(secs) = vars.get("POLL_INTERVAL_SECS") {
            config.poll_interval_secs = secs.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "POLL_INTERVAL_SECS",
                message: format!("{e}"),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the client and poller rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries < 1 {
            return Err(ConfigError::Invalid {
                name: "max_retries",
                message: "must be at least 1".to_string(),
            });
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "POLL_INTERVAL_SECS",
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Client configuration derived from this profile.
    pub fn bvg_config(&self) -> BvgConfig {
        BvgConfig::new()
            .with_base_url(&self.base_url)
            .with_max_retries(self.max_retries)
            .with_retry_delay(Duration::from_secs(self.retry_delay_secs))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Parse `north,west,south,east`.
fn parse_bbox(s: &str) -> Result<BoundingBox, ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        name: "RADAR_BBOX",
        message,
    };

    let coords = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(e.to_string()))?;

    match coords[..] {
        [north, west, south, east] => Ok(BoundingBox::new(north, west, south, east)),
        _ => Err(invalid(format!(
            "expected 4 comma-separated coordinates, got {}",
            coords.len()
        ))),
    }
}
