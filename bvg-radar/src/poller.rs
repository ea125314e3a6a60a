//! Periodic radar polling.
//!
//! Each tick fetches the radar for one bounding box and reduces it to a
//! [`RadarSummary`]. Turning movements into stored vehicle positions is left
//! to whatever consumes the summaries.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::bvg::{
    BoundingBox, BvgClient, BvgError, LineProduct, Movement, RadarQuery, RadarResponse,
};

/// What one radar poll observed.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarSummary {
    pub observed_at: DateTime<Utc>,
    pub movements: Vec<Movement>,
    pub per_product: BTreeMap<LineProduct, usize>,
}

impl RadarSummary {
    fn new(radar: RadarResponse, observed_at: DateTime<Utc>) -> Self {
        let mut per_product = BTreeMap::new();
        for movement in &radar.movements {
            *per_product.entry(movement.line.product).or_default() += 1;
        }

        Self {
            observed_at,
            movements: radar.movements,
            per_product,
        }
    }

    pub fn count(&self, product: LineProduct) -> usize {
        self.per_product.get(&product).copied().unwrap_or(0)
    }
}

/// Polls the radar endpoint for one area at a fixed interval.
pub struct Poller {
    client: BvgClient,
    query: RadarQuery,
    interval: Duration,
}

impl Poller {
    pub fn new(client: BvgClient, bbox: BoundingBox, interval: Duration) -> Self {
        Self {
            client,
            query: RadarQuery::new(bbox),
            interval,
        }
    }

    /// Fetch and summarise the radar once.
    ///
    /// `Ok(None)` when the client had no result or the payload is not a
    /// radar response (upstream reports bad parameters that way).
    pub async fn poll_once(&self) -> Result<Option<RadarSummary>, BvgError> {
        let observed_at = Utc::now();
        let Some(body) = self.client.get_radar(&self.query).await? else {
            return Ok(None);
        };

        match serde_json::from_value::<RadarResponse>(body) {
            Ok(radar) => Ok(Some(RadarSummary::new(radar, observed_at))),
            Err(e) => {
                warn!(error = %e, "radar payload is not a movement list");
                Ok(None)
            }
        }
    }

    /// Poll forever, logging each outcome. Faults do not stop the loop.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.poll_once().await {
                Ok(Some(summary)) => {
                    info!(
                        movements = summary.movements.len(),
                        per_product = ?summary.per_product,
                        "radar polled"
                    );
                    for m in &summary.movements {
                        debug!(
                            trip_id = %m.trip_id,
                            line = %m.line.name,
                            product = %m.line.product,
                            location = ?m.location,
                            "vehicle observed"
                        );
                    }
                }
                Ok(None) => warn!("radar poll produced no result"),
                Err(e) => error!(error = %e, "radar poll failed"),
            }
        }
    }
}
