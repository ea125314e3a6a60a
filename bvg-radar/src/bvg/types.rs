//! BVG API response DTOs.
//!
//! Typed views over the JSON returned by `/stops` and `/radar`. The client
//! itself hands out `serde_json::Value`; these are for callers that want
//! structure. Fields the API sometimes omits are `Option`, and anything we
//! do not use (stopovers, frames, polylines) is left out.

use serde::Deserialize;

/// Transport product of a line, as reported in `line.product`.
///
/// Matches the `line_product` enumeration of the vehicles table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineProduct {
    Bus,
    Subway,
    Tram,
    /// S-Bahn
    Suburban,
    Ferry,
    /// IC/ICE trains
    Express,
    /// Regio trains
    Regional,
}

impl LineProduct {
    pub const ALL: [LineProduct; 7] = [
        LineProduct::Bus,
        LineProduct::Subway,
        LineProduct::Tram,
        LineProduct::Suburban,
        LineProduct::Ferry,
        LineProduct::Express,
        LineProduct::Regional,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LineProduct::Bus => "bus",
            LineProduct::Subway => "subway",
            LineProduct::Tram => "tram",
            LineProduct::Suburban => "suburban",
            LineProduct::Ferry => "ferry",
            LineProduct::Express => "express",
            LineProduct::Regional => "regional",
        }
    }
}

impl std::fmt::Display for LineProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// An entry from `/stops`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub location: Option<Location>,
}

/// A line as embedded in a radar movement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Line {
    /// Public line name, e.g. "M4" or "S7".
    pub name: String,
    pub product: LineProduct,
}

/// A vehicle currently tracked inside the radar bounding box.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    /// Trip identifier. The API has no vehicle IDs, so this is the closest
    /// thing to a vehicle identity.
    pub trip_id: String,
    pub direction: Option<String>,
    pub line: Line,
    pub location: Option<Location>,
}

/// Response from `/radar`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarResponse {
    pub movements: Vec<Movement>,

    /// Unix timestamp of the upstream realtime snapshot.
    pub realtime_data_updated_at: Option<i64>,
}
