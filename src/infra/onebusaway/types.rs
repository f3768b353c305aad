//! Wire types for the OneBusAway `/api/where` endpoints.
//!
//! Fields this crate never reads are left out; serde ignores them.

use serde::Deserialize;

/// Every OneBusAway response is wrapped in this envelope. `code` mirrors the
/// HTTP status and is the authoritative success flag.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    #[serde(default)]
    pub text: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct ListData<T> {
    pub list: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct EntryData<T> {
    pub entry: T,
}

/// One element of `trips-for-route`. `status` is only present when the
/// request sets `includeStatus=true`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
    #[serde(default)]
    pub status: Option<TripStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatus {
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub position: Option<Coordinate>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub phase: String,
    /// Seconds.
    #[serde(default)]
    pub schedule_deviation: i64,
    /// Epoch milliseconds.
    #[serde(default)]
    pub last_update_time: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// The `entry` of `stops-for-route`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopsForRoute {
    #[serde(default)]
    pub polylines: Vec<EncodedPolyline>,
}

#[derive(Debug, Deserialize)]
pub struct EncodedPolyline {
    pub points: String,
}
