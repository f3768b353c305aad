//! Data model shared by the adapter, aggregator, renderer and cache.

use chrono::{DateTime, Local, TimeZone};
use std::fmt;

/// One observed vehicle at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct VehiclePosition {
    pub vehicle_id: String,
    pub lat: f64,
    pub lon: f64,
    /// Source-supplied observation time, epoch milliseconds.
    pub timestamp: i64,
    pub status: String,
    pub phase: String,
    /// Seconds; positive is late, negative is early.
    pub schedule_deviation: i64,
}

impl VehiclePosition {
    pub fn schedule_status(&self) -> ScheduleStatus {
        ScheduleStatus::classify(self.schedule_deviation)
    }

    /// Observation time as `HH:MM:SS` in the server's local timezone.
    pub fn last_update_time(&self) -> String {
        self.last_update_time_in(&Local)
    }

    /// Observation time as `HH:MM:SS` in `tz`, or `"unknown"` when the
    /// timestamp is out of range.
    pub fn last_update_time_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match tz.timestamp_millis_opt(self.timestamp).single() {
            Some(t) => t.format("%H:%M:%S").to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// An encoded polyline for one route's physical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePath(pub String);

impl RoutePath {
    pub fn encoded(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoutePath {
    fn from(points: String) -> Self {
        Self(points)
    }
}

/// Vehicles and paths gathered by a single aggregation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub vehicles: Vec<VehiclePosition>,
    pub paths: Vec<RoutePath>,
}

/// Coarse schedule classification. Marker color depends only on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleBucket {
    Late,
    Early,
    OnTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    Late { minutes: u64 },
    Early { minutes: u64 },
    OnTime,
}

impl ScheduleStatus {
    /// Classifies a deviation in seconds by its sign. Minutes are
    /// `round(|deviation| / 60)`, halves rounding to even.
    pub fn classify(deviation_secs: i64) -> Self {
        let minutes = (deviation_secs.unsigned_abs() as f64 / 60.0).round_ties_even() as u64;
        match deviation_secs.signum() {
            1 => ScheduleStatus::Late { minutes },
            -1 => ScheduleStatus::Early { minutes },
            _ => ScheduleStatus::OnTime,
        }
    }

    pub fn bucket(&self) -> ScheduleBucket {
        match self {
            ScheduleStatus::Late { .. } => ScheduleBucket::Late,
            ScheduleStatus::Early { .. } => ScheduleBucket::Early,
            ScheduleStatus::OnTime => ScheduleBucket::OnTime,
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStatus::Late { minutes } => write!(f, "{minutes} mins late"),
            ScheduleStatus::Early { minutes } => write!(f, "{minutes} mins early"),
            ScheduleStatus::OnTime => f.write_str("on time"),
        }
    }
}

/// The rendered fragment most recently published by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedArtifact {
    pub html: String,
    pub updated_at: DateTime<Local>,
}

impl CachedArtifact {
    pub fn new(html: String) -> Self {
        Self {
            html,
            updated_at: Local::now(),
        }
    }
}
