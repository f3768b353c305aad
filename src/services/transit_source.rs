//! Trait for the external source of live vehicle positions and route paths.

use crate::error::FetchError;
use crate::models::{RoutePath, VehiclePosition};

/// Statuses that mark an entry as not tracked in real time (schedule
/// placeholders and duplicates). Such entries never leave the adapter.
pub const EXCLUDED_STATUSES: &[&str] = &["default", "DUPLICATED"];

/// Returns `true` if a record with this status may be shown as a live vehicle.
pub fn is_tracked_status(status: &str) -> bool {
    !EXCLUDED_STATUSES.iter().any(|excluded| *excluded == status)
}

/// Abstraction over a transit-data provider (e.g., OneBusAway).
///
/// Implementations are stateless across calls and must either return the
/// complete result for a route or a [`FetchError`], never a partial list.
#[async_trait::async_trait]
pub trait TransitSource: Send + Sync {
    /// Returns the live, tracked vehicles currently serving `route_id`.
    async fn fetch_vehicles(&self, route_id: &str) -> Result<Vec<VehiclePosition>, FetchError>;

    /// Returns the encoded path geometry for `route_id`.
    async fn fetch_paths(&self, route_id: &str) -> Result<Vec<RoutePath>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_statuses_are_not_tracked() {
        assert!(!is_tracked_status("default"));
        assert!(!is_tracked_status("DUPLICATED"));
    }

    #[test]
    fn test_live_statuses_are_tracked() {
        assert!(is_tracked_status("SCHEDULED"));
        assert!(is_tracked_status("CANCELED"));
        // Matching is exact, as delivered by the source.
        assert!(is_tracked_status("duplicated"));
    }
}
