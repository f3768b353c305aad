use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::types::{Envelope, EntryData, ListData, StopsForRoute, TripDetails};
use crate::error::{FetchCause, FetchError};
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::models::{RoutePath, VehiclePosition};
use crate::services::transit_source::{TransitSource, is_tracked_status};

pub const DEFAULT_BASE_URL: &str = "https://api.pugetsound.onebusaway.org";

pub struct OneBusAwayClient<C> {
    http: C,
    base_url: String,
}

impl OneBusAwayClient<UrlParam<BasicClient>> {
    /// Builds a client that authenticates every call with `?key=<api_key>`.
    pub fn with_api_key(base_url: &str, api_key: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = UrlParam::new(BasicClient::new(timeout)?, "key", api_key);
        Ok(Self::new(http, base_url))
    }
}

impl<C: HttpClient> OneBusAwayClient<C> {
    pub fn new(http: C, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, method: &str, route_id: &str) -> String {
        format!("{}/api/where/{}/{}.json", self.base_url, method, route_id)
    }
}

/// Unwraps the OneBusAway envelope, treating any `code` but 200 or a missing
/// `data` member as a failed call.
fn into_data<T>(envelope: Envelope<T>) -> Result<T, FetchCause> {
    if envelope.code != 200 {
        return Err(FetchCause::Status {
            status: envelope.code,
            body: envelope.text.unwrap_or_default(),
        });
    }
    envelope
        .data
        .ok_or_else(|| FetchCause::Other("response has no data member".to_string()))
}

/// Keeps trips whose status carries a vehicle id, a position and a
/// real-time-tracked status.
pub(crate) fn vehicles_from_trips(trips: Vec<TripDetails>) -> Vec<VehiclePosition> {
    trips
        .into_iter()
        .filter_map(|trip| {
            let status = trip.status?;
            let position = status.position?;
            if !is_tracked_status(&status.status) {
                return None;
            }
            Some(VehiclePosition {
                vehicle_id: status.vehicle_id?,
                lat: position.lat,
                lon: position.lon,
                timestamp: status.last_update_time,
                status: status.status,
                phase: status.phase,
                schedule_deviation: status.schedule_deviation,
            })
        })
        .collect()
}

#[async_trait]
impl<C: HttpClient> TransitSource for OneBusAwayClient<C> {
    async fn fetch_vehicles(&self, route_id: &str) -> Result<Vec<VehiclePosition>, FetchError> {
        let url = format!(
            "{}?includeStatus=true",
            self.endpoint("trips-for-route", route_id)
        );

        let envelope: Envelope<ListData<TripDetails>> = fetch_json(&self.http, &url)
            .await
            .map_err(|cause| FetchError::new(route_id, cause))?;
        let trips = into_data(envelope)
            .map_err(|cause| FetchError::new(route_id, cause))?
            .list;

        let total = trips.len();
        let vehicles = vehicles_from_trips(trips);
        debug!(route_id, total, tracked = vehicles.len(), "Trips received");

        Ok(vehicles)
    }

    async fn fetch_paths(&self, route_id: &str) -> Result<Vec<RoutePath>, FetchError> {
        let url = self.endpoint("stops-for-route", route_id);

        let envelope: Envelope<EntryData<StopsForRoute>> = fetch_json(&self.http, &url)
            .await
            .map_err(|cause| FetchError::new(route_id, cause))?;
        let entry = into_data(envelope)
            .map_err(|cause| FetchError::new(route_id, cause))?
            .entry;

        debug!(route_id, polylines = entry.polylines.len(), "Route paths received");

        Ok(entry
            .polylines
            .into_iter()
            .map(|p| RoutePath(p.points))
            .collect())
    }
}
