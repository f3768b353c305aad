//! Fans the transit source out across all configured routes and merges the
//! per-route results into one [`Snapshot`].

use futures_util::future::join_all;
use std::time::Duration;
use tracing::{Instrument, debug, error, info_span, warn};

use crate::error::{AggregationError, FetchCause, FetchError};
use crate::models::{RoutePath, Snapshot, VehiclePosition};
use crate::services::transit_source::TransitSource;

type RouteResult = Result<(Vec<VehiclePosition>, Vec<RoutePath>), FetchError>;

/// Fetches vehicles and paths for one route, concurrently, bounded by `timeout`.
///
/// The route fails as a unit: if either call fails, neither result is used.
async fn fetch_route<S>(source: &S, route_id: &str, timeout: Duration) -> RouteResult
where
    S: TransitSource + ?Sized,
{
    let both = async {
        let (vehicles, paths) =
            tokio::join!(source.fetch_vehicles(route_id), source.fetch_paths(route_id));
        Ok::<_, FetchError>((vehicles?, paths?))
    };

    match tokio::time::timeout(timeout, both).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::new(
            route_id,
            FetchCause::Timeout {
                secs: timeout.as_secs(),
            },
        )),
    }
}

/// Builds a snapshot from every route in `route_ids`.
///
/// Routes are fetched concurrently but merged in the order given. A route
/// whose fetch fails contributes nothing; the call only fails when no routes
/// are configured or every route failed. Vehicles are not deduplicated across
/// routes.
pub async fn build_snapshot<S>(
    source: &S,
    route_ids: &[String],
    timeout: Duration,
) -> Result<Snapshot, AggregationError>
where
    S: TransitSource + ?Sized,
{
    if route_ids.is_empty() {
        return Err(AggregationError::NoRoutes);
    }

    let results = join_all(route_ids.iter().map(|route_id| {
        fetch_route(source, route_id, timeout)
            .instrument(info_span!("fetch_route", route_id = %route_id))
    }))
    .await;

    let mut snapshot = Snapshot::default();
    let mut causes = Vec::new();

    for result in results {
        match result {
            Ok((vehicles, paths)) => {
                snapshot.vehicles.extend(vehicles);
                snapshot.paths.extend(paths);
            }
            Err(e) => {
                warn!(route_id = %e.route, error = %e.cause, "Route fetch failed, skipping");
                causes.push(e);
            }
        }
    }

    if causes.len() == route_ids.len() {
        error!(routes = route_ids.len(), "Every route fetch failed");
        return Err(AggregationError::AllRoutesFailed { causes });
    }

    debug!(
        vehicles = snapshot.vehicles.len(),
        paths = snapshot.paths.len(),
        failed_routes = causes.len(),
        "Snapshot built"
    );

    Ok(snapshot)
}
