//! The refresh pipeline and the background job that runs it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::aggregate::build_snapshot;
use crate::cache::SnapshotCache;
use crate::error::PipelineError;
use crate::models::CachedArtifact;
use crate::render::MapRenderer;
use crate::services::transit_source::TransitSource;

/// Fetch → aggregate → render, with no shared mutable state. Safe to run
/// concurrently from the scheduler and any number of requests.
pub struct Pipeline {
    source: Arc<dyn TransitSource>,
    route_ids: Vec<String>,
    renderer: MapRenderer,
    fetch_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn TransitSource>,
        route_ids: Vec<String>,
        renderer: MapRenderer,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            route_ids,
            renderer,
            fetch_timeout,
        }
    }

    pub fn renderer(&self) -> &MapRenderer {
        &self.renderer
    }

    /// Runs one uncached pass and returns the map fragment.
    pub async fn run(&self) -> Result<String, PipelineError> {
        let snapshot =
            build_snapshot(self.source.as_ref(), &self.route_ids, self.fetch_timeout).await?;
        let fragment = self.renderer.render(&snapshot)?;

        info!(vehicles = snapshot.vehicles.len(), "Pipeline run complete");
        Ok(fragment)
    }
}

/// Runs the pipeline once and publishes the result. On failure the cache is
/// left holding the previous artifact.
#[tracing::instrument(skip_all)]
pub async fn refresh_once(pipeline: &Pipeline, cache: &SnapshotCache) -> Result<(), PipelineError> {
    // Render fully before touching the cache so readers never wait on it.
    let fragment = pipeline.run().await?;
    let artifact = CachedArtifact::new(fragment);
    let updated_at = artifact.updated_at;

    cache.replace(artifact);

    info!(updated_at = %updated_at.format("%Y-%m-%d %H:%M:%S"), "Map cache updated");
    Ok(())
}

/// Spawns the refresh loop: one run immediately, then one every `period`
/// measured start to start. A run that overruns the period delays the next
/// tick rather than triggering a burst of catch-up runs.
///
/// The loop exits on the first change to `shutdown` or when its sender is
/// dropped. A run in progress at that moment is abandoned before it publishes.
pub fn spawn_scheduler(
    pipeline: Arc<Pipeline>,
    cache: SnapshotCache,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                result = refresh_once(&pipeline, &cache) => {
                    if let Err(e) = result {
                        error!(error = %e, "Scheduled refresh failed, keeping previous map");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        info!("Scheduler stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AggregationError, FetchCause, FetchError};
    use crate::models::{RoutePath, VehiclePosition};
    use crate::render::{MarkerStyle, RenderConfig};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Serves one vehicle on route "R" while `up` is set.
    #[derive(Default)]
    struct Toggle {
        up: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TransitSource for Toggle {
        async fn fetch_vehicles(&self, route_id: &str) -> Result<Vec<VehiclePosition>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.up.load(Ordering::SeqCst) {
                return Err(FetchError::new(route_id, FetchCause::Other("down".into())));
            }
            Ok(vec![VehiclePosition {
                vehicle_id: "v1".to_string(),
                lat: 47.6,
                lon: -122.3,
                timestamp: 0,
                status: "SCHEDULED".to_string(),
                phase: "in_progress".to_string(),
                schedule_deviation: 0,
            }])
        }

        async fn fetch_paths(&self, _route_id: &str) -> Result<Vec<RoutePath>, FetchError> {
            Ok(vec![])
        }
    }

    fn pipeline(source: Arc<Toggle>) -> Arc<Pipeline> {
        let renderer = MapRenderer::new(RenderConfig {
            center: (47.6, -122.3),
            zoom: 12,
            refresh_interval: 60,
            style: MarkerStyle::default(),
        });
        Arc::new(Pipeline::new(
            source,
            vec!["R".to_string()],
            renderer,
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn test_refresh_publishes() {
        let source = Arc::new(Toggle::default());
        source.up.store(true, Ordering::SeqCst);
        let cache = SnapshotCache::new();

        refresh_once(&pipeline(source), &cache).await.unwrap();

        assert!(cache.current().unwrap().html.contains("v1"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_artifact() {
        let source = Arc::new(Toggle::default());
        source.up.store(true, Ordering::SeqCst);
        let pipeline = pipeline(source.clone());
        let cache = SnapshotCache::new();

        refresh_once(&pipeline, &cache).await.unwrap();
        let before = cache.read().await;

        source.up.store(false, Ordering::SeqCst);
        let err = refresh_once(&pipeline, &cache).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Aggregation(AggregationError::AllRoutesFailed { .. })
        ));

        let after = cache.read().await;
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(before.updated_at, after.updated_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_runs_immediately_then_on_period() {
        let source = Arc::new(Toggle::default());
        source.up.store(true, Ordering::SeqCst);
        let cache = SnapshotCache::new();
        let (tx, rx) = watch::channel(false);

        let handle = spawn_scheduler(
            pipeline(source.clone()),
            cache.clone(),
            Duration::from_secs(60),
            rx,
        );

        cache.read().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_retries_until_first_success() {
        let source = Arc::new(Toggle::default());
        let cache = SnapshotCache::new();
        let (tx, rx) = watch::channel(false);

        let handle = spawn_scheduler(
            pipeline(source.clone()),
            cache.clone(),
            Duration::from_secs(10),
            rx,
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(cache.current().is_none());

        source.up.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(cache.current().is_some());

        drop(tx);
        handle.await.unwrap();
    }
}
