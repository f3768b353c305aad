//! Error taxonomy for the refresh pipeline.
//!
//! [`FetchError`] is scoped to one route and is absorbed by the aggregator.
//! [`AggregationError`] and [`RenderError`] reach the caller of the pipeline.

use thiserror::Error;

/// The underlying reason a single route fetch failed.
#[derive(Error, Debug)]
pub enum FetchCause {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("{0}")]
    Other(String),
}

/// One route's network or data failure.
#[derive(Error, Debug)]
#[error("fetch failed for route {route}: {cause}")]
pub struct FetchError {
    pub route: String,
    #[source]
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(route: impl Into<String>, cause: impl Into<FetchCause>) -> Self {
        Self {
            route: route.into(),
            cause: cause.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("no routes configured")]
    NoRoutes,

    #[error("all {} routes failed", .causes.len())]
    AllRoutesFailed { causes: Vec<FetchError> },
}

/// A snapshot that cannot be drawn. Upstream contracts should make this
/// unreachable, so it is never swallowed.
#[derive(Error, Debug, PartialEq)]
pub enum RenderError {
    #[error("vehicle {vehicle_id} has invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { vehicle_id: String, lat: f64, lon: f64 },

    #[error("route path #{index} is empty")]
    EmptyPath { index: usize },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("route list is empty")]
    NoRoutes,

    #[error("route id at position {index} is blank")]
    BlankRoute { index: usize },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_message_names_route() {
        let err = FetchError::new("40_100479", FetchCause::Timeout { secs: 15 });
        assert_eq!(
            err.to_string(),
            "fetch failed for route 40_100479: timed out after 15s"
        );
    }

    #[test]
    fn test_all_routes_failed_counts_causes() {
        let err = AggregationError::AllRoutesFailed {
            causes: vec![
                FetchError::new("R1", FetchCause::Other("boom".into())),
                FetchError::new("R2", FetchCause::Other("boom".into())),
            ],
        };
        assert_eq!(err.to_string(), "all 2 routes failed");
    }
}
