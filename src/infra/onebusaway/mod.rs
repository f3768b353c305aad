//! OneBusAway REST implementation of [`crate::services::transit_source::TransitSource`].
//!
//! [`types`] holds the subset of the `/api/where` wire format this crate reads.
//! [`OneBusAwayClient`] issues the calls and applies the tracked-vehicle filter.

mod client;
pub mod types;

pub use client::{DEFAULT_BASE_URL, OneBusAwayClient};
