//! Directions provider trait definition

use crate::model::{DirectionsRequest, DirectionsRoute};
use anyhow::Result;
use async_trait::async_trait;

/// Trait for services that turn waypoints into a drivable polyline
///
/// Each provider is responsible for:
/// - Routing between the requested waypoints (at least origin and destination)
/// - Returning the route geometry as an ordered list of (lon, lat) points
/// - Reporting advisory distance and duration for display
///
/// The playback engine never trusts the advisory distance for interpolation;
/// it always recomputes distances from the returned polyline.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Get the name of this provider (e.g., "Demo", "Mapbox")
    fn name(&self) -> &str;

    /// Compute a route through the requested waypoints
    ///
    /// Returns `Err(_)` when the provider is unreachable or finds no route.
    async fn route(&self, request: &DirectionsRequest) -> Result<DirectionsRoute>;
}
