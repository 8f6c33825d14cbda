//! Demo directions provider that routes in straight lines
//!
//! Joins the requested waypoints with straight legs, densified so that the
//! playback engine has intermediate vertices to cross. Works offline and is
//! the default when no Mapbox token is configured.
//!
//! Long routes are capped at [`MAX_ROUTE_POINTS`] interpolated vertices by
//! widening the spacing, so a request spanning the globe stays small.

use anyhow::Result;
use async_trait::async_trait;
use fp_core::{
    adapter::DirectionsProvider,
    distance::haversine_m,
    model::{DirectionsRequest, DirectionsRoute, Point, Polyline, RouteSummary},
    PlaybackError,
};

/// Vertex spacing along each leg
const DEFAULT_SPACING_M: f64 = 50.0;

/// Upper bound on interpolated vertices per route; waypoints come on top
pub const MAX_ROUTE_POINTS: usize = 10_000;

/// Representative urban speed used for the advisory duration (30 km/h)
const DEFAULT_SPEED_MPS: f64 = 30.0 / 3.6;

pub struct DemoDirections {
    spacing_m: f64,
    speed_mps: f64,
}

impl DemoDirections {
    pub fn new() -> Self {
        Self {
            spacing_m: DEFAULT_SPACING_M,
            speed_mps: DEFAULT_SPEED_MPS,
        }
    }

    pub fn with_spacing(mut self, spacing_m: f64) -> Self {
        self.spacing_m = spacing_m.max(1.0);
        self
    }

    fn densify(&self, waypoints: &[Point]) -> Vec<Point> {
        let legs: Vec<f64> = waypoints
            .windows(2)
            .map(|leg| haversine_m(leg[0], leg[1]))
            .collect();
        let total_m: f64 = legs.iter().sum();
        let spacing_m = self.spacing_m.max(total_m / MAX_ROUTE_POINTS as f64);

        let mut points = Vec::with_capacity(MAX_ROUTE_POINTS + waypoints.len());
        points.push(waypoints[0]);
        for (leg, distance_m) in waypoints.windows(2).zip(legs) {
            let (a, b) = (leg[0], leg[1]);
            let steps = (distance_m / spacing_m).ceil().max(1.0) as usize;
            for step in 1..=steps {
                points.push(a.lerp(b, step as f64 / steps as f64));
            }
        }
        points
    }

    /// Route synchronously; the async trait method delegates here
    pub fn plan(&self, request: &DirectionsRequest) -> Result<DirectionsRoute> {
        request.validate()?;
        if request.waypoints.len() > MAX_ROUTE_POINTS {
            return Err(PlaybackError::invalid(format!(
                "at most {} waypoints are supported",
                MAX_ROUTE_POINTS
            ))
            .into());
        }

        let points = self.densify(&request.waypoints);
        let distance_m: f64 = points.windows(2).map(|w| haversine_m(w[0], w[1])).sum();
        let polyline = Polyline::new(points)?;

        Ok(DirectionsRoute {
            polyline,
            summary: RouteSummary {
                distance_m,
                duration_s: distance_m / self.speed_mps,
            },
        })
    }
}

impl Default for DemoDirections {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectionsProvider for DemoDirections {
    fn name(&self) -> &str {
        "Demo"
    }

    async fn route(&self, request: &DirectionsRequest) -> Result<DirectionsRoute> {
        self.plan(request)
    }
}
