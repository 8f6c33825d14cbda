//! Route data model
//!
//! Defines the geographic types shared by providers, the playback engine
//! and position sinks.
//!
//! Coordinate convention: WGS84 degrees, longitude first (GeoJSON order).

use crate::error::PlaybackError;
use crate::units::{Degrees, Meters, Progress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A geographic point (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PointRepr")]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

/// Accepts both `{"lon":..,"lat":..}` and GeoJSON `[lon, lat]`
#[derive(Deserialize)]
#[serde(untagged)]
enum PointRepr {
    Pair([f64; 2]),
    Object { lon: f64, lat: f64 },
}

impl From<PointRepr> for Point {
    fn from(repr: PointRepr) -> Self {
        match repr {
            PointRepr::Pair([lon, lat]) => Point { lon, lat },
            PointRepr::Object { lon, lat } => Point { lon, lat },
        }
    }
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// Linear interpolation in lon/lat space.
    ///
    /// This is not geodesic interpolation; between routing waypoints the
    /// error is negligible. Written as `a(1-t) + bt` so `t = 0` and `t = 1`
    /// return the endpoints exactly.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point {
            lon: self.lon * (1.0 - t) + other.lon * t,
            lat: self.lat * (1.0 - t) + other.lat * t,
        }
    }
}

/// Ordered path of at least two finite points. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polyline {
    points: Vec<Point>,
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Result<Self, PlaybackError> {
        if points.len() < 2 {
            return Err(PlaybackError::invalid(format!(
                "polyline needs at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some(i) = points.iter().position(|p| !p.is_finite()) {
            return Err(PlaybackError::invalid(format!(
                "polyline point {} has non-finite coordinates",
                i
            )));
        }
        Ok(Self { points })
    }

    /// Build from GeoJSON LineString coordinates (`[[lon, lat], ...]`)
    pub fn from_coordinates(coords: &[[f64; 2]]) -> Result<Self, PlaybackError> {
        Self::new(coords.iter().map(|&[lon, lat]| Point { lon, lat }).collect())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; a polyline holds at least two points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Point {
        self.points[0]
    }

    pub fn last(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    pub fn segment_count(&self) -> usize {
        self.points.len() - 1
    }

    /// Split into (traveled, remaining) at vertex `index`.
    ///
    /// The vertex is shared by both halves so the two drawn lines meet.
    pub fn split_at(&self, index: usize) -> (&[Point], &[Point]) {
        let i = index.min(self.points.len() - 1);
        (&self.points[..=i], &self.points[i..])
    }
}

impl TryFrom<Vec<Point>> for Polyline {
    type Error = PlaybackError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<Polyline> for Vec<Point> {
    fn from(polyline: Polyline) -> Self {
        polyline.points
    }
}

/// A GPS position sent to the position sinks
///
/// Wire shape is `{ "vehicleId", "point": { "lon", "lat" }, "capturedAt" }`.
/// Snake-case field names are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    #[serde(alias = "vehicle_id")]
    pub vehicle_id: String,
    pub point: Point,
    #[serde(default = "Utc::now", alias = "captured_at")]
    pub captured_at: DateTime<Utc>,
}

impl PositionReport {
    pub fn new(vehicle_id: impl Into<String>, point: Point) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            point,
            captured_at: Utc::now(),
        }
    }
}

/// Advisory distance/duration reported by a directions provider (display only)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_m: f64,
    pub duration_s: f64,
}

pub const IDLE_DISTANCE_LABEL: &str = "0 km";
pub const IDLE_DURATION_LABEL: &str = "0 min";

impl RouteSummary {
    /// e.g. "12.34 km"
    pub fn distance_label(&self) -> String {
        format!("{:.2} km", self.distance_m / 1000.0)
    }

    /// e.g. "25 min"
    pub fn duration_label(&self) -> String {
        format!("{} min", (self.duration_s / 60.0).round() as i64)
    }
}

/// Waypoints to route through: origin, optional stops, destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub waypoints: Vec<Point>,
}

impl DirectionsRequest {
    pub fn between(origin: Point, destination: Point) -> Self {
        Self {
            waypoints: vec![origin, destination],
        }
    }

    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.waypoints.len() < 2 {
            return Err(PlaybackError::invalid(
                "directions need an origin and a destination",
            ));
        }
        if self.waypoints.iter().any(|p| !p.is_finite()) {
            return Err(PlaybackError::invalid("waypoint has non-finite coordinates"));
        }
        Ok(())
    }
}

/// A route returned by a directions provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRoute {
    pub polyline: Polyline,
    pub summary: RouteSummary,
}

/// Events published while a playback session runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    Started {
        session: u64,
        vehicle_id: String,
        total_distance: Meters,
        duration_ms: u64,
    },
    /// Vehicle marker pose for one frame
    Frame {
        session: u64,
        progress: Progress,
        position: Point,
        bearing: Degrees,
        segment_index: usize,
        distance_along: Meters,
    },
    /// Traveled/remaining split, only when the segment index advances
    Path {
        session: u64,
        segment_index: usize,
        traveled: Vec<Point>,
        remaining: Vec<Point>,
    },
    Report {
        session: u64,
        report: PositionReport,
    },
    /// Trip finished notification
    Finished { session: u64, vehicle_id: String },
    Cancelled { session: u64, vehicle_id: String },
}

impl PlaybackEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PlaybackEvent::Started { .. } => "started",
            PlaybackEvent::Frame { .. } => "frame",
            PlaybackEvent::Path { .. } => "path",
            PlaybackEvent::Report { .. } => "report",
            PlaybackEvent::Finished { .. } => "finished",
            PlaybackEvent::Cancelled { .. } => "cancelled",
        }
    }

    pub fn session(&self) -> u64 {
        match self {
            PlaybackEvent::Started { session, .. }
            | PlaybackEvent::Frame { session, .. }
            | PlaybackEvent::Path { session, .. }
            | PlaybackEvent::Report { session, .. }
            | PlaybackEvent::Finished { session, .. }
            | PlaybackEvent::Cancelled { session, .. } => *session,
        }
    }
}

// === Event Filtering for Selective Streaming ===

/// Specifies which event kinds a stream subscriber wants
///
/// Map views usually need `frame,path`; a tracking dashboard only `report`.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    kinds: HashSet<String>,
    include_all: bool,
}

impl EventFilter {
    /// Create a filter that passes every event
    pub fn all() -> Self {
        Self {
            kinds: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a filter from a comma-separated list of event kinds
    pub fn parse(kinds: &str) -> Self {
        let kinds: HashSet<String> = kinds
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            kinds,
            include_all: false,
        }
    }

    pub fn includes(&self, kind: &str) -> bool {
        self.include_all || self.kinds.contains(&kind.to_lowercase())
    }

    pub fn matches(&self, event: &PlaybackEvent) -> bool {
        self.includes(event.kind())
    }
}
