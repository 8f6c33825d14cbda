//! FleetPlayback Core Library
//!
//! This crate provides the geographic route model, the distance
//! parameterization used for constant-speed playback, and the trait
//! implemented by directions providers.

pub mod adapter;
pub mod distance;
pub mod error;
pub mod model;
pub mod units;

pub use adapter::DirectionsProvider;
pub use distance::{bearing_deg, haversine_m, CumulativeDistanceTable, RoutePose};
pub use error::PlaybackError;
pub use model::{EventFilter, PlaybackEvent, Point, Polyline, PositionReport, RouteSummary};
