//! FleetPlayback Server Library
//!
//! Exposes server components for integration testing.

pub mod api;
pub mod config;
pub mod manager;
pub mod playback;
pub mod positions;
pub mod sinks;
pub mod state;
