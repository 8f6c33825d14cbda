//! Directions provider adapters for FleetPlayback

pub mod demo;
pub mod mapbox;

pub use demo::DemoDirections;
pub use mapbox::MapboxDirections;
