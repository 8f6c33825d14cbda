//! Application state management

use crate::config::{
    PlaybackConfig, ServerConfig, DEFAULT_POSITION_LOG_CAPACITY, DEFAULT_POSITION_LOG_VEHICLES,
};
use crate::playback::PlaybackEngine;
use crate::positions::PositionLog;
use crate::sinks::{SinkConfig, SinkType};
use anyhow::Result;
use fp_adapters::{DemoDirections, MapboxDirections};
use fp_core::{adapter::DirectionsProvider, model::PlaybackEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

/// Roughly 15 s of frames at 60 Hz
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The single playback view
    pub playback: Arc<RwLock<PlaybackEngine>>,

    /// Cancellation token for the frame clock task
    pub playback_cancel: Arc<RwLock<Option<CancellationToken>>>,

    /// Broadcast channel for playback events
    /// SSE subscribers and the report dispatcher each hold a receiver
    pub events_tx: broadcast::Sender<PlaybackEvent>,

    /// External position sinks
    pub sinks: Arc<RwLock<Vec<SinkConfig>>>,

    /// Built-in position sink
    pub positions: Arc<PositionLog>,

    pub directions: Arc<dyn DirectionsProvider>,

    pub config: PlaybackConfig,
}

impl AppState {
    pub fn new() -> Self {
        Self::build(
            PlaybackConfig::default(),
            default_position_log(),
            Arc::new(DemoDirections::new()),
            Vec::new(),
        )
    }

    /// State for the server binary: provider, timing and sinks from config
    pub fn with_config(config: &ServerConfig) -> Result<Self> {
        let directions: Arc<dyn DirectionsProvider> = match &config.mapbox_token {
            Some(token) => Arc::new(MapboxDirections::new(token.clone())?),
            None => Arc::new(DemoDirections::new()),
        };
        tracing::info!("Using {} directions provider", directions.name());

        let sinks: Vec<SinkConfig> = config
            .position_sink_url
            .iter()
            .map(|url| SinkConfig {
                id: "sink-1".to_string(),
                sink_type: SinkType::Http { url: url.clone() },
            })
            .collect();

        Ok(Self::build(
            config.playback,
            PositionLog::new(config.position_log_capacity, config.position_log_vehicles),
            directions,
            sinks,
        ))
    }

    /// Default state with a custom directions provider
    pub fn with_directions(directions: Arc<dyn DirectionsProvider>) -> Self {
        Self::build(
            PlaybackConfig::default(),
            default_position_log(),
            directions,
            Vec::new(),
        )
    }

    /// Default state with custom playback timing
    pub fn with_playback_config(config: PlaybackConfig) -> Self {
        Self::build(
            config,
            default_position_log(),
            Arc::new(DemoDirections::new()),
            Vec::new(),
        )
    }

    fn build(
        config: PlaybackConfig,
        positions: PositionLog,
        directions: Arc<dyn DirectionsProvider>,
        sinks: Vec<SinkConfig>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            playback: Arc::new(RwLock::new(PlaybackEngine::new(config.report_interval))),
            playback_cancel: Arc::new(RwLock::new(None)),
            events_tx,
            sinks: Arc::new(RwLock::new(sinks)),
            positions: Arc::new(positions),
            directions,
            config,
        }
    }

    /// Subscribe to playback events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events_tx.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: PlaybackEvent) {
        let _ = self.events_tx.send(event);
    }
}

fn default_position_log() -> PositionLog {
    PositionLog::new(DEFAULT_POSITION_LOG_CAPACITY, DEFAULT_POSITION_LOG_VEHICLES)
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_config_registers_sink_url() {
        let config = ServerConfig {
            position_sink_url: Some("http://localhost:3000/posiciones".to_string()),
            ..ServerConfig::default()
        };
        let state = AppState::with_config(&config).unwrap();
        assert_eq!(state.directions.name(), "Demo");
        let sinks = state.sinks.try_read().unwrap();
        assert_eq!(sinks.len(), 1);
        assert_eq!(sinks[0].id, "sink-1");
        assert_eq!(
            sinks[0].sink_type,
            SinkType::Http {
                url: "http://localhost:3000/posiciones".to_string()
            }
        );
    }

    #[test]
    fn test_with_config_without_sink_url_has_no_sinks() {
        let state = AppState::with_config(&ServerConfig::default()).unwrap();
        assert!(state.sinks.try_read().unwrap().is_empty());
    }

    #[test]
    fn test_mapbox_selected_by_token() {
        let config = ServerConfig {
            mapbox_token: Some("pk.test".to_string()),
            ..ServerConfig::default()
        };
        let state = AppState::with_config(&config).unwrap();
        assert_eq!(state.directions.name(), "Mapbox");
    }
}
