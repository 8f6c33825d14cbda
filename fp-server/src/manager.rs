//! Playback task manager
//!
//! This module handles:
//! - Driving the running playback session from a frame clock
//! - Stopping the frame clock on cancel, reset or replacement
//! - Dispatching position reports to the position log and external sinks

use crate::playback::{PlaybackInfo, SessionId, StartOutcome};
use crate::sinks::{create_sink, Sink, SinkConfig};
use crate::state::AppState;
use fp_core::{
    model::{PlaybackEvent, Point, RouteSummary},
    PlaybackError, PositionReport,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Start a session, replacing any running one, and spawn its frame clock.
///
/// The engine lock is held until the new clock is registered so that a
/// concurrent start or cancel cannot stop the wrong clock.
pub async fn start_playback(
    state: &AppState,
    points: Vec<Point>,
    duration: Duration,
    vehicle_id: String,
    summary: Option<RouteSummary>,
) -> Result<PlaybackInfo, PlaybackError> {
    let mut engine = state.playback.write().await;
    let outcome = engine.start(points, duration, vehicle_id, summary)?;
    spawn_playback(state, outcome).await;
    Ok(engine.info())
}

/// Publish the start events and spawn the frame clock for a new session.
///
/// Any previous frame clock is cancelled first; its session has already been
/// replaced in the engine, so it would stop on its next tick regardless.
pub async fn spawn_playback(state: &AppState, outcome: StartOutcome) {
    let started_at = Instant::now();

    if let Some(replaced) = outcome.replaced {
        state.publish(replaced);
    }
    state.publish(outcome.started);

    let token = {
        let mut cancel = state.playback_cancel.write().await;
        if let Some(token) = cancel.take() {
            token.cancel();
        }
        let token = CancellationToken::new();
        *cancel = Some(token.clone());
        token
    };

    tokio::spawn(drive(state.clone(), outcome.session, started_at, token));
}

/// Cancel the running session and stop its frame clock
pub async fn cancel_playback(state: &AppState) -> Result<PlaybackEvent, PlaybackError> {
    let mut engine = state.playback.write().await;
    let event = engine.cancel()?;
    stop_clock(state).await;
    state.publish(event.clone());
    Ok(event)
}

/// Cancel if running and return the engine to idle
pub async fn reset_playback(state: &AppState) {
    let mut engine = state.playback.write().await;
    let cancelled = engine.reset();
    stop_clock(state).await;
    if let Some(event) = cancelled {
        state.publish(event);
    }
}

async fn stop_clock(state: &AppState) {
    if let Some(token) = state.playback_cancel.write().await.take() {
        token.cancel();
    }
}

/// Frame clock: one engine tick per interval until the session ends
async fn drive(state: AppState, session: SessionId, started_at: Instant, token: CancellationToken) {
    let mut interval = tokio::time::interval(state.config.frame_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Playback task started for session {}", session);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        let tick = {
            let mut engine = state.playback.write().await;
            engine.tick(session, started_at.elapsed())
        };

        // Stale session: replaced, cancelled or reset
        let Some(tick) = tick else { break };

        let finished = tick.finished;
        for event in tick.into_events() {
            state.publish(event);
        }
        if finished {
            break;
        }
    }

    info!("Playback task ended for session {}", session);
}

/// Report dispatcher loop
pub async fn run(state: AppState) {
    let mut rx = state.subscribe();
    let mut dispatcher = ReportDispatcher::default();

    info!("Report dispatcher started");

    loop {
        match rx.recv().await {
            Ok(PlaybackEvent::Report { report, .. }) => {
                state.positions.record(report.clone());
                let configs = state.sinks.read().await.clone();
                dispatcher.sync(&configs).await;
                dispatcher.deliver(&report);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Report dispatcher lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    info!("Report dispatcher stopped");
}

/// Sink instances cached by sink id
#[derive(Default)]
pub struct ReportDispatcher {
    /// `None` marks a sink that failed to open; it is not retried until reconfigured
    sinks: HashMap<String, (SinkConfig, Option<Box<dyn Sink>>)>,
}

impl ReportDispatcher {
    /// Rebuild the cache against the configured sinks
    pub async fn sync(&mut self, configs: &[SinkConfig]) {
        self.sinks
            .retain(|id, (cached, _)| configs.iter().any(|c| c.id == *id && *c == *cached));

        for config in configs {
            if self.sinks.contains_key(&config.id) {
                continue;
            }
            let sink = match create_sink(config).await {
                Ok(sink) => Some(sink),
                Err(e) => {
                    let err = PlaybackError::ReportDelivery(format!("sink {}: {:#}", config.id, e));
                    warn!("{}", err);
                    None
                }
            };
            self.sinks.insert(config.id.clone(), (config.clone(), sink));
        }
    }

    /// Forward one report to every open sink; failures are logged and dropped
    pub fn deliver(&mut self, report: &PositionReport) {
        for (id, (_, sink)) in self.sinks.iter_mut() {
            let Some(sink) = sink else { continue };
            if let Err(e) = sink.send(report) {
                let err = PlaybackError::ReportDelivery(format!("sink {}: {:#}", id, e));
                warn!("{}", err);
            }
        }
    }

    pub fn active_sinks(&self) -> usize {
        self.sinks.values().filter(|(_, s)| s.is_some()).count()
    }
}
