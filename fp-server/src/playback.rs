//! Route playback engine
//!
//! Moves a vehicle along a polyline at constant ground speed over a fixed
//! wall-clock duration. The engine is a plain state machine driven by
//! `tick(session, elapsed)`; the frame clock lives in `manager`.
//!
//! Status transitions: `Idle -> Running -> {Completed | Cancelled}`. A new
//! `start` is required to run again; `reset` returns to `Idle`.

use fp_core::{
    distance::{CumulativeDistanceTable, RoutePose},
    model::{
        PlaybackEvent, Point, Polyline, PositionReport, RouteSummary, IDLE_DISTANCE_LABEL,
        IDLE_DURATION_LABEL,
    },
    units::{Degrees, Meters, Progress},
    PlaybackError,
};
use serde::Serialize;
use std::time::Duration;

pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Runtime state of the running animation. Owns its polyline and table.
struct PlaybackSession {
    id: SessionId,
    vehicle_id: String,
    polyline: Polyline,
    table: CumulativeDistanceTable,
    duration: Duration,
    drawn_segment: Option<usize>,
    last_report: Option<Duration>,
}

/// What the UI reads between frames; survives completion and cancellation
#[derive(Debug, Clone)]
struct Snapshot {
    session: SessionId,
    vehicle_id: String,
    duration: Duration,
    total_distance: Meters,
    labels: RouteSummary,
    pose: Option<RoutePose>,
}

/// Outcome of one frame
#[derive(Debug, Clone)]
pub struct Tick {
    pub session: SessionId,
    pub vehicle_id: String,
    pub pose: RoutePose,
    /// Present only when the segment index advanced since the previous frame
    pub path: Option<PathSplit>,
    /// Present at most once per report interval
    pub report: Option<PositionReport>,
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSplit {
    pub segment_index: usize,
    pub traveled: Vec<Point>,
    pub remaining: Vec<Point>,
}

impl Tick {
    /// Events to publish, in order: frame, path, report, finished
    pub fn into_events(self) -> Vec<PlaybackEvent> {
        let session = self.session;
        let mut events = Vec::with_capacity(4);
        events.push(PlaybackEvent::Frame {
            session,
            progress: self.pose.progress,
            position: self.pose.position,
            bearing: self.pose.bearing,
            segment_index: self.pose.segment_index,
            distance_along: self.pose.distance_along,
        });
        if let Some(path) = self.path {
            events.push(PlaybackEvent::Path {
                session,
                segment_index: path.segment_index,
                traveled: path.traveled,
                remaining: path.remaining,
            });
        }
        if let Some(report) = self.report {
            events.push(PlaybackEvent::Report { session, report });
        }
        if self.finished {
            events.push(PlaybackEvent::Finished {
                session,
                vehicle_id: self.vehicle_id,
            });
        }
        events
    }
}

/// Returned by a successful `start`
#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub session: SessionId,
    pub started: PlaybackEvent,
    /// Cancellation of the session this one replaced, if any
    pub replaced: Option<PlaybackEvent>,
}

/// Serializable playback info for the API
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackInfo {
    pub status: PlaybackStatus,
    pub session_id: Option<SessionId>,
    pub vehicle_id: Option<String>,
    pub progress: Progress,
    pub segment_index: Option<usize>,
    pub position: Option<Point>,
    pub bearing: Option<Degrees>,
    pub total_distance: Option<Meters>,
    pub duration_ms: Option<u64>,
    pub distance_label: String,
    pub duration_label: String,
}

/// One playback view: at most one running session
pub struct PlaybackEngine {
    report_interval: Duration,
    status: PlaybackStatus,
    session: Option<PlaybackSession>,
    snapshot: Option<Snapshot>,
    next_id: SessionId,
}

impl PlaybackEngine {
    pub fn new(report_interval: Duration) -> Self {
        Self {
            report_interval,
            status: PlaybackStatus::Idle,
            session: None,
            snapshot: None,
            next_id: 1,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == PlaybackStatus::Running
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Validate input and begin a new session, replacing any running one.
    ///
    /// Validation happens before anything is touched: on error the current
    /// session (if any) keeps running.
    pub fn start(
        &mut self,
        points: Vec<Point>,
        duration: Duration,
        vehicle_id: impl Into<String>,
        summary: Option<RouteSummary>,
    ) -> Result<StartOutcome, PlaybackError> {
        let vehicle_id = vehicle_id.into();
        if vehicle_id.trim().is_empty() {
            return Err(PlaybackError::invalid("vehicle id must not be empty"));
        }
        if duration.is_zero() {
            return Err(PlaybackError::invalid("duration must be positive"));
        }
        let polyline = Polyline::new(points)?;
        let table = CumulativeDistanceTable::build(&polyline);
        let total_distance = table.total();

        let replaced = if self.is_running() {
            self.session.take().map(|old| {
                tracing::debug!(
                    "Playback session {} ({}) replaced by a new start for {}",
                    old.id,
                    old.vehicle_id,
                    vehicle_id
                );
                PlaybackEvent::Cancelled {
                    session: old.id,
                    vehicle_id: old.vehicle_id,
                }
            })
        } else {
            None
        };

        let id = self.next_id;
        self.next_id += 1;

        let labels = summary.unwrap_or(RouteSummary {
            distance_m: total_distance.0,
            duration_s: duration.as_secs_f64(),
        });

        self.snapshot = Some(Snapshot {
            session: id,
            vehicle_id: vehicle_id.clone(),
            duration,
            total_distance,
            labels,
            pose: None,
        });
        self.session = Some(PlaybackSession {
            id,
            vehicle_id: vehicle_id.clone(),
            polyline,
            table,
            duration,
            drawn_segment: None,
            last_report: None,
        });
        self.status = PlaybackStatus::Running;

        tracing::info!(
            "Playback session {} started for {} ({:.0} m over {} ms)",
            id,
            vehicle_id,
            total_distance.0,
            duration.as_millis()
        );

        Ok(StartOutcome {
            session: id,
            started: PlaybackEvent::Started {
                session: id,
                vehicle_id,
                total_distance,
                duration_ms: duration.as_millis() as u64,
            },
            replaced,
        })
    }

    /// Advance the session to `elapsed` since its start.
    ///
    /// Returns `None` when `session` is not the running session, so a stale
    /// frame loop exits on its next tick.
    pub fn tick(&mut self, session: SessionId, elapsed: Duration) -> Option<Tick> {
        if !self.is_running() {
            return None;
        }
        let report_interval = self.report_interval;
        let s = self.session.as_mut().filter(|s| s.id == session)?;

        let progress = (elapsed.as_secs_f64() / s.duration.as_secs_f64()).min(1.0);
        let pose = RoutePose::at(&s.polyline, &s.table, progress);

        let path = if s.drawn_segment.map_or(true, |drawn| pose.segment_index > drawn) {
            s.drawn_segment = Some(pose.segment_index);
            let (traveled, remaining) = s.polyline.split_at(pose.segment_index);
            Some(PathSplit {
                segment_index: pose.segment_index,
                traveled: traveled.to_vec(),
                remaining: remaining.to_vec(),
            })
        } else {
            None
        };

        let report_due = match s.last_report {
            Some(last) => elapsed.saturating_sub(last) >= report_interval,
            None => true,
        };
        let report = if report_due {
            s.last_report = Some(elapsed);
            Some(PositionReport::new(s.vehicle_id.clone(), pose.position))
        } else {
            None
        };

        let finished = pose.progress.is_complete();
        let vehicle_id = s.vehicle_id.clone();

        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.pose = Some(pose);
        }

        if finished {
            self.session = None;
            self.status = PlaybackStatus::Completed;
            tracing::info!("Playback session {} finished: {} reached destination", session, vehicle_id);
        }

        Some(Tick {
            session,
            vehicle_id,
            pose,
            path,
            report,
            finished,
        })
    }

    /// Stop the running session. Already drawn state is left as-is.
    pub fn cancel(&mut self) -> Result<PlaybackEvent, PlaybackError> {
        if !self.is_running() {
            return Err(PlaybackError::NotRunning);
        }
        let session = self.session.take().ok_or(PlaybackError::NotRunning)?;
        self.status = PlaybackStatus::Cancelled;
        tracing::info!("Playback session {} cancelled", session.id);
        Ok(PlaybackEvent::Cancelled {
            session: session.id,
            vehicle_id: session.vehicle_id,
        })
    }

    /// Drop all session state and return to `Idle`.
    /// Returns the cancellation event if a session was still running.
    pub fn reset(&mut self) -> Option<PlaybackEvent> {
        let cancelled = self.cancel().ok();
        self.snapshot = None;
        self.status = PlaybackStatus::Idle;
        cancelled
    }

    pub fn info(&self) -> PlaybackInfo {
        match &self.snapshot {
            None => PlaybackInfo {
                status: self.status,
                session_id: None,
                vehicle_id: None,
                progress: Progress::default(),
                segment_index: None,
                position: None,
                bearing: None,
                total_distance: None,
                duration_ms: None,
                distance_label: IDLE_DISTANCE_LABEL.to_string(),
                duration_label: IDLE_DURATION_LABEL.to_string(),
            },
            Some(snap) => PlaybackInfo {
                status: self.status,
                session_id: Some(snap.session),
                vehicle_id: Some(snap.vehicle_id.clone()),
                progress: snap.pose.map(|p| p.progress).unwrap_or_default(),
                segment_index: snap.pose.map(|p| p.segment_index),
                position: snap.pose.map(|p| p.position),
                bearing: snap.pose.map(|p| p.bearing),
                total_distance: Some(snap.total_distance),
                duration_ms: Some(snap.duration.as_millis() as u64),
                distance_label: snap.labels.distance_label(),
                duration_label: snap.labels.duration_label(),
            },
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(crate::config::MIN_REPORT_INTERVAL)
    }
}
