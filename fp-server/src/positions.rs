//! In-memory position log, the built-in position sink
//!
//! Keeps the most recent reports per vehicle so the API can answer
//! "where is vehicle X" without an external tracking backend. Both the
//! reports per vehicle and the number of vehicles are bounded; when a new
//! vehicle arrives at the limit, the vehicle that reported least recently
//! is evicted.

use fp_core::PositionReport;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const DEFAULT_LATEST_LIMIT: usize = 10;

struct VehicleTrack {
    /// Value of the log's sequence counter at this vehicle's latest report
    last_seq: u64,
    reports: VecDeque<PositionReport>,
}

#[derive(Default)]
struct Inner {
    seq: u64,
    by_vehicle: HashMap<String, VehicleTrack>,
}

pub struct PositionLog {
    capacity: usize,
    max_vehicles: usize,
    inner: Mutex<Inner>,
}

impl PositionLog {
    pub fn new(capacity: usize, max_vehicles: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            max_vehicles: max_vehicles.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn record(&self, report: PositionReport) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.seq += 1;
        let seq = inner.seq;

        if !inner.by_vehicle.contains_key(&report.vehicle_id)
            && inner.by_vehicle.len() >= self.max_vehicles
        {
            let stalest = inner
                .by_vehicle
                .iter()
                .min_by_key(|(_, track)| track.last_seq)
                .map(|(id, _)| id.clone());
            if let Some(id) = stalest {
                tracing::debug!("Position log full, evicting vehicle {}", id);
                inner.by_vehicle.remove(&id);
            }
        }

        let track = inner
            .by_vehicle
            .entry(report.vehicle_id.clone())
            .or_insert_with(|| VehicleTrack {
                last_seq: seq,
                reports: VecDeque::new(),
            });
        track.last_seq = seq;
        if track.reports.len() == self.capacity {
            track.reports.pop_front();
        }
        track.reports.push_back(report);
    }

    /// Up to `limit` reports for a vehicle, newest first
    pub fn latest(&self, vehicle_id: &str, limit: usize) -> Vec<PositionReport> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .by_vehicle
            .get(vehicle_id)
            .map(|track| track.reports.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}
