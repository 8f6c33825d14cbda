//! Distance parameterization of a polyline
//!
//! Directions APIs return unevenly spaced vertices (dense in turns, sparse on
//! straights). Playback at constant speed therefore walks the path by
//! accumulated ground distance rather than by vertex index.

use crate::model::{Point, Polyline};
use crate::units::{Degrees, Meters, Progress};
use serde::Serialize;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters
pub fn haversine_m(a: Point, b: Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Forward azimuth from `a` towards `b`, in [0, 360)
pub fn bearing_deg(a: Point, b: Point) -> Degrees {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    Degrees::normalized(y.atan2(x).to_degrees())
}

/// Distance traveled from point 0 through point i, one entry per vertex.
///
/// Invariants: same length as the polyline, non-decreasing, `[0] == 0`,
/// last entry is the total path length.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeDistanceTable {
    distances: Vec<f64>,
}

impl CumulativeDistanceTable {
    pub fn build(polyline: &Polyline) -> Self {
        let points = polyline.points();
        let mut distances = Vec::with_capacity(points.len());
        let mut total = 0.0;
        distances.push(total);
        for pair in points.windows(2) {
            total += haversine_m(pair[0], pair[1]);
            distances.push(total);
        }
        Self { distances }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.distances
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn total(&self) -> Meters {
        Meters(self.distances[self.distances.len() - 1])
    }

    /// Index `i` of the segment holding `target` meters.
    ///
    /// Returns the first `i` with `table[i] <= target <= table[i + 1]`, so a
    /// target sitting exactly on a vertex resolves to the earlier segment.
    /// Out-of-range targets clamp to the first/last segment.
    pub fn locate_segment(&self, target: f64) -> usize {
        let last_segment = self.distances.len() - 2;
        // table[1..] is sorted; the first entry >= target ends our segment
        let i = self.distances[1..].partition_point(|&d| d < target);
        i.min(last_segment)
    }

    /// Fraction of segment `i` covered at `target` meters; 0 on zero-length segments
    pub fn segment_progress(&self, i: usize, target: f64) -> f64 {
        let start = self.distances[i];
        let length = self.distances[i + 1] - start;
        if length > 0.0 {
            ((target - start) / length).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Vehicle pose at a given fraction of the trip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoutePose {
    pub progress: Progress,
    pub segment_index: usize,
    pub segment_progress: f64,
    pub position: Point,
    pub bearing: Degrees,
    pub distance_along: Meters,
}

impl RoutePose {
    /// Interpolate the pose at `progress` (clamped into [0, 1])
    pub fn at(polyline: &Polyline, table: &CumulativeDistanceTable, progress: f64) -> Self {
        let progress = Progress::new(progress);
        let distances = table.as_slice();
        let target = progress.0 * table.total().0;

        let i = table.locate_segment(target);
        let segment_progress = table.segment_progress(i, target);

        let points = polyline.points();
        let (p1, p2) = (points[i], points[i + 1]);
        let position = p1.lerp(p2, segment_progress);
        let bearing = bearing_deg(p1, p2);
        let distance_along = distances[i] + segment_progress * (distances[i + 1] - distances[i]);

        Self {
            progress,
            segment_index: i,
            segment_progress,
            position,
            bearing,
            distance_along: Meters(distance_along),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(coords: &[[f64; 2]]) -> Polyline {
        Polyline::from_coordinates(coords).unwrap()
    }

    #[test]
    fn test_haversine_same_point() {
        let p = Point::new(-77.0315, 3.8801);
        assert_eq!(haversine_m(p, p), 0.0);
    }

    #[test]
    fn test_haversine_one_hundredth_degree_at_equator() {
        let d = haversine_m(Point::new(0.0, 0.0), Point::new(0.0, 0.01));
        assert!((d - 1111.95).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn test_haversine_symmetry() {
        let a = Point::new(5.0, 45.0);
        let b = Point::new(5.1, 45.2);
        assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let o = Point::new(0.0, 0.0);
        assert!((bearing_deg(o, Point::new(0.0, 1.0)).0 - 0.0).abs() < 1e-9);
        assert!((bearing_deg(o, Point::new(1.0, 0.0)).0 - 90.0).abs() < 1e-9);
        assert!((bearing_deg(o, Point::new(0.0, -1.0)).0 - 180.0).abs() < 1e-9);
        assert!((bearing_deg(o, Point::new(-1.0, 0.0)).0 - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_table_three_points() {
        let pl = line(&[[0.0, 0.0], [0.0, 0.01], [0.0, 0.02]]);
        let table = CumulativeDistanceTable::build(&pl);
        let d = table.as_slice();
        assert_eq!(d.len(), 3);
        assert_eq!(d[0], 0.0);
        assert!((d[1] - 1111.95).abs() < 0.1);
        assert!((d[2] - 2223.9).abs() < 0.2);
        assert_eq!(table.total().0, d[2]);
    }

    #[test]
    fn test_table_build_is_idempotent() {
        let pl = line(&[[-77.03, 3.88], [-77.02, 3.885], [-77.01, 3.889], [-77.0, 3.9]]);
        assert_eq!(
            CumulativeDistanceTable::build(&pl),
            CumulativeDistanceTable::build(&pl)
        );
    }

    #[test]
    fn test_locate_segment_prefers_earlier_on_vertex() {
        let pl = line(&[[0.0, 0.0], [0.0, 0.01], [0.0, 0.02]]);
        let table = CumulativeDistanceTable::build(&pl);
        let vertex = table.as_slice()[1];
        assert_eq!(table.locate_segment(0.0), 0);
        assert_eq!(table.locate_segment(vertex), 0);
        assert_eq!(table.locate_segment(vertex + 1e-6), 1);
        assert_eq!(table.locate_segment(table.total().0), 1);
        assert_eq!(table.locate_segment(table.total().0 * 2.0), 1);
    }

    #[test]
    fn test_locate_segment_matches_linear_scan() {
        let pl = line(&[
            [0.0, 0.0],
            [0.0, 0.001],
            [0.0, 0.001],
            [0.0, 0.005],
            [0.002, 0.005],
            [0.002, 0.005],
        ]);
        let table = CumulativeDistanceTable::build(&pl);
        let d = table.as_slice();
        let linear = |target: f64| {
            (0..d.len() - 1)
                .find(|&i| d[i] <= target && target <= d[i + 1])
                .unwrap_or(d.len() - 2)
        };
        for step in 0..=200 {
            let target = table.total().0 * step as f64 / 200.0;
            assert_eq!(table.locate_segment(target), linear(target), "target {}", target);
        }
        for &vertex in d {
            assert_eq!(table.locate_segment(vertex), linear(vertex));
        }
    }

    #[test]
    fn test_zero_length_segment_progress_is_zero() {
        let pl = line(&[[0.0, 0.0], [0.0, 0.0], [0.0, 0.01]]);
        let table = CumulativeDistanceTable::build(&pl);
        assert_eq!(table.segment_progress(0, 0.0), 0.0);
        let pose = RoutePose::at(&pl, &table, 0.0);
        assert_eq!(pose.segment_index, 0);
        assert_eq!(pose.segment_progress, 0.0);
        assert_eq!(pose.position, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_all_points_identical() {
        let pl = line(&[[1.0, 1.0], [1.0, 1.0]]);
        let table = CumulativeDistanceTable::build(&pl);
        assert_eq!(table.total().0, 0.0);
        let pose = RoutePose::at(&pl, &table, 1.0);
        assert_eq!(pose.position, Point::new(1.0, 1.0));
        assert!(pose.distance_along.0.is_finite());
    }

    #[test]
    fn test_two_point_boundaries_are_exact() {
        let a = Point::new(-77.0315, 3.8801);
        let b = Point::new(-77.0201, 3.8911);
        let pl = Polyline::new(vec![a, b]).unwrap();
        let table = CumulativeDistanceTable::build(&pl);
        assert_eq!(pl.segment_count(), 1);

        let start = RoutePose::at(&pl, &table, 0.0);
        assert_eq!(start.position, a);
        assert_eq!(start.segment_index, 0);

        let end = RoutePose::at(&pl, &table, 1.0);
        assert_eq!(end.position, b);
        assert_eq!(end.segment_index, 0);
        assert!(end.progress.is_complete());
    }

    #[test]
    fn test_midpoint_of_three_point_line() {
        let pl = line(&[[0.0, 0.0], [0.0, 0.01], [0.0, 0.02]]);
        let table = CumulativeDistanceTable::build(&pl);
        let pose = RoutePose::at(&pl, &table, 0.5);

        // Equal-length segments: halfway lands on the middle vertex (earlier segment)
        assert_eq!(pose.segment_index, 0);
        assert!((pose.segment_progress - 1.0).abs() < 1e-9);
        assert!((pose.position.lat - 0.01).abs() < 1e-9);
        assert_eq!(pose.position.lon, 0.0);
        assert!((pose.bearing.0 - 0.0).abs() < 1e-9);
        assert!((pose.distance_along.0 - table.total().0 / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_progress_is_clamped() {
        let pl = line(&[[0.0, 0.0], [0.0, 0.01]]);
        let table = CumulativeDistanceTable::build(&pl);
        assert_eq!(RoutePose::at(&pl, &table, 2.0).position, pl.last());
        assert_eq!(RoutePose::at(&pl, &table, -1.0).position, pl.first());
    }

    fn arb_polyline() -> impl Strategy<Value = Polyline> {
        prop::collection::vec((-1.0f64..1.0, -1.0f64..1.0), 2..40).prop_map(|offsets| {
            let points = offsets
                .into_iter()
                .map(|(dx, dy)| Point::new(-77.0 + dx * 0.01, 3.88 + dy * 0.01))
                .collect();
            Polyline::new(points).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_table_shape(pl in arb_polyline()) {
            let table = CumulativeDistanceTable::build(&pl);
            let d = table.as_slice();
            prop_assert_eq!(d.len(), pl.len());
            prop_assert_eq!(d[0], 0.0);
            prop_assert!(d.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn prop_distance_along_matches_progress(pl in arb_polyline(), progress in 0.0f64..=1.0) {
            let table = CumulativeDistanceTable::build(&pl);
            let pose = RoutePose::at(&pl, &table, progress);
            let expected = progress * table.total().0;
            let tolerance = 1e-6 * expected.abs().max(1.0);
            prop_assert!((pose.distance_along.0 - expected).abs() <= tolerance);
            prop_assert!(pose.segment_index < pl.segment_count());
            prop_assert!((0.0..360.0).contains(&pose.bearing.0));
        }
    }
}
