//! Integration tests for the DemoDirections provider

use fp_adapters::{demo::MAX_ROUTE_POINTS, DemoDirections};
use fp_core::{
    adapter::DirectionsProvider,
    distance::haversine_m,
    model::{DirectionsRequest, Point},
};

fn origin() -> Point {
    Point::new(-77.0315, 3.8801)
}

fn destination() -> Point {
    Point::new(-77.0201, 3.8911)
}

#[test]
fn test_demo_directions_name() {
    let provider = DemoDirections::new();
    assert_eq!(provider.name(), "Demo");
}

#[test]
fn test_demo_directions_starts_and_ends_at_waypoints() {
    let provider = DemoDirections::new();
    let route = provider
        .plan(&DirectionsRequest::between(origin(), destination()))
        .expect("plan() should succeed");

    assert_eq!(route.polyline.first(), origin());
    assert_eq!(route.polyline.last(), destination());
    assert!(
        route.polyline.len() > 2,
        "A ~1.7 km leg should be densified, got {} points",
        route.polyline.len()
    );
}

#[test]
fn test_demo_directions_vertex_spacing() {
    let provider = DemoDirections::new().with_spacing(100.0);
    let route = provider
        .plan(&DirectionsRequest::between(origin(), destination()))
        .unwrap();

    for pair in route.polyline.points().windows(2) {
        let d = haversine_m(pair[0], pair[1]);
        assert!(d <= 100.5, "Segment of {} m exceeds spacing", d);
    }
}

#[test]
fn test_demo_directions_passes_through_intermediate_stops() {
    let stop = Point::new(-77.0250, 3.8801);
    let provider = DemoDirections::new();
    let route = provider
        .plan(&DirectionsRequest {
            waypoints: vec![origin(), stop, destination()],
        })
        .unwrap();

    assert!(
        route.polyline.points().contains(&stop),
        "Route should visit the intermediate stop"
    );
}

#[test]
fn test_demo_directions_summary_is_consistent() {
    let provider = DemoDirections::new();
    let route = provider
        .plan(&DirectionsRequest::between(origin(), destination()))
        .unwrap();

    let direct = haversine_m(origin(), destination());
    assert!((route.summary.distance_m - direct).abs() < 1.0);
    // 30 km/h
    let expected_duration = route.summary.distance_m / (30.0 / 3.6);
    assert!((route.summary.duration_s - expected_duration).abs() < 1e-6);
    assert!(route.summary.distance_label().ends_with(" km"));
}

#[test]
fn test_demo_directions_caps_points_on_long_routes() {
    // Ten half-globe legs would need millions of vertices at 50 m
    let waypoints: Vec<Point> = (0..10)
        .map(|i| Point::new(if i % 2 == 0 { 0.0 } else { 179.0 }, 0.0))
        .collect();
    let provider = DemoDirections::new();
    let route = provider
        .plan(&DirectionsRequest {
            waypoints: waypoints.clone(),
        })
        .unwrap();

    assert!(
        route.polyline.len() <= MAX_ROUTE_POINTS + waypoints.len(),
        "got {} points",
        route.polyline.len()
    );
    assert_eq!(route.polyline.first(), waypoints[0]);
    assert_eq!(route.polyline.last(), waypoints[9]);
    for stop in &waypoints {
        assert!(route.polyline.points().contains(stop));
    }
}

#[test]
fn test_demo_directions_short_routes_keep_spacing() {
    // ~1.7 km stays well under the cap, so the 50 m default is honoured
    let route = DemoDirections::new()
        .plan(&DirectionsRequest::between(origin(), destination()))
        .unwrap();
    for pair in route.polyline.points().windows(2) {
        assert!(haversine_m(pair[0], pair[1]) <= 50.5);
    }
}

#[test]
fn test_demo_directions_rejects_too_many_waypoints() {
    let waypoints: Vec<Point> = (0..=MAX_ROUTE_POINTS)
        .map(|i| Point::new(0.0, i as f64 * 1e-5))
        .collect();
    let result = DemoDirections::new().plan(&DirectionsRequest { waypoints });
    assert!(result.is_err());
}

#[test]
fn test_demo_directions_rejects_single_waypoint() {
    let provider = DemoDirections::new();
    let result = provider.plan(&DirectionsRequest {
        waypoints: vec![origin()],
    });
    assert!(result.is_err(), "A single waypoint cannot be routed");
}

#[test]
fn test_demo_directions_identical_waypoints() {
    let provider = DemoDirections::new();
    let route = provider
        .plan(&DirectionsRequest::between(origin(), origin()))
        .expect("Degenerate route is still a valid two-point polyline");
    assert_eq!(route.polyline.len(), 2);
    assert_eq!(route.summary.distance_m, 0.0);
}

#[tokio::test]
async fn test_demo_directions_async_route() {
    let provider = DemoDirections::default();
    let route = provider
        .route(&DirectionsRequest::between(origin(), destination()))
        .await
        .expect("route() should succeed");
    assert_eq!(route.polyline.last(), destination());
}
