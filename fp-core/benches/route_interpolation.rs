use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fp_core::{CumulativeDistanceTable, Point, Polyline, RoutePose};

/// Zig-zag route with `n` vertices around Buenaventura
fn synthetic_route(n: usize) -> Polyline {
    let points = (0..n)
        .map(|i| {
            let t = i as f64;
            Point::new(-77.0315 + t * 0.0001, 3.8801 + (t * 0.7).sin() * 0.0005)
        })
        .collect();
    Polyline::new(points).expect("synthetic route has at least two points")
}

fn benchmark_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("cumulative_distance_table");

    for n in [100, 1_000, 10_000] {
        let polyline = synthetic_route(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &polyline, |b, pl| {
            b.iter(|| CumulativeDistanceTable::build(black_box(pl)));
        });
    }

    group.finish();
}

fn benchmark_pose_per_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_pose");

    for n in [100, 1_000, 10_000] {
        let polyline = synthetic_route(n);
        let table = CumulativeDistanceTable::build(&polyline);
        // One trip of 120 s at 60 Hz
        let frames = 7_200;

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                for frame in 0..frames {
                    let progress = frame as f64 / frames as f64;
                    black_box(RoutePose::at(&polyline, &table, black_box(progress)));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_table_build, benchmark_pose_per_frame);
criterion_main!(benches);
