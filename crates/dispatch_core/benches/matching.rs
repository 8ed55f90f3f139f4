use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dispatch_core::geo::Coordinate;
use dispatch_core::matching::{Candidate, ProximityFirst, SelectionPolicy};
use dispatch_core::model::UserId;
use dispatch_core::proximity;

const PICKUP: Coordinate = Coordinate::new(12.9716, 77.5946);

/// Deterministic fleet scattered around the pickup point.
fn fleet(count: usize) -> Vec<(UserId, Coordinate)> {
    (0..count)
        .map(|i| {
            let angle = i as f64 * 0.618;
            let radius = 0.001 + (i % 97) as f64 * 0.002;
            (
                UserId(i as i64 + 1),
                Coordinate::new(
                    PICKUP.lat + radius * angle.cos(),
                    PICKUP.lng + radius * angle.sin(),
                ),
            )
        })
        .collect()
}

fn bench_find_nearby(c: &mut Criterion) {
    let drivers = fleet(1000);
    c.bench_function("find_nearby_1000_drivers", |b| {
        b.iter(|| proximity::find_nearby(black_box(PICKUP), black_box(&drivers), 10.0))
    });
}

fn bench_policy_select(c: &mut Criterion) {
    let candidates: Vec<Candidate> = fleet(1000)
        .into_iter()
        .map(|(driver, location)| Candidate {
            driver,
            location: Some(location),
        })
        .collect();
    c.bench_function("proximity_first_select_1000", |b| {
        b.iter(|| {
            ProximityFirst.select(
                black_box(Some(PICKUP)),
                black_box(&candidates),
                10.0,
                30.0,
            )
        })
    });
}

criterion_group!(benches, bench_find_nearby, bench_policy_select);
criterion_main!(benches);
