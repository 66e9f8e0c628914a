use criterion::{black_box, criterion_group, criterion_main, Criterion};

use county_conquest::config::EngineConfig;
use county_conquest::data::{build_region_map, RegionFeature, RegionMap};
use county_conquest::territory::{partition, rebalance, resolve, ConquestLedger, Site, SiteId};

/// County-sized cells over the lower 48, roughly the real region count
fn county_grid() -> RegionMap {
    let (cols, rows) = (80u32, 40u32);
    let (dx, dy) = (56.0 / cols as f64, 24.0 / rows as f64);
    let features = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .map(|(row, col)| {
            let lon = -124.0 + col as f64 * dx;
            let lat = 25.0 + row as f64 * dy;
            RegionFeature {
                id: 1 + row * cols + col,
                polygons: vec![vec![vec![
                    (lon, lat),
                    (lon + dx, lat),
                    (lon + dx, lat + dy),
                    (lon, lat + dy),
                    (lon, lat),
                ]]],
            }
        })
        .collect();
    build_region_map(features).expect("grid is well formed")
}

/// Sites clustered in the east so the rebalancer has work to do
fn sites(n: usize) -> Vec<Site> {
    (0..n)
        .map(|i| {
            let lon = -95.0 + (i % 8) as f64 * 3.0;
            let lat = 30.0 + (i / 8) as f64 * 3.0;
            Site::new(format!("s{i}"), &format!("Site {i}"), (lon, lat))
        })
        .collect()
}

fn bench_partition(c: &mut Criterion) {
    let map = county_grid();
    let roster = sites(130);
    c.bench_function("partition_3200x130", |b| {
        b.iter(|| partition(black_box(&map.graph), black_box(&roster)))
    });
}

fn bench_rebalance(c: &mut Criterion) {
    let map = county_grid();
    let roster = sites(24);
    let initial = partition(&map.graph, &roster);
    let config = EngineConfig::default();
    c.bench_function("rebalance_3200x24", |b| {
        b.iter(|| rebalance(black_box(&map.graph), &roster, initial.clone(), &config))
    });
}

fn bench_resolve(c: &mut Criterion) {
    let map = county_grid();
    let roster = sites(130);
    let seeded = ConquestLedger::seed(&resolve(&map.graph, &roster, None));
    let ledger = seeded.apply_conquest(&SiteId::from("s0"), &SiteId::from("s1")).ledger;
    let active: Vec<Site> = roster.iter().filter(|s| s.id.as_str() != "s1").cloned().collect();
    c.bench_function("resolve_with_ledger", |b| {
        b.iter(|| resolve(black_box(&map.graph), black_box(&active), Some(&ledger)))
    });
}

criterion_group!(benches, bench_partition, bench_rebalance, bench_resolve);
criterion_main!(benches);
