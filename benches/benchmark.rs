//! Run with:
//! ```bash
//! cargo bench --bench benchmark
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pareto_rs::front::Front;
use pareto_rs::index::kdtree::KdTree;
use pareto_rs::index::linear::LinearIndex;
use pareto_rs::index::quadtree::QuadTree;
use pareto_rs::index::rstartree::RStarTree;
use pareto_rs::index::rtree::RTree;
use pareto_rs::index::SpatialIndex;
use pareto_rs::{Bbox, Direction, Point, Value};
use rand::{rngs::StdRng, Rng, SeedableRng};

const DIM: usize = 4;
const N_POINTS: usize = 5_000;
const SEED: u64 = 0xDEAD_BEEF_CAFE_BABE;

fn random_points(n: usize, dim: usize, seed: u64) -> Vec<Point<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| Point::new((0..dim).map(|_| rng.gen::<f64>() * 100.0).collect()))
        .collect()
}

fn fill<I: SpatialIndex<f64, u64>>(points: &[Point<f64>]) -> I {
    let mut index = I::new(DIM);
    for (i, p) in points.iter().enumerate() {
        index.insert(Value::new(p.clone(), i as u64)).unwrap();
    }
    index
}

/// Insert throughput per backend. Expected: `LinearIndex` is fastest per-op
/// at this scale (no tree bookkeeping); the trees earn their keep on query.
fn bench_insert(c: &mut Criterion) {
    let points = random_points(N_POINTS, DIM, SEED);

    let mut group = c.benchmark_group("insert_throughput");
    group.throughput(Throughput::Elements(N_POINTS as u64));

    group.bench_function("linear", |b| {
        b.iter(|| black_box(fill::<LinearIndex<f64, u64>>(&points)))
    });
    group.bench_function("kdtree", |b| {
        b.iter(|| black_box(fill::<KdTree<f64, u64>>(&points)))
    });
    group.bench_function("quadtree", |b| {
        b.iter(|| black_box(fill::<QuadTree<f64, u64>>(&points)))
    });
    group.bench_function("rtree", |b| {
        b.iter(|| black_box(fill::<RTree<f64, u64>>(&points)))
    });
    group.bench_function("rstartree", |b| {
        b.iter(|| black_box(fill::<RStarTree<f64, u64>>(&points)))
    });

    group.finish();
}

/// Range-query (`Intersects`) throughput per backend over a box covering
/// roughly a tenth of the domain on every axis.
fn bench_range_query(c: &mut Criterion) {
    let points = random_points(N_POINTS, DIM, SEED);
    let query_box = Bbox::new(
        Point::new(vec![0.0; DIM]),
        Point::new(vec![10.0; DIM]),
    );

    let linear: LinearIndex<f64, u64> = fill(&points);
    let kdtree: KdTree<f64, u64> = fill(&points);
    let quadtree: QuadTree<f64, u64> = fill(&points);
    let rtree: RTree<f64, u64> = fill(&points);
    let rstartree: RStarTree<f64, u64> = fill(&points);

    let mut group = c.benchmark_group("range_query_throughput");
    group.throughput(Throughput::Elements(N_POINTS as u64));

    group.bench_function("linear", |b| {
        b.iter(|| black_box(linear.begin_intersection(black_box(&query_box))))
    });
    group.bench_function("kdtree", |b| {
        b.iter(|| black_box(kdtree.begin_intersection(black_box(&query_box))))
    });
    group.bench_function("quadtree", |b| {
        b.iter(|| black_box(quadtree.begin_intersection(black_box(&query_box))))
    });
    group.bench_function("rtree", |b| {
        b.iter(|| black_box(rtree.begin_intersection(black_box(&query_box))))
    });
    group.bench_function("rstartree", |b| {
        b.iter(|| black_box(rstartree.begin_intersection(black_box(&query_box))))
    });

    group.finish();
}

/// k-nearest-neighbour query throughput per backend.
fn bench_nearest_query(c: &mut Criterion) {
    let points = random_points(N_POINTS, DIM, SEED);
    let reference = Point::new(vec![50.0; DIM]);
    const K: usize = 10;

    let linear: LinearIndex<f64, u64> = fill(&points);
    let kdtree: KdTree<f64, u64> = fill(&points);
    let quadtree: QuadTree<f64, u64> = fill(&points);
    let rtree: RTree<f64, u64> = fill(&points);
    let rstartree: RStarTree<f64, u64> = fill(&points);

    let mut group = c.benchmark_group("nearest_query_throughput");
    group.throughput(Throughput::Elements(N_POINTS as u64));

    group.bench_function("linear", |b| {
        b.iter(|| black_box(linear.begin_nearest(black_box(reference.clone()), K)))
    });
    group.bench_function("kdtree", |b| {
        b.iter(|| black_box(kdtree.begin_nearest(black_box(reference.clone()), K)))
    });
    group.bench_function("quadtree", |b| {
        b.iter(|| black_box(quadtree.begin_nearest(black_box(reference.clone()), K)))
    });
    group.bench_function("rtree", |b| {
        b.iter(|| black_box(rtree.begin_nearest(black_box(reference.clone()), K)))
    });
    group.bench_function("rstartree", |b| {
        b.iter(|| black_box(rstartree.begin_nearest(black_box(reference.clone()), K)))
    });

    group.finish();
}

/// Monte-Carlo hypervolume sampling cost as a function of sample count.
/// Exact HSO is exponential in front size; this tracks the sampling
/// alternative's near-linear scaling instead.
fn bench_hypervolume_monte_carlo(c: &mut Criterion) {
    let mut front: Front<f64, u64, LinearIndex<f64, u64>> =
        Front::new(LinearIndex::new(3), vec![Direction::Minimize; 3]);
    for p in random_points(200, 3, SEED) {
        let _ = front.insert(Value::new(p, 0));
    }
    let reference = Point::new(vec![200.0, 200.0, 200.0]);

    let mut group = c.benchmark_group("hypervolume_monte_carlo");
    for samples in [1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(samples as u64));
        group.bench_with_input(BenchmarkId::from_parameter(samples), &samples, |b, &n| {
            b.iter(|| black_box(front.hypervolume_monte_carlo(black_box(&reference), n, SEED)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_range_query,
    bench_nearest_query,
    bench_hypervolume_monte_carlo,
);
criterion_main!(benches);
