//! Benchmarks for sculpting operations.

use criterion::{criterion_group, criterion_main, Criterion};
use chisel::algo::centroid_scan;
use chisel::mesh::primitives;
use chisel::prelude::*;
use nalgebra::Point3;

fn query_centers(count: usize) -> Vec<Point3<f32>> {
    (0..count)
        .map(|i| {
            let f = i as f32;
            Point3::new((f * 0.37).sin(), (f * 0.61).cos(), (f * 0.13).sin())
        })
        .collect()
}

fn bench_index_build(c: &mut Criterion) {
    let mesh = primitives::uv_sphere("ball", 128, 256, 1.0);

    c.bench_function("index_build_sphere_65k", |b| {
        b.iter(|| SpatialIndex::from_mesh(&mesh, &IndexOptions::default()));
    });

    c.bench_function("index_build_sphere_65k_sequential", |b| {
        b.iter(|| SpatialIndex::from_mesh(&mesh, &IndexOptions::default().sequential()));
    });
}

fn bench_queries(c: &mut Criterion) {
    let mesh = primitives::uv_sphere("ball", 128, 256, 1.0);
    let index = SpatialIndex::from_mesh(&mesh, &IndexOptions::default());
    let centers = query_centers(64);

    c.bench_function("query_sphere_indexed", |b| {
        let mut out = Vec::new();
        b.iter(|| {
            let mut hits = 0;
            for center in &centers {
                index.query_sphere_into(center, 0.05, &mut out);
                hits += out.len();
            }
            hits
        });
    });

    c.bench_function("query_sphere_scan", |b| {
        let mut out = Vec::new();
        b.iter(|| {
            let mut hits = 0;
            for center in &centers {
                centroid_scan(index.centroids(), center, 0.05, &mut out);
                hits += out.len();
            }
            hits
        });
    });

    c.bench_function("select_triangles_brute_force", |b| {
        let mut selector = RegionSelector::new();
        b.iter(|| {
            let mut hits = 0;
            for center in &centers {
                hits += selector.select_triangles(&mesh, None, center, 0.05).len();
            }
            hits
        });
    });
}

fn bench_smoothing(c: &mut Criterion) {
    let base = primitives::grid("floor", 200, 0.01);
    let stroke: Vec<Point3<f32>> = (0..32).map(|i| Point3::new(-0.5 + i as f32 * 0.03, 0.0, 0.0)).collect();

    c.bench_function("smooth_stroke_32_samples", |b| {
        b.iter(|| {
            let mut mesh = base.clone();
            for center in &stroke {
                smooth_region(&mut mesh, center, 0.08, &SmoothOptions::default());
            }
            mesh.revision()
        });
    });
}

criterion_group!(benches, bench_index_build, bench_queries, bench_smoothing);
criterion_main!(benches);
