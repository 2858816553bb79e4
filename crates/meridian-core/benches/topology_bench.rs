//! Benchmarks for topology construction.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use meridian_common::EntityTypeId;
use meridian_core::{
    CondensedTypeIdMap, DegreeOrder, EdgeShuffleTopology, EdgeSortKind, EdgeTypeAwareTopology,
    LpgGraph, LpgGraphBuilder, ProjectedTopology, ShuffleTopology, TransposeKind,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded random graph with `edges_per_node` out-edges per node, 4 node
/// types and 8 edge types.
fn random_graph(num_nodes: u32, edges_per_node: u32) -> LpgGraph {
    let mut builder = LpgGraphBuilder::new(num_nodes as usize);
    let mut rng = StdRng::seed_from_u64(42);
    for node in 0..num_nodes {
        builder.set_node_type(node, EntityTypeId::new(1 + (node % 4) as u8));
        for _ in 0..edges_per_node {
            let dst = rng.random_range(0..num_nodes);
            let ty = EntityTypeId::new(rng.random_range(1..=8));
            builder.add_edge(node, dst, ty);
        }
    }
    builder.build().unwrap()
}

fn bench_transpose(c: &mut Criterion) {
    let mut group = c.benchmark_group("transpose");
    for num_nodes in [10_000u32, 100_000] {
        let graph = random_graph(num_nodes, 8);
        group.bench_with_input(BenchmarkId::from_parameter(num_nodes), &graph, |b, graph| {
            b.iter(|| black_box(EdgeShuffleTopology::make_transpose_copy(graph)));
        });
    }
    group.finish();
}

fn bench_edge_sorts(c: &mut Criterion) {
    let graph = random_graph(100_000, 8);
    let mut group = c.benchmark_group("edge_sort");
    for sort in [EdgeSortKind::ByDestId, EdgeSortKind::ByEdgeType] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{sort:?}")), &sort, |b, &sort| {
            b.iter(|| {
                black_box(EdgeShuffleTopology::make(&graph, TransposeKind::No, sort).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_degree_sort(c: &mut Criterion) {
    let graph = random_graph(100_000, 8);
    let seed = EdgeShuffleTopology::make_original_copy(&graph);
    c.bench_function("shuffle_sorted_by_degree", |b| {
        b.iter(|| {
            black_box(ShuffleTopology::make_sorted_by_degree(
                &graph,
                &seed,
                DegreeOrder::Descending,
                EdgeSortKind::ByDestId,
            ))
        });
    });
}

fn bench_edge_type_aware(c: &mut Criterion) {
    let graph = random_graph(100_000, 8);
    let map = CondensedTypeIdMap::make_from_edge_types(&graph);
    let seed = EdgeShuffleTopology::make(&graph, TransposeKind::No, EdgeSortKind::ByEdgeType)
        .unwrap();
    c.bench_function("edge_type_aware_index", |b| {
        b.iter(|| black_box(EdgeTypeAwareTopology::make(&graph, seed.clone(), &map).unwrap()));
    });
}

fn bench_projection(c: &mut Criterion) {
    let graph = random_graph(100_000, 8);
    let node_types = [EntityTypeId::new(1), EntityTypeId::new(2)];
    let edge_types = [EntityTypeId::new(3)];
    c.bench_function("projection_half_nodes", |b| {
        b.iter(|| black_box(ProjectedTopology::make_from_type_ids(&graph, &node_types, &[])));
    });
    c.bench_function("projection_one_edge_type", |b| {
        b.iter(|| {
            black_box(ProjectedTopology::make_from_type_ids(&graph, &node_types, &edge_types))
        });
    });
}

criterion_group!(
    benches,
    bench_transpose,
    bench_edge_sorts,
    bench_degree_sort,
    bench_edge_type_aware,
    bench_projection,
);
criterion_main!(benches);
