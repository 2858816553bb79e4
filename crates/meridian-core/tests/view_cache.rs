//! Cache behavior against an in-memory graph and storage backend.

use meridian_common::{EntityTypeId, Error, NodeId, Result};
use meridian_core::{
    EdgeShuffleTopology, EdgeSortKind, LpgGraph, LpgGraphBuilder, MemoryTopologyStorage,
    NodeSortKind, PropertyGraph, ShadowDescriptor, StoredTopology, TopologyConfig, TopologyKind,
    TopologyRecord, TopologyStorage, TopologyView, TopologyViewCache, TransposeKind, ViewContext,
};

fn typed_star() -> LpgGraph {
    let mut builder = LpgGraphBuilder::new(4);
    let a = builder.edge_type("A").unwrap();
    let b = builder.edge_type("B").unwrap();
    builder.add_edge(0, 1, a).add_edge(0, 2, b).add_edge(0, 3, a);
    builder.build().unwrap()
}

fn people() -> LpgGraph {
    let mut builder = LpgGraphBuilder::new(3);
    let person = builder.node_type("Person").unwrap();
    let company = builder.node_type("Company").unwrap();
    let knows = builder.edge_type("KNOWS").unwrap();
    let works = builder.edge_type("WORKS_AT").unwrap();
    builder
        .set_node_type(0, person)
        .set_node_type(1, company)
        .set_node_type(2, person);
    builder
        .add_edge(0, 2, knows)
        .add_edge(0, 1, works)
        .add_edge(2, 1, works)
        .add_edge(1, 0, knows);
    builder.build().unwrap()
}

struct FailingStorage;

impl TopologyStorage for FailingStorage {
    fn load_shadow(&self, _descriptor: &ShadowDescriptor) -> Result<Option<StoredTopology>> {
        Err(Error::Storage("backend unavailable".into()))
    }

    fn store(&self, _topology: StoredTopology) -> Result<()> {
        Err(Error::Storage("backend unavailable".into()))
    }
}

/// Serves one fixed record, bypassing the validation a real backend runs
/// on store.
struct FixedStorage(StoredTopology);

impl TopologyStorage for FixedStorage {
    fn load_shadow(&self, descriptor: &ShadowDescriptor) -> Result<Option<StoredTopology>> {
        Ok(descriptor
            .matches(&self.0.descriptor())
            .then(|| self.0.clone()))
    }

    fn store(&self, _topology: StoredTopology) -> Result<()> {
        Ok(())
    }
}

#[test]
fn edge_type_lookup_returns_matching_edges() {
    let graph = typed_star();
    let a = graph.resolve_edge_type_name("A").unwrap();
    let ctx = ViewContext::new(&graph);
    let mut cache = TopologyViewCache::default();

    let topo = cache
        .build_or_get_edge_type_aware_topo(&ctx, TransposeKind::No)
        .unwrap();
    let mut dests: Vec<NodeId> = topo
        .edges_of_type(0, a)
        .map(|e| topo.out_edge_dst(e))
        .collect();
    dests.sort_unstable();
    assert_eq!(dests, vec![1, 3]);
}

#[test]
fn person_projection_excludes_company_edges() {
    let graph = people();
    let ctx = ViewContext::new(&graph);
    let mut cache = TopologyViewCache::default();

    let projected = cache
        .build_or_get_projected_topo(&ctx, &["Person"], &[])
        .unwrap();
    assert_eq!(projected.num_nodes(), 2);
    assert_eq!(projected.num_edges(), 1);
    assert_eq!(projected.projected_node_id(1), projected.node_sentinel());
    let only = projected.original_edge_id(0);
    assert_eq!(graph.topology().out_edge_dst(only), 2);
}

#[test]
fn reseat_rejected_once_default_is_sorted() {
    let graph = typed_star();
    let ctx = ViewContext::new(&graph);
    let mut cache = TopologyViewCache::default();

    let mut sorted = EdgeShuffleTopology::make_original_copy(&graph);
    sorted.sort_edges_by_dest_id();
    assert!(cache.reseat_default_topo(&ctx, sorted));

    let mut by_type = EdgeShuffleTopology::make_original_copy(&graph);
    by_type.sort_edges_by_type_then_dest(&graph);
    assert!(!cache.reseat_default_topo(&ctx, by_type));
    assert_eq!(
        cache.default_topology(&ctx).edge_sort_state(),
        EdgeSortKind::ByDestId
    );
}

#[test]
fn drop_all_behaves_like_a_fresh_cache() {
    let graph = typed_star();
    let ctx = ViewContext::new(&graph);
    let mut cache = TopologyViewCache::default();

    cache
        .build_or_get_edge_shuffle_topo(&ctx, TransposeKind::Yes, EdgeSortKind::ByDestId)
        .unwrap();
    cache
        .build_or_get_shuffle_topo(
            &ctx,
            TransposeKind::No,
            NodeSortKind::ByDegree,
            EdgeSortKind::Any,
        )
        .unwrap();
    cache.build_or_get_edge_type_map(&ctx);
    cache.build_or_get_projected_topo(&ctx, &[], &["A"]).unwrap();
    let mut sorted = EdgeShuffleTopology::make_original_copy(&graph);
    sorted.sort_edges_by_dest_id();
    assert!(cache.reseat_default_topo(&ctx, sorted));

    cache.drop_all_topologies();
    assert!(cache.is_empty());
    assert_eq!(cache.default_topology(&ctx).edge_sort_state(), EdgeSortKind::Any);

    let builds = cache.stats().builds;
    cache
        .build_or_get_edge_shuffle_topo(&ctx, TransposeKind::Yes, EdgeSortKind::ByDestId)
        .unwrap();
    cache.build_or_get_projected_topo(&ctx, &[], &["A"]).unwrap();
    assert_eq!(cache.stats().builds, builds + 2);
    assert_eq!(cache.len(), 1);
}

#[test]
fn identical_requests_share_one_build() {
    let graph = typed_star();
    let ctx = ViewContext::new(&graph);
    let mut cache = TopologyViewCache::default();

    let first: *const _ = cache
        .build_or_get_shuffle_topo(
            &ctx,
            TransposeKind::Yes,
            NodeSortKind::ByNodeType,
            EdgeSortKind::ByDestId,
        )
        .unwrap();
    let second: *const _ = cache
        .build_or_get_shuffle_topo(
            &ctx,
            TransposeKind::Yes,
            NodeSortKind::ByNodeType,
            EdgeSortKind::ByDestId,
        )
        .unwrap();
    assert!(std::ptr::eq(first, second));
}

#[test]
fn take_moves_entry_out_of_cache() {
    let graph = typed_star();
    let ctx = ViewContext::new(&graph);
    let mut cache = TopologyViewCache::default();

    cache
        .build_or_get_edge_shuffle_topo(&ctx, TransposeKind::No, EdgeSortKind::ByDestId)
        .unwrap();
    let taken = cache
        .take_edge_shuffle_topo(&ctx, TransposeKind::Any, EdgeSortKind::ByDestId)
        .unwrap();
    assert_eq!(taken.edge_sort_state(), EdgeSortKind::ByDestId);
    assert!(cache.is_empty());

    // Nothing cached: the topology is built and handed over uncached.
    let fresh = cache
        .take_edge_shuffle_topo(&ctx, TransposeKind::Yes, EdgeSortKind::Any)
        .unwrap();
    assert!(fresh.is_transposed());
    assert!(cache.is_empty());
}

#[test]
fn storage_hit_skips_build() {
    let graph = typed_star();
    let storage = MemoryTopologyStorage::new();
    {
        let ctx = ViewContext::new(&graph);
        let mut cache = TopologyViewCache::default();
        cache
            .build_or_get_edge_type_aware_topo(&ctx, TransposeKind::Yes)
            .unwrap();
        cache
            .build_or_get_shuffle_topo(
                &ctx,
                TransposeKind::No,
                NodeSortKind::ByDegree,
                EdgeSortKind::ByDestId,
            )
            .unwrap();
        assert_eq!(cache.persist(&storage).unwrap(), 3);
    }

    let ctx = ViewContext::new(&graph).with_storage(&storage);
    let mut cache = TopologyViewCache::default();
    let loaded = cache
        .build_or_get_edge_type_aware_topo(&ctx, TransposeKind::Yes)
        .unwrap();
    assert_eq!(loaded.descriptor(), ShadowDescriptor::edge_type_aware(TransposeKind::Yes));
    cache
        .build_or_get_shuffle_topo(
            &ctx,
            TransposeKind::Any,
            NodeSortKind::ByDegree,
            EdgeSortKind::ByDestId,
        )
        .unwrap();
    assert_eq!(cache.stats().loads, 2);
    assert_eq!(cache.stats().builds, 0);
}

#[test]
fn storage_disabled_by_config() {
    let graph = typed_star();
    let storage = MemoryTopologyStorage::new();
    storage
        .store(EdgeShuffleTopology::make_transpose_copy(&graph).to_stored())
        .unwrap();

    let ctx = ViewContext::new(&graph).with_storage(&storage);
    let mut cache = TopologyViewCache::new(TopologyConfig::default().without_storage_loads());
    cache
        .build_or_get_edge_shuffle_topo(&ctx, TransposeKind::Yes, EdgeSortKind::Any)
        .unwrap();
    assert_eq!(cache.stats().loads, 0);
    assert_eq!(cache.stats().builds, 1);
}

#[test]
fn stale_type_map_falls_back_to_build() {
    let storage = MemoryTopologyStorage::new();
    {
        let graph = typed_star();
        let ctx = ViewContext::new(&graph);
        let mut cache = TopologyViewCache::default();
        cache
            .build_or_get_edge_type_aware_topo(&ctx, TransposeKind::No)
            .unwrap();
        cache.persist(&storage).unwrap();
    }

    // Same shape, but the middle edge now has a third type.
    let mut builder = LpgGraphBuilder::new(4);
    let a = builder.edge_type("A").unwrap();
    builder.edge_type("B").unwrap();
    let c = builder.edge_type("C").unwrap();
    builder.add_edge(0, 1, a).add_edge(0, 2, c).add_edge(0, 3, a);
    let graph = builder.build().unwrap();

    let ctx = ViewContext::new(&graph).with_storage(&storage);
    let mut cache = TopologyViewCache::default();
    let topo = cache
        .build_or_get_edge_type_aware_topo(&ctx, TransposeKind::No)
        .unwrap();
    assert_eq!(topo.out_degree_of_type(0, c), 1);
    assert_eq!(
        topo.type_map().index_to_type(),
        &[EntityTypeId::new(1), EntityTypeId::new(3)]
    );
    assert_eq!(cache.stats().loads, 0);
}

#[test]
fn storage_errors_are_cache_misses() {
    let graph = typed_star();
    let storage = FailingStorage;
    let ctx = ViewContext::new(&graph).with_storage(&storage);
    let mut cache = TopologyViewCache::default();

    let topo = cache
        .build_or_get_edge_shuffle_topo(&ctx, TransposeKind::Yes, EdgeSortKind::ByDestId)
        .unwrap();
    assert_eq!(topo.find_edge(1, 0), Some(0));
    assert_eq!(cache.stats().builds, 1);
    assert!(matches!(cache.persist(&storage), Err(Error::Storage(_))));
}

#[test]
fn corrupt_stored_records_are_cache_misses() {
    let graph = typed_star();
    let desc = ShadowDescriptor::edge_shuffle(TransposeKind::No, EdgeSortKind::ByDestId);

    let mut dest_out_of_range = TopologyRecord::new(desc, vec![3, 3, 3, 3], vec![1, 9, 3]);
    dest_out_of_range.edge_prop_indices = Some(vec![0, 1, 2]);
    let mut prop_out_of_range = TopologyRecord::new(desc, vec![3, 3, 3, 3], vec![1, 2, 3]);
    prop_out_of_range.edge_prop_indices = Some(vec![0, 42, 2]);

    for record in [dest_out_of_range, prop_out_of_range] {
        let storage = FixedStorage(StoredTopology::new(record));
        let ctx = ViewContext::new(&graph).with_storage(&storage);
        let mut cache = TopologyViewCache::default();

        let topo = cache
            .build_or_get_edge_shuffle_topo(&ctx, TransposeKind::No, EdgeSortKind::ByDestId)
            .unwrap();
        assert_eq!(topo.find_edge(0, 2), Some(1));
        assert_eq!(topo.edge_property_index(1), 1);
        assert_eq!(cache.stats().loads, 0);
        assert_eq!(cache.stats().builds, 1);
    }
}

#[test]
fn exported_descriptors_cover_working_set() {
    let graph = typed_star();
    let ctx = ViewContext::new(&graph);
    let mut cache = TopologyViewCache::default();
    cache.default_topology(&ctx);
    cache
        .build_or_get_edge_shuffle_topo(&ctx, TransposeKind::Yes, EdgeSortKind::Any)
        .unwrap();

    let kinds: Vec<(TopologyKind, TransposeKind)> = cache
        .to_stored_topologies()
        .iter()
        .map(|s| (s.descriptor().kind, s.transpose_state()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (TopologyKind::EdgeShuffle, TransposeKind::No),
            (TopologyKind::EdgeShuffle, TransposeKind::Yes),
        ]
    );
}
