//! Property-based tests for trueno-multibfs
//!
//! Verifies layout invariants and BFS results hold for arbitrary batches

use proptest::prelude::*;
use trueno_multibfs::{
    bfs_reference, verify_bfs_tree, CompressedLayout, CpuDevice, CsrHostData, LayoutKind,
    MultiGraphBfs, NodeId, RunConfig,
};

/// Strategy: one graph with 1..=max_nodes nodes and up to max_edges edges
fn prop_graph(max_nodes: u32, max_edges: usize) -> impl Strategy<Value = CsrHostData> {
    (1..=max_nodes).prop_flat_map(move |n| {
        prop::collection::vec((0..n, 0..n), 0..=max_edges).prop_map(move |pairs| {
            let edges: Vec<_> = pairs.into_iter().map(|(s, d)| (NodeId(s), NodeId(d))).collect();
            CsrHostData::from_edge_list(n as usize, &edges).unwrap()
        })
    })
}

/// Strategy: a batch of graphs, each with an in-range source
fn prop_batch() -> impl Strategy<Value = Vec<(CsrHostData, NodeId)>> {
    prop::collection::vec(
        prop_graph(24, 60).prop_flat_map(|graph| {
            let n = graph.num_nodes() as u32;
            (Just(graph), (0..n).prop_map(NodeId))
        }),
        1..6,
    )
}

fn run_cpu(graphs: &mut [CsrHostData], sources: &[NodeId], layout: LayoutKind) {
    let device = CpuDevice::with_threads(2).unwrap();
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    runtime
        .block_on(MultiGraphBfs::new(&device, RunConfig::new().with_layout(layout)).run(graphs, sources))
        .unwrap();
}

// Property: the compressed layout is a faithful concatenation of the batch
proptest! {
    #[test]
    fn prop_compressed_layout_invariants(graphs in prop::collection::vec(prop_graph(20, 40), 1..8)) {
        let layout = CompressedLayout::build(&graphs).unwrap();

        let total_nodes: usize = graphs.iter().map(CsrHostData::num_nodes).sum();
        let total_edges: usize = graphs.iter().map(CsrHostData::num_edges).sum();

        // Invariant 1: table sizes
        prop_assert_eq!(layout.graphs_offsets().len(), graphs.len() + 1);
        prop_assert_eq!(layout.compressed_offsets().len(), total_nodes + 1);
        prop_assert_eq!(layout.compressed_edges().len(), total_edges);
        prop_assert_eq!(*layout.graphs_offsets().last().unwrap() as usize, total_nodes);
        prop_assert_eq!(*layout.compressed_offsets().last().unwrap() as usize, total_edges);

        // Invariant 2: offsets never decrease
        for pair in layout.compressed_offsets().windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }

        // Invariant 3: every node's global edge slice is its local slice
        for (g, graph) in graphs.iter().enumerate() {
            let base = layout.graphs_offsets()[g] as usize;
            prop_assert_eq!(layout.nodes_count()[g] as usize, graph.num_nodes());
            for node in 0..graph.num_nodes() {
                let start = layout.compressed_offsets()[base + node] as usize;
                let end = layout.compressed_offsets()[base + node + 1] as usize;
                prop_assert_eq!(
                    &layout.compressed_edges()[start..end],
                    graph.neighbors(NodeId(node as u32))
                );
            }
        }
    }
}

// Property: device distances equal a sequential BFS, parents form a BFS tree
proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_batch_bfs_matches_reference(batch in prop_batch()) {
        let (mut graphs, sources): (Vec<_>, Vec<_>) = batch.into_iter().unzip();
        run_cpu(&mut graphs, &sources, LayoutKind::Compressed);

        for (graph, &source) in graphs.iter().zip(&sources) {
            let expected = bfs_reference(graph, source);
            prop_assert_eq!(graph.distances(), expected.distances.as_slice());
            prop_assert!(verify_bfs_tree(graph, source, graph.distances(), graph.parents()).is_ok());
        }
    }
}

// Property: both layouts produce identical distances
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_layouts_equivalent(batch in prop_batch()) {
        let (graphs, sources): (Vec<_>, Vec<_>) = batch.into_iter().unzip();
        let mut vectorized = graphs.clone();
        let mut compressed = graphs;

        run_cpu(&mut vectorized, &sources, LayoutKind::Vectorized);
        run_cpu(&mut compressed, &sources, LayoutKind::Compressed);

        for ((v, c), &source) in vectorized.iter().zip(&compressed).zip(&sources) {
            prop_assert_eq!(v.distances(), c.distances());
            prop_assert!(verify_bfs_tree(v, source, v.distances(), v.parents()).is_ok());
        }
    }
}

// Property: running never touches the graph structure
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_structure_untouched(batch in prop_batch()) {
        let (graphs, sources): (Vec<_>, Vec<_>) = batch.into_iter().unzip();
        let mut ran = graphs.clone();
        run_cpu(&mut ran, &sources, LayoutKind::Vectorized);

        for (before, after) in graphs.iter().zip(&ran) {
            prop_assert_eq!(before.offsets(), after.offsets());
            prop_assert_eq!(before.edges(), after.edges());
        }
    }
}
