//! Integration tests for trueno-multibfs
//!
//! End-to-end runs on the CPU device: layouts, timing, write-back, overflow
//! handling and input validation.

use trueno_multibfs::storage::load_directory;
use trueno_multibfs::{
    verify_bfs_tree, BoundBatch, CpuDevice, CsrHostData, GraphError, Kernel, LayoutKind,
    MultiBfsError, MultiGraphBfs, NodeId, RunConfig, UNVISITED,
};

const U: u32 = UNVISITED;

/// Undirected path 0 - 1 - ... - (n-1)
fn path(n: u32) -> CsrHostData {
    let edges: Vec<_> = (0..n - 1)
        .flat_map(|i| [(NodeId(i), NodeId(i + 1)), (NodeId(i + 1), NodeId(i))])
        .collect();
    CsrHostData::from_edge_list(n as usize, &edges).unwrap()
}

/// Hub 0 with directed edges to `leaves` nodes
fn star(leaves: u32) -> CsrHostData {
    let edges: Vec<_> = (1..=leaves).map(|i| (NodeId(0), NodeId(i))).collect();
    CsrHostData::from_edge_list(leaves as usize + 1, &edges).unwrap()
}

fn device() -> CpuDevice {
    CpuDevice::with_threads(4).unwrap()
}

#[tokio::test]
async fn test_single_path_graph() {
    let device = device();

    for layout in LayoutKind::ALL {
        let mut graphs = vec![path(5)];
        let config = RunConfig::new().with_layout(layout);
        MultiGraphBfs::new(&device, config)
            .run(&mut graphs, &[NodeId(0)])
            .await
            .unwrap();

        assert_eq!(graphs[0].distances(), &[0, 1, 2, 3, 4]);
        assert_eq!(graphs[0].parents(), &[0, 0, 1, 2, 3]);
    }
}

#[tokio::test]
async fn test_disconnected_pair() {
    let device = device();

    for layout in LayoutKind::ALL {
        // 0 -> 1, plus an isolated node 2
        let mut graphs = vec![CsrHostData::new(vec![0, 1, 1, 1], vec![1]).unwrap()];
        MultiGraphBfs::new(&device, RunConfig::new().with_layout(layout))
            .run(&mut graphs, &[NodeId(0)])
            .await
            .unwrap();

        assert_eq!(graphs[0].distances(), &[0, 1, U]);
        assert_eq!(graphs[0].parents(), &[0, 0, U]);
        assert!(!graphs[0].is_reachable(NodeId(2)));
    }
}

#[tokio::test]
async fn test_batch_matches_individual_runs() {
    let device = device();
    let batch = || {
        vec![
            path(6),
            star(10),
            CsrHostData::new(vec![0, 1, 1, 1], vec![1]).unwrap(),
            path(1),
            path(40),
        ]
    };
    let sources = [NodeId(3), NodeId(0), NodeId(2), NodeId(0), NodeId(17)];

    for layout in LayoutKind::ALL {
        let config = RunConfig::new().with_layout(layout).with_work_group_size(16);

        let mut together = batch();
        MultiGraphBfs::new(&device, config)
            .run(&mut together, &sources)
            .await
            .unwrap();

        for (g, source) in sources.iter().enumerate() {
            let mut alone = vec![batch().swap_remove(g)];
            MultiGraphBfs::new(&device, config)
                .run(&mut alone, &[*source])
                .await
                .unwrap();
            assert_eq!(together[g].distances(), alone[0].distances(), "graph {g}");
            verify_bfs_tree(&together[g], *source, together[g].distances(), together[g].parents())
                .unwrap();
        }
    }
}

#[tokio::test]
async fn test_layouts_agree_on_distances() {
    let device = device();
    let batch = || vec![path(9), star(7), path(2)];
    let sources = [NodeId(4), NodeId(0), NodeId(1)];

    let mut vectorized = batch();
    let mut compressed = batch();
    let bfs = |layout| MultiGraphBfs::new(&device, RunConfig::new().with_layout(layout));
    bfs(LayoutKind::Vectorized).run(&mut vectorized, &sources).await.unwrap();
    bfs(LayoutKind::Compressed).run(&mut compressed, &sources).await.unwrap();

    // Every node here has a single shortest-path predecessor
    for (v, c) in vectorized.iter().zip(&compressed) {
        assert_eq!(v.distances(), c.distances());
        assert_eq!(v.parents(), c.parents());
    }
}

#[tokio::test]
async fn test_timing_sanity() {
    let device = device();
    let mut graphs = vec![path(200), star(100), path(50)];

    let time = MultiGraphBfs::new(&device, RunConfig::default())
        .run(&mut graphs, &[NodeId(0), NodeId(0), NodeId(0)])
        .await
        .unwrap();

    assert!(time.kernel_time_us >= 0.0);
    assert!(time.kernel_time_us <= time.total_time_us);
}

#[tokio::test]
async fn test_no_write_back_leaves_inputs() {
    let device = device();
    let mut graphs = vec![path(4), star(3)];

    MultiGraphBfs::new(&device, RunConfig::new().with_write_back(false))
        .run(&mut graphs, &[NodeId(0), NodeId(0)])
        .await
        .unwrap();

    for graph in &graphs {
        assert!(graph.distances().iter().all(|&d| d == U));
        assert!(graph.parents().iter().all(|&p| p == U));
    }
}

#[tokio::test]
async fn test_write_back_is_idempotent() {
    let device = device();

    for layout in LayoutKind::ALL {
        let mut graphs = vec![path(5), star(4)];
        let mut batch =
            BoundBatch::bind(&device, &mut graphs, &[NodeId(2), NodeId(0)], layout, 8).unwrap();
        batch.launch(Kernel::Init).unwrap();
        batch.launch(Kernel::FrontierBfs).unwrap();

        batch.write_back().await.unwrap();
        let first = batch.graphs().to_vec();

        batch.write_back().await.unwrap();
        assert_eq!(batch.graphs(), first.as_slice());
        drop(batch);

        assert_eq!(graphs[0].distances(), &[2, 1, 0, 1, 2]);
        assert_eq!(graphs[0].parents(), &[1, 2, 2, 2, 3]);
        assert_eq!(graphs[1].distances(), &[0, 1, 1, 1, 1]);
    }
}

#[tokio::test]
async fn test_rerun_after_reset() {
    let device = device();
    let mut graphs = vec![path(4)];
    let bfs = MultiGraphBfs::new(&device, RunConfig::default());

    bfs.run(&mut graphs, &[NodeId(0)]).await.unwrap();
    assert_eq!(graphs[0].distances(), &[0, 1, 2, 3]);

    graphs[0].reset_results();
    bfs.run(&mut graphs, &[NodeId(3)]).await.unwrap();
    assert_eq!(graphs[0].distances(), &[3, 2, 1, 0]);
    assert_eq!(graphs[0].parents(), &[1, 2, 3, 3]);
}

#[tokio::test]
async fn test_frontier_precheck() {
    let device = device();
    let mut graphs = vec![path(3), star(10)];

    let err = MultiGraphBfs::new(&device, RunConfig::new().with_work_group_size(8))
        .run(&mut graphs, &[NodeId(0), NodeId(0)])
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<GraphError>(),
        Some(&GraphError::FrontierTooWide {
            graph: 1,
            level: 1,
            width: 10,
            capacity: 8
        })
    );
    // Nothing ran, nothing was written
    assert!(graphs[0].distances().iter().all(|&d| d == U));
}

#[tokio::test]
async fn test_device_overflow_detection() {
    let device = device();

    for layout in LayoutKind::ALL {
        let mut graphs = vec![path(3), star(10)];
        let config = RunConfig::new()
            .with_layout(layout)
            .with_work_group_size(8)
            .with_frontier_check(false);

        let err = MultiGraphBfs::new(&device, config)
            .run(&mut graphs, &[NodeId(0), NodeId(0)])
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<MultiBfsError>(),
            Some(&MultiBfsError::FrontierOverflow {
                graph: 1,
                produced: 10,
                capacity: 8
            })
        );
    }
}

#[tokio::test]
async fn test_exact_capacity_fits() {
    let device = device();
    let mut graphs = vec![star(8)];

    MultiGraphBfs::new(&device, RunConfig::new().with_work_group_size(8))
        .run(&mut graphs, &[NodeId(0)])
        .await
        .unwrap();

    assert_eq!(graphs[0].distances(), &[0, 1, 1, 1, 1, 1, 1, 1, 1]);
    assert!(graphs[0].parents()[1..].iter().all(|&p| p == 0));
}

#[tokio::test]
async fn test_input_errors() {
    let device = device();
    let bfs = MultiGraphBfs::new(&device, RunConfig::default());

    let mut graphs = vec![path(3), path(2)];
    let err = bfs.run(&mut graphs, &[NodeId(0)]).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<GraphError>(),
        Some(&GraphError::SourceCountMismatch {
            expected: 2,
            got: 1
        })
    );

    let err = bfs
        .run(&mut graphs, &[NodeId(0), NodeId(2)])
        .await
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<GraphError>(),
        Some(&GraphError::SourceOutOfRange {
            graph: 1,
            source_node: 2,
            num_nodes: 2
        })
    );

    let mut empty: Vec<CsrHostData> = Vec::new();
    let err = bfs.run(&mut empty, &[]).await.unwrap_err();
    assert_eq!(err.downcast_ref::<GraphError>(), Some(&GraphError::EmptyBatch));

    let mut with_empty = vec![path(2), CsrHostData::new(vec![0], vec![]).unwrap()];
    let err = bfs
        .run(&mut with_empty, &[NodeId(0), NodeId(0)])
        .await
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<GraphError>(),
        Some(&GraphError::EmptyGraph { graph: 1 })
    );
}

#[tokio::test]
async fn test_directory_batch_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "0 1\n1 2\n2 3\n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "# triangle\nnodes 4\n0 1\n1 2\n2 0\n").unwrap();

    let loaded = load_directory(dir.path()).await.unwrap();
    let mut graphs: Vec<CsrHostData> = loaded.into_iter().map(|(_, graph)| graph).collect();
    let sources = vec![NodeId(0); graphs.len()];

    MultiGraphBfs::new(&device(), RunConfig::default())
        .run(&mut graphs, &sources)
        .await
        .unwrap();

    assert_eq!(graphs[0].distances(), &[0, 1, 2, 3]);
    assert_eq!(graphs[1].distances(), &[0, 1, 2, U]);
}
