//! multi-bfs - batched BFS benchmark
//!
//! Loads a batch of edge-list graphs, runs one BFS per graph from node 0 on
//! the selected device and reports kernel and total time.
//!
//! Examples:
//!   multi-bfs graphs/a.txt graphs/b.txt
//!   multi-bfs -d graphs/ --local 128 --layout vectorized -p
//!   multi-bfs -d graphs/ --backend gpu --verify

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use trueno_multibfs::storage::{load_directory, load_graph};
use trueno_multibfs::{
    verify_bfs_tree, ComputeDevice, CpuDevice, CsrHostData, LayoutKind, MultiGraphBfs, NodeId,
    RunConfig, DEFAULT_WORK_GROUP_SIZE,
};

/// Batched multi-graph breadth-first search
#[derive(Parser)]
#[command(name = "multi-bfs")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Edge-list graph files
    #[arg(value_name = "GRAPH", required_unless_present = "dir")]
    graphs: Vec<PathBuf>,

    /// Load every regular file in this directory (sorted by name)
    #[arg(short = 'd', long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Work-group size (lanes per graph)
    #[arg(short = 'l', long = "local", default_value_t = DEFAULT_WORK_GROUP_SIZE)]
    local: u32,

    /// Aggregate layout: vectorized or compressed
    #[arg(long, default_value_t = LayoutKind::Compressed)]
    layout: LayoutKind,

    /// Compute backend
    #[arg(short, long, value_enum, default_value_t = Backend::Cpu)]
    backend: Backend,

    /// CPU worker threads (0 = one per core)
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Print per-graph distances and parents
    #[arg(short = 'p', long = "print")]
    print: bool,

    /// Skip copying results back to the host
    #[arg(long)]
    no_write_back: bool,

    /// Skip the host-side frontier width check
    #[arg(long)]
    no_frontier_check: bool,

    /// Check every BFS tree against a sequential reference
    #[arg(long)]
    verify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// rayon-emulated workgroups
    Cpu,
    /// wgpu compute shaders (needs the `gpu` feature)
    Gpu,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (names, mut graphs) = load_inputs(&cli).await?;
    if graphs.is_empty() {
        bail!("no graphs to process");
    }
    tracing::info!(graphs = graphs.len(), "graphs loaded");

    let config = RunConfig::new()
        .with_layout(cli.layout)
        .with_work_group_size(cli.local)
        .with_write_back(!cli.no_write_back)
        .with_frontier_check(!cli.no_frontier_check);

    match cli.backend {
        Backend::Cpu => {
            let device = CpuDevice::with_threads(cli.threads)?;
            run(&device, config, &cli, &names, &mut graphs).await
        }
        #[cfg(feature = "gpu")]
        Backend::Gpu => {
            let device = trueno_multibfs::GpuDevice::new().await?;
            run(&device, config, &cli, &names, &mut graphs).await
        }
        #[cfg(not(feature = "gpu"))]
        Backend::Gpu => bail!("built without GPU support (enable the `gpu` feature)"),
    }
}

async fn load_inputs(cli: &Cli) -> Result<(Vec<String>, Vec<CsrHostData>)> {
    let mut names = Vec::new();
    let mut graphs = Vec::new();

    if let Some(dir) = &cli.dir {
        for (path, graph) in load_directory(dir).await? {
            names.push(path.display().to_string());
            graphs.push(graph);
        }
    }
    for path in &cli.graphs {
        graphs.push(load_graph(path).await?);
        names.push(path.display().to_string());
    }

    Ok((names, graphs))
}

async fn run<D: ComputeDevice>(
    device: &D,
    config: RunConfig,
    cli: &Cli,
    names: &[String],
    graphs: &mut [CsrHostData],
) -> Result<()> {
    let sources = vec![NodeId(0); graphs.len()];

    println!("[*] Device: {}", device.describe());
    println!("[*] Graphs: {} ({} layout, {} lanes)", graphs.len(), config.layout, config.work_group_size);

    let time = MultiGraphBfs::new(device, config)
        .run(graphs, &sources)
        .await?;

    println!("[*] Kernels duration: {:.3} us", time.kernel_time_us);
    println!("[*] Total duration: {:.3} us", time.total_time_us);

    if cli.verify {
        if !config.write_back {
            bail!("--verify needs results on the host (drop --no-write-back)");
        }
        for ((name, graph), &source) in names.iter().zip(graphs.iter()).zip(&sources) {
            verify_bfs_tree(graph, source, graph.distances(), graph.parents())
                .with_context(|| format!("verification failed for {name}"))?;
        }
        println!("[*] Verified {} BFS trees", graphs.len());
    }

    if cli.print {
        for (name, graph) in names.iter().zip(graphs.iter()) {
            println!("{name}");
            println!("  node  distance  parent");
            for (node, (&distance, &parent)) in graph.distances().iter().zip(graph.parents()).enumerate() {
                println!("  {node:>4}  {:>8}  {:>6}", show(distance), show(parent));
            }
        }
    }

    Ok(())
}

fn show(value: u32) -> String {
    if value == trueno_multibfs::UNVISITED {
        "-".to_string()
    } else {
        value.to_string()
    }
}
