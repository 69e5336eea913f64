//! Graph file loading
//!
//! # Format
//!
//! Plain-text edge lists, one directed edge per line:
//!
//! ```text
//! # comment lines start with '#' or '%'
//! nodes 5        # optional header, fixes the node count
//! 0 1
//! 1 2
//! ```
//!
//! Without a `nodes` header the node count is `max id + 1`.

use super::{CsrHostData, NodeId};
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};

/// Parse an edge-list document into a graph
///
/// # Errors
///
/// Returns error on malformed lines, ids that exceed the declared node
/// count, or an input with neither edges nor a `nodes` header.
pub fn parse_edge_list(text: &str) -> Result<CsrHostData> {
    let mut declared: Option<usize> = None;
    let mut edges = Vec::new();

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.split(&['#', '%'][..]).next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let first = fields.next().unwrap_or_default();

        if first == "nodes" {
            let count = fields
                .next()
                .ok_or_else(|| anyhow!("line {}: `nodes` header without a count", lineno + 1))?;
            declared = Some(
                count
                    .parse()
                    .with_context(|| format!("line {}: invalid node count {count:?}", lineno + 1))?,
            );
            if fields.next().is_some() {
                bail!("line {}: trailing fields in {line:?}", lineno + 1);
            }
            continue;
        }

        let second = fields
            .next()
            .ok_or_else(|| anyhow!("line {}: expected `src dst`, got {line:?}", lineno + 1))?;
        if fields.next().is_some() {
            bail!("line {}: trailing fields in {line:?}", lineno + 1);
        }

        let src: u32 = first
            .parse()
            .with_context(|| format!("line {}: invalid node id {first:?}", lineno + 1))?;
        let dst: u32 = second
            .parse()
            .with_context(|| format!("line {}: invalid node id {second:?}", lineno + 1))?;
        edges.push((NodeId(src), NodeId(dst)));
    }

    let inferred = edges
        .iter()
        .flat_map(|(src, dst)| [src.0, dst.0])
        .max()
        .map(|max| max as usize + 1);

    let num_nodes = match (declared, inferred) {
        (Some(n), _) | (None, Some(n)) => n,
        (None, None) => bail!("graph has no edges and no `nodes` header"),
    };

    Ok(CsrHostData::from_edge_list(num_nodes, &edges)?)
}

/// Load one graph file
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed.
pub async fn load_graph<P: AsRef<Path>>(path: P) -> Result<CsrHostData> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read graph file {}", path.display()))?;

    let graph = parse_edge_list(&text)
        .with_context(|| format!("failed to parse graph file {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        "loaded graph"
    );
    Ok(graph)
}

/// List the regular files of a directory, sorted by path
///
/// # Errors
///
/// Returns error if the directory cannot be read.
pub async fn list_graph_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load every graph file of a directory (sorted by path)
///
/// # Errors
///
/// Returns error if the directory cannot be read or any file fails to parse.
pub async fn load_directory<P: AsRef<Path>>(dir: P) -> Result<Vec<(PathBuf, CsrHostData)>> {
    let mut graphs = Vec::new();
    for path in list_graph_files(dir).await? {
        let graph = load_graph(&path).await?;
        graphs.push((path, graph));
    }
    Ok(graphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let graph = parse_edge_list("0 1\n1 2\n").unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.offsets(), &[0, 1, 2, 2]);
        assert_eq!(graph.edges(), &[1, 2]);
    }

    #[test]
    fn test_parse_header_and_comments() {
        let text = "# path graph\nnodes 5\n0 1 # first edge\n% matrix-market style comment\n\n1 2\n";
        let graph = parse_edge_list(text).unwrap();
        assert_eq!(graph.num_nodes(), 5);
        assert_eq!(graph.num_edges(), 2);
    }

    #[test]
    fn test_parse_header_only() {
        let graph = parse_edge_list("nodes 3\n").unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.num_edges(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_edge_list("0 x\n").is_err());
        assert!(parse_edge_list("0\n").is_err());
        assert!(parse_edge_list("0 1 2\n").is_err());
        assert!(parse_edge_list("nodes\n").is_err());
    }

    #[test]
    fn test_parse_rejects_header_trailing_fields() {
        let err = parse_edge_list("nodes 4 extra
0 1
").unwrap_err();
        assert!(err.to_string().contains("trailing fields"));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(parse_edge_list("# nothing here\n").is_err());
    }

    #[test]
    fn test_parse_rejects_id_beyond_header() {
        let err = parse_edge_list("nodes 2\n0 5\n").unwrap_err();
        assert!(err.downcast_ref::<crate::GraphError>().is_some());
    }

    #[tokio::test]
    async fn test_load_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "0 1\n").await.unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "0 1\n1 2\n").await.unwrap();
        tokio::fs::create_dir(dir.path().join("nested")).await.unwrap();

        let graphs = load_directory(dir.path()).await.unwrap();

        assert_eq!(graphs.len(), 2);
        assert!(graphs[0].0.ends_with("a.txt"));
        assert_eq!(graphs[0].1.num_nodes(), 3);
        assert_eq!(graphs[1].1.num_nodes(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_graph(dir.path().join("missing.txt")).await.unwrap_err();
        assert!(err.to_string().contains("failed to read graph file"));
    }
}
