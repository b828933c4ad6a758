//! Filepath: src/core/export.rs
//! Light co-occurrence graph for Gephi-style tools.
//!
//! Pipeline: popular nodes (count >= min_appearances) -> edges with
//! weight >= min_edge_weight between popular nodes -> per-node degree
//! cap (union of each node's top-K edges) -> nodes/edges CSV.

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

use anyhow::{Context, Result};
use petgraph::graphmap::UnGraphMap;
use serde::Serialize;
use tracing::info;

use crate::core::{artifact::CooccurRow, select::cap_degree};

/// Export failures
#[derive(Debug, thiserror::Error)]
pub enum ExportError
{
    #[error(
        "graph is empty after filtering (min_appearances={min_appearances}, \
         min_edge_weight={min_edge_weight}); relax the thresholds and retry"
    )]
    EmptyGraph
    {
        min_appearances: u64,
        min_edge_weight: u64,
    },
}

/// Export thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphFilter
{
    /// Node kept when its count >= this
    pub min_appearances: u64,

    /// Edge kept when its weight >= this
    pub min_edge_weight: u64,

    /// Strongest edges each node may nominate
    pub degree_cap: usize,
}

/// Undirected weighted graph borrowing names from the loaded rows
pub type LightGraph<'a> = UnGraphMap<&'a str, u64>;

/// Build the filtered, degree-capped graph.
///
/// `counts` gives each node's appearance count. When both directions
/// of an edge are present, the first one seen sets the weight.
pub fn build_graph<'a>(
    rows: &'a [CooccurRow],
    counts: &HashMap<&'a str, u64>,
    filter: GraphFilter,
) -> Result<LightGraph<'a>, ExportError>
{
    let popular = |name: &str| {
        counts
            .get(name)
            .is_some_and(|n| *n >= filter.min_appearances)
    };

    let mut graph = LightGraph::new();

    for row in rows
    {
        let source = row.name.as_str();
        if !popular(source)
        {
            continue;
        }

        for (target, weight) in &row.co_occurs_with
        {
            let target = target.as_str();
            if *weight < filter.min_edge_weight || !popular(target) || target == source
            {
                continue;
            }

            if !graph.contains_edge(source, target)
            {
                graph.add_edge(source, target, *weight);
            }
        }
    }

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph after weight and popularity filters"
    );

    let graph = cap_graph_degree(&graph, filter.degree_cap);

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        cap = filter.degree_cap,
        "graph after degree cap"
    );

    if graph.edge_count() == 0
    {
        return Err(ExportError::EmptyGraph {
            min_appearances: filter.min_appearances,
            min_edge_weight: filter.min_edge_weight,
        });
    }

    Ok(graph)
}

/// Keep the union of every node's `k` strongest incident edges.
pub fn cap_graph_degree<'a>(
    graph: &LightGraph<'a>,
    k: usize,
) -> LightGraph<'a>
{
    let mut keep: BTreeSet<(&str, &str)> = BTreeSet::new();

    for node in graph.nodes()
    {
        let incident = graph
            .edges(node)
            .map(|(_, other, w)| (other, *w));

        for (other, _) in cap_degree(incident, k)
        {
            keep.insert(ordered(node, other));
        }
    }

    let mut capped = LightGraph::new();
    for (a, b) in keep
    {
        if let Some(w) = graph.edge_weight(a, b)
        {
            capped.add_edge(a, b, *w);
        }
    }
    capped
}

fn ordered<'a>(
    a: &'a str,
    b: &'a str,
) -> (&'a str, &'a str)
{
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Serialize)]
struct NodeRecord<'a>
{
    id: &'a str,
    label: &'a str,
    count: u64,
}

#[derive(Debug, Serialize)]
struct EdgeRecord<'a>
{
    #[serde(rename = "Source")]
    source: &'a str,

    #[serde(rename = "Target")]
    target: &'a str,

    #[serde(rename = "Weight")]
    weight: u64,
}

/// Sizes of a written graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats
{
    pub nodes: usize,
    pub edges: usize,
}

/// Write `nodes.csv` (id,label,count; count desc then name) and
/// `edges.csv` (Source,Target,Weight; sorted by endpoints).
pub fn write_csv(
    graph: &LightGraph<'_>,
    counts: &HashMap<&str, u64>,
    nodes_path: &Path,
    edges_path: &Path,
) -> Result<GraphStats>
{
    for p in [nodes_path, edges_path]
    {
        if let Some(dir) = p
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }

    // Nodes, heaviest first
    let mut nodes: Vec<(&str, u64)> = graph
        .nodes()
        .map(|n| (n, counts.get(n).copied().unwrap_or(0)))
        .collect();
    nodes.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| a.0.cmp(b.0))
    });

    let mut w = csv::Writer::from_path(nodes_path)
        .with_context(|| format!("Failed to create {}", nodes_path.display()))?;
    for (name, count) in &nodes
    {
        w.serialize(NodeRecord { id: *name, label: *name, count: *count })?;
    }
    w.flush()?;

    // Edges, by endpoints
    let mut edges: Vec<(&str, &str, u64)> = graph
        .all_edges()
        .map(|(a, b, w)| {
            let (a, b) = ordered(a, b);
            (a, b, *w)
        })
        .collect();
    edges.sort_unstable();

    let mut w = csv::Writer::from_path(edges_path)
        .with_context(|| format!("Failed to create {}", edges_path.display()))?;
    for (source, target, weight) in &edges
    {
        w.serialize(EdgeRecord { source: *source, target: *target, weight: *weight })?;
    }
    w.flush()?;

    Ok(GraphStats { nodes: nodes.len(), edges: edges.len() })
}
