//! CLI command handlers over finished artifacts: graph export and the
//! console report.

use std::collections::HashMap;

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    cli::{AppContext, ExportArgs, ReportArgs},
    cli_ext::corpus_cmd::{paint_ok, paint_warn},
    core::{
        artifact::{CooccurRow, CountRow, EntityRow},
        export::{GraphFilter, build_graph, write_csv},
        report::Report,
    },
    infra::{config::load_config, io::read_jsonl},
};

/// Entities shown in the global top list
const GLOBAL_TOP: usize = 20;

/// `fics export`
pub fn export_run(
    args: ExportArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config()?;
    let filter = GraphFilter {
        min_appearances: args
            .min_appearances
            .unwrap_or(config.export.min_appearances),
        min_edge_weight: args
            .min_edge_weight
            .unwrap_or(config.export.min_edge_weight),
        degree_cap: args
            .degree_cap
            .unwrap_or(config.export.degree_cap),
    };

    let nodes_path = args
        .output_dir
        .join("nodes.csv");
    let edges_path = args
        .output_dir
        .join("edges.csv");

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("{}", paint_warn(ctx, "DRY RUN: Would export:"));
            println!("  From: {}", args.cooccurrence.display());
            println!("  Nodes: {}", nodes_path.display());
            println!("  Edges: {}", edges_path.display());
            println!("  Filter: {filter:?}");
        }
        return Ok(());
    }

    let entities = read_jsonl::<EntityRow>(&args.entities)?;
    let cooccur = read_jsonl::<CooccurRow>(&args.cooccurrence)?;
    if entities.skipped + cooccur.skipped > 0
    {
        warn!(
            entities = entities.skipped,
            cooccurrence = cooccur.skipped,
            "skipped malformed artifact lines"
        );
    }

    let counts: HashMap<&str, u64> = entities
        .rows
        .iter()
        .map(|e| (e.name.as_str(), e.count))
        .collect();

    info!(rows = cooccur.rows.len(), nodes = counts.len(), "loaded export inputs");

    let graph = build_graph(&cooccur.rows, &counts, filter)?;
    let stats = write_csv(&graph, &counts, &nodes_path, &edges_path)?;

    if !ctx.quiet
    {
        println!(
            "{} Wrote {} nodes to {} and {} edges to {}",
            paint_ok(ctx, "✓"),
            stats.nodes,
            nodes_path.display(),
            stats.edges,
            edges_path.display()
        );
    }
    Ok(())
}

/// `fics report`
pub fn report_run(
    args: ReportArgs,
    ctx: &AppContext,
) -> Result<()>
{
    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("{}", paint_warn(ctx, "DRY RUN: Would report on:"));
            println!("  Groups: {}", args.fandoms.display());
            println!("  Entities: {}", args.entities.display());
        }
        return Ok(());
    }

    let groups = read_jsonl::<CountRow>(&args.fandoms)?.rows;
    let entities = read_jsonl::<EntityRow>(&args.entities)?.rows;

    let report = Report::build(&groups, &entities, args.top_fandoms);
    print!("{}", report.render(GLOBAL_TOP, args.top, !ctx.no_color));
    Ok(())
}
