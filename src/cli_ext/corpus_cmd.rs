//! CLI command handlers for corpus passes: count, entities, cooccur,
//! rewrite. Each one resolves config, discovers the corpus, runs the
//! pass behind a progress bar and writes its artifact.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::info;

use crate::{
    cli::{
        AppContext, CooccurArgs, CooccurMode, CorpusArgs, CountArgs, EntitiesArgs, RewriteArgs,
    },
    core::{
        artifact::{cooccur_rows, entity_rows, frequency_rows, load_vocabulary},
        pipeline::{PassOptions, bind_entities, cooccur_mutual, cooccur_open, count_tokens},
        rewrite::{RewritePolicy, RewriteStats, rewrite_corpus},
        select::NearTie,
        stream::{Corpus, PassSummary},
    },
    infra::{
        config::{Config, load_config},
        io::JsonlWriter,
        walk::CorpusWalker,
    },
};

/// Discover the corpus; `None` when this is a dry run.
fn open_corpus(
    args: &CorpusArgs,
    config: &Config,
    ctx: &AppContext,
) -> Result<Option<Corpus>>
{
    // Combine config ignore patterns with CLI args
    let mut ignore_patterns = config
        .ignore_patterns
        .clone();
    ignore_patterns.extend(
        args.ignore
            .iter()
            .cloned(),
    );

    let walker = CorpusWalker::new(&config.corpus_extension, &ignore_patterns)?;
    let files = walker.corpus_files(&args.dir)?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("{}", paint_warn(ctx, "DRY RUN: Would read:"));
            for f in &files
            {
                println!("  {}", f.display());
            }
            println!("  {} file(s)", files.len());
        }
        return Ok(None);
    }

    if files.is_empty()
    {
        tracing::warn!(dir = %args.dir.display(), "no corpus files found");
    }

    let chunk_size = args
        .chunk_size
        .unwrap_or(config.chunk_size)
        .max(1);

    Ok(Some(Corpus::new(files, chunk_size)))
}

/// File-level bar, hidden under --quiet
fn file_bar(
    len: usize,
    ctx: &AppContext,
) -> ProgressBar
{
    if ctx.quiet
    {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

fn pass_options(
    corpus: &Corpus,
    parallel: bool,
    passes: usize,
    ctx: &AppContext,
) -> PassOptions
{
    PassOptions {
        parallel,
        progress: file_bar(
            corpus
                .files()
                .len()
                * passes,
            ctx,
        ),
    }
}

pub(crate) fn paint_ok(
    ctx: &AppContext,
    text: &str,
) -> String
{
    if ctx.no_color { text.to_string() } else { text.green().to_string() }
}

pub(crate) fn paint_warn(
    ctx: &AppContext,
    text: &str,
) -> String
{
    if ctx.no_color { text.to_string() } else { text.yellow().to_string() }
}

fn print_summary(
    ctx: &AppContext,
    summary: &PassSummary,
)
{
    if ctx.quiet
    {
        return;
    }

    println!(
        "{} {} records processed / {} skipped ({} files)",
        paint_ok(ctx, "✓"),
        summary.records,
        summary.skipped,
        summary.files
    );

    if summary.failed_files > 0
    {
        println!(
            "{} {} file(s) failed to decompress fully",
            paint_warn(ctx, "!"),
            summary.failed_files
        );
    }
}

fn print_written(
    ctx: &AppContext,
    rows: usize,
    path: &std::path::Path,
)
{
    if !ctx.quiet
    {
        println!("{} Wrote {} rows to {}", paint_ok(ctx, "✓"), rows, path.display());
    }
}

/// `fics count`
pub fn count_run(
    args: CountArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config()?;
    let Some(corpus) = open_corpus(&args.corpus, &config, ctx)?
    else
    {
        return Ok(());
    };

    let opts = pass_options(&corpus, args.parallel, 1, ctx);
    opts.progress
        .set_message(args.field.key());
    let (freq, summary) = count_tokens(&corpus, args.field, &opts);
    opts.progress
        .finish_and_clear();

    let rows = frequency_rows(&freq);
    JsonlWriter::write_rows(&args.output, &rows)?;

    print_summary(ctx, &summary);
    print_written(ctx, rows.len(), &args.output);
    Ok(())
}

/// `fics entities`
pub fn entities_run(
    args: EntitiesArgs,
    ctx: &AppContext,
) -> Result<()>
{
    if args.entity == args.group
    {
        anyhow::bail!("--entity and --group must name different fields");
    }

    let config = load_config()?;
    let ratio = args
        .ratio
        .unwrap_or(config.near_tie_ratio);
    if !(0.0..=1.0).contains(&ratio)
    {
        anyhow::bail!("near-tie ratio must lie in [0, 1], got {ratio}");
    }

    let Some(corpus) = open_corpus(&args.corpus, &config, ctx)?
    else
    {
        return Ok(());
    };

    let opts = pass_options(&corpus, args.parallel, 1, ctx);
    let (nested, summary) = bind_entities(&corpus, args.entity, args.group, &opts);
    opts.progress
        .finish_and_clear();

    let rows = entity_rows(&nested, NearTie::new(ratio));
    JsonlWriter::write_rows(&args.output, &rows)?;

    print_summary(ctx, &summary);
    print_written(ctx, rows.len(), &args.output);
    Ok(())
}

/// `fics cooccur`
pub fn cooccur_run(
    args: CooccurArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config()?;
    let min = args
        .min_count
        .unwrap_or(config.min_count);

    // Load the source list before touching the corpus
    let sources = match (args.mode, &args.sources)
    {
        (CooccurMode::Open, Some(path)) => Some(
            load_vocabulary(path, min)
                .with_context(|| format!("Failed to load sources from {}", path.display()))?,
        ),
        (CooccurMode::Open, None) => anyhow::bail!("--mode open needs --sources FILE"),
        (CooccurMode::Mutual, _) => None,
    };

    let Some(corpus) = open_corpus(&args.corpus, &config, ctx)?
    else
    {
        return Ok(());
    };

    let (rows, summary) = match sources
    {
        Some(vocab) =>
        {
            info!(sources = vocab.len(), min, "open co-occurrence");
            let opts = pass_options(&corpus, args.parallel, 1, ctx);
            let (table, summary) = cooccur_open(&corpus, args.field, &vocab, &opts);
            opts.progress
                .finish_and_clear();

            (cooccur_rows(&table, vocab.sorted(), &vocab), summary)
        }
        None =>
        {
            let opts = pass_options(&corpus, args.parallel, 2, ctx);
            let m = cooccur_mutual(&corpus, args.field, min, &opts);
            opts.progress
                .finish_and_clear();

            print_summary(ctx, &m.first);
            (cooccur_rows(&m.table, m.table.sources(), &m.vocabulary), m.second)
        }
    };

    JsonlWriter::write_rows(&args.output, &rows)?;

    print_summary(ctx, &summary);
    print_written(ctx, rows.len(), &args.output);
    Ok(())
}

/// `fics rewrite`
pub fn rewrite_run(
    args: RewriteArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config()?;

    // Flags replace the configured lists wholesale
    let mut policy: RewritePolicy = config
        .rewrite
        .policy()?;
    if !args
        .exclude
        .is_empty()
    {
        policy.exclude = args.exclude;
    }
    if !args
        .strip
        .is_empty()
    {
        policy.strip = args.strip;
    }

    let level = args
        .level
        .unwrap_or(config.compression_level);

    let Some(corpus) = open_corpus(&args.corpus, &config, ctx)?
    else
    {
        return Ok(());
    };

    let progress = file_bar(
        corpus
            .files()
            .len(),
        ctx,
    );
    let stats = rewrite_corpus(&corpus, &args.output_dir, level, &policy, &progress)?;
    progress.finish_and_clear();

    print_rewrite(ctx, &stats, &args.output_dir);
    Ok(())
}

fn print_rewrite(
    ctx: &AppContext,
    stats: &RewriteStats,
    out_dir: &std::path::Path,
)
{
    if ctx.quiet
    {
        return;
    }

    println!(
        "{} {} lines read: {} kept / {} dropped / {} malformed",
        paint_ok(ctx, "✓"),
        stats.lines,
        stats.kept,
        stats.dropped,
        stats.malformed
    );
    println!("  {} file(s) written to {}", stats.files, out_dir.display());

    if stats.failed_files > 0
    {
        println!("{} {} file(s) failed", paint_warn(ctx, "!"), stats.failed_files);
    }
}
