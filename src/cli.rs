use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::{fields::Field, rewrite::Exclusion};

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext
{
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "fics")]
#[command(about = "Streaming aggregation over zstd-compressed fanfiction metadata corpora")]
#[command(version, long_about = None)]
pub struct Cli
{
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// List the corpus files that would be read, then stop
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log at info level (FICSTREAM_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli
{
    pub fn context(&self) -> AppContext
    {
        AppContext { quiet: self.quiet, no_color: self.no_color, dry_run: self.dry_run }
    }
}

#[derive(Subcommand)]
pub enum Commands
{
    /// Count every token of one metadata field
    Count(CountArgs),

    /// Bind entities (characters, relationships) to their home groups
    Entities(EntitiesArgs),

    /// Build a co-occurrence table over one field
    Cooccur(CooccurArgs),

    /// Write a filtered copy of the corpus
    Rewrite(RewriteArgs),

    /// Export a light co-occurrence graph as nodes/edges CSV
    Export(ExportArgs),

    /// Print top groups and their most frequent entities
    Report(ReportArgs),

    /// Initialize a ficstream.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Corpus selection shared by every pass
#[derive(Debug, Args)]
pub struct CorpusArgs
{
    /// Directory holding the compressed corpus files
    pub dir: PathBuf,

    /// Additional glob patterns to skip
    #[arg(short, long)]
    pub ignore: Vec<String>,

    /// Decompressed read size in bytes (config: chunk_size)
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Parser)]
pub struct CountArgs
{
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Process files on all cores, merging results in file order
    #[arg(long)]
    pub parallel: bool,

    /// Field to count
    #[arg(short, long, value_enum, default_value = "fandom")]
    pub field: Field,

    /// Output file path
    #[arg(short, long, default_value = "fandom_counts.jsonl")]
    pub output: PathBuf,
}

#[derive(Debug, Parser)]
pub struct EntitiesArgs
{
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Process files on all cores, merging results in file order
    #[arg(long)]
    pub parallel: bool,

    /// Entity field
    #[arg(short, long, value_enum, default_value = "characters")]
    pub entity: Field,

    /// Group field the entities are homed in
    #[arg(short, long, value_enum, default_value = "fandom")]
    pub group: Field,

    /// Runner-up ratio for a second home group (config: near_tie_ratio)
    #[arg(long)]
    pub ratio: Option<f64>,

    /// Output file path
    #[arg(short, long, default_value = "characters_list.jsonl")]
    pub output: PathBuf,
}

/// How the co-occurrence vocabulary is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CooccurMode
{
    /// Sources from an entity list, partners unrestricted
    Open,

    /// Two passes; both sides above the frequency cutoff
    Mutual,
}

#[derive(Debug, Parser)]
pub struct CooccurArgs
{
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Process files on all cores, merging results in file order
    #[arg(long)]
    pub parallel: bool,

    /// Field whose tokens are paired
    #[arg(short, long, value_enum, default_value = "characters")]
    pub field: Field,

    /// Vocabulary mode
    #[arg(short, long, value_enum, default_value = "mutual")]
    pub mode: CooccurMode,

    /// Entity list supplying the sources (required for --mode open)
    #[arg(long, required_if_eq("mode", "open"))]
    pub sources: Option<PathBuf>,

    /// Keep tokens whose count is strictly above this (config: min_count)
    #[arg(long)]
    pub min_count: Option<u64>,

    /// Output file path
    #[arg(short, long, default_value = "character_cooccurrence.jsonl")]
    pub output: PathBuf,
}

#[derive(Debug, Parser)]
pub struct RewriteArgs
{
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Directory for the rewritten files (names are kept)
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Drop records whose field holds a token, as Key=Token (replaces config rules)
    #[arg(long = "exclude", value_name = "KEY=TOKEN")]
    pub exclude: Vec<Exclusion>,

    /// Remove a top-level field from kept records (replaces config list)
    #[arg(long = "strip", value_name = "FIELD")]
    pub strip: Vec<String>,

    /// zstd level for the output (config: compression_level)
    #[arg(long)]
    pub level: Option<i32>,
}

#[derive(Debug, Parser)]
pub struct ExportArgs
{
    /// Co-occurrence artifact
    pub cooccurrence: PathBuf,

    /// Entity list giving node counts
    #[arg(short, long)]
    pub entities: PathBuf,

    /// Directory for nodes.csv and edges.csv
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Minimum node count (config: export.min_appearances)
    #[arg(long)]
    pub min_appearances: Option<u64>,

    /// Minimum edge weight (config: export.min_edge_weight)
    #[arg(long)]
    pub min_edge_weight: Option<u64>,

    /// Strongest edges each node keeps (config: export.degree_cap)
    #[arg(long)]
    pub degree_cap: Option<usize>,
}

#[derive(Debug, Parser)]
pub struct ReportArgs
{
    /// Group frequency artifact
    #[arg(long, default_value = "fandom_counts.jsonl")]
    pub fandoms: PathBuf,

    /// Entity list
    #[arg(long, default_value = "characters_list.jsonl")]
    pub entities: PathBuf,

    /// Number of top groups
    #[arg(long, default_value = "20")]
    pub top_fandoms: usize,

    /// Entities listed per group
    #[arg(long, default_value = "10")]
    pub top: usize,
}

#[derive(Parser)]
pub struct InitArgs
{
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell
{
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs
{
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

#[cfg(test)]
mod tests
{
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent()
    {
        Cli::command().debug_assert();
    }

    #[test]
    fn parallel_only_on_aggregating_passes()
    {
        for pass in ["count", "entities", "cooccur"]
        {
            assert!(Cli::try_parse_from(["fics", pass, "corpus", "--parallel"]).is_ok(), "{pass}");
        }

        let rewrite = Cli::try_parse_from(["fics", "rewrite", "corpus", "-o", "out", "--parallel"]);
        assert!(rewrite.is_err());
    }

    #[test]
    fn open_mode_requires_sources()
    {
        let err = Cli::try_parse_from(["fics", "cooccur", "corpus", "--mode", "open"]);
        assert!(err.is_err());

        let ok = Cli::try_parse_from([
            "fics",
            "cooccur",
            "corpus",
            "--mode",
            "open",
            "--sources",
            "characters_list.jsonl",
        ]);
        assert!(ok.is_ok());
    }

    #[test]
    fn exclusions_parse_from_flags()
    {
        let cli = Cli::try_parse_from([
            "fics",
            "rewrite",
            "in",
            "-o",
            "out",
            "--exclude",
            "Fandom=Original Work",
        ])
        .unwrap();

        match cli.command
        {
            Commands::Rewrite(args) =>
            {
                assert_eq!(args.exclude[0].key, "Fandom");
                assert_eq!(args.exclude[0].token, "Original Work");
            }
            _ => panic!("expected rewrite"),
        }
    }
}
