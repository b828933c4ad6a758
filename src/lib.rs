//! **ficstream** - Streaming aggregation over zstd-compressed JSONL corpora
//!
//! One bounded-memory pass per question: tag frequencies, entity-to-group
//! binding, co-occurrence tables, filtered corpus rewrites. Results land
//! as JSONL artifacts that the export and report commands read back.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Aggregation engine - streaming reader, accumulators, selection, rewrite
pub mod core {
    /// Metadata field names and the comma split/trim rule
    pub mod fields;
    pub use fields::{Field, split_tokens};

    /// One decoded JSON line and its tagged skip outcome
    pub mod record;
    pub use record::{Decoded, Record, SkipReason};

    /// Chunked line reassembly over zstd streams
    pub mod stream;
    pub use stream::{Corpus, LineSplitter, PassSummary};

    /// Token -> count with a count-ordered snapshot
    pub mod freq;
    pub use freq::FrequencyTable;

    /// Nested counts and within-record pair accumulation
    pub mod cooccur;
    pub use cooccur::{CooccurrenceTable, NestedCounts};

    /// Thresholds, degree caps, near-tie home selection
    pub mod select;
    pub use select::{NearTie, Vocabulary};

    /// Record transforms and the compressed corpus rewriter
    pub mod rewrite;
    pub use rewrite::{RecordTransform, RewritePolicy, RewriteStats};

    /// JSONL artifact row shapes
    pub mod artifact;

    /// Pass drivers (sequential or per-file on rayon)
    pub mod pipeline;

    /// Light co-occurrence graph as nodes/edges CSV
    pub mod export;

    /// Tabled console report over artifacts
    pub mod report;
}

/// Command handlers wiring config, discovery and output around the engine
pub mod cli_ext {
    /// count, entities, cooccur, rewrite
    pub mod corpus_cmd;
    pub use corpus_cmd::{cooccur_run, count_run, entities_run, rewrite_run};

    /// export, report
    pub mod artifact_cmd;
    pub use artifact_cmd::{export_run, report_run};
}

/// Infrastructure - Configuration, discovery, artifact I/O, logging
pub mod infra {
    /// Layered configuration (file + FICSTREAM_ env)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Atomic JSONL writes and tolerant reads
    pub mod io;
    pub use io::{JsonlWriter, read_jsonl};

    /// Corpus file discovery
    pub mod walk;
    pub use walk::{CorpusError, CorpusWalker};

    /// tracing-subscriber setup
    pub mod logging;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use cli_ext::{cooccur_run, count_run, entities_run, export_run, report_run, rewrite_run};
pub use infra::{Config, CorpusWalker, load_config};
