//! Filepath: src/core/pipeline.rs
//! Corpus passes that fold records into accumulators.
//!
//! Each driver owns its accumulator for exactly one run. With
//! `parallel` set, every file gets its own accumulator on the rayon
//! pool and the results are merged in file order once all workers
//! are done, which yields the same output as the sequential pass.

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::info;

use crate::core::{
    cooccur::{CooccurrenceTable, NestedCounts},
    fields::Field,
    freq::FrequencyTable,
    record::Record,
    select::Vocabulary,
    stream::{Corpus, PassSummary},
};

/// Accumulators that combine by key-wise addition
pub trait Accumulator: Default + Send
{
    fn merge_from(
        &mut self,
        other: Self,
    );
}

impl Accumulator for FrequencyTable
{
    fn merge_from(
        &mut self,
        other: Self,
    )
    {
        self.merge(other);
    }
}

impl Accumulator for NestedCounts
{
    fn merge_from(
        &mut self,
        other: Self,
    )
    {
        self.merge(other);
    }
}

impl Accumulator for CooccurrenceTable
{
    fn merge_from(
        &mut self,
        other: Self,
    )
    {
        self.merge(other);
    }
}

/// How a pass runs
#[derive(Clone)]
pub struct PassOptions
{
    /// One worker per file, merged afterwards
    pub parallel: bool,

    /// Ticked once per finished file
    pub progress: ProgressBar,
}

impl Default for PassOptions
{
    fn default() -> Self
    {
        Self { parallel: false, progress: ProgressBar::hidden() }
    }
}

/// Fold every record of `corpus` into a fresh `A`.
pub fn fold_corpus<A, F>(
    corpus: &Corpus,
    opts: &PassOptions,
    fold: F,
) -> (A, PassSummary)
where
    A: Accumulator,
    F: Fn(&mut A, &Record) + Sync,
{
    let run_one = |c: &Corpus| {
        let mut acc = A::default();
        let mut records = c
            .records()
            .with_progress(
                opts.progress
                    .clone(),
            );

        for record in &mut records
        {
            fold(&mut acc, &record);
        }

        (acc, records.summary())
    };

    let (acc, summary) = if opts.parallel
    {
        // Collect keeps file order for the merge
        let parts: Vec<(A, PassSummary)> = corpus
            .per_file()
            .par_iter()
            .map(run_one)
            .collect();

        let mut acc = A::default();
        let mut summary = PassSummary::default();
        for (part, s) in parts
        {
            acc.merge_from(part);
            summary.merge(s);
        }
        (acc, summary)
    }
    else
    {
        run_one(corpus)
    };

    info!(
        records = summary.records,
        skipped = summary.skipped,
        files = summary.files,
        failed_files = summary.failed_files,
        "pass finished"
    );

    (acc, summary)
}

/// Frequency of every token of `field`, repeats counted
pub fn count_tokens(
    corpus: &Corpus,
    field: Field,
    opts: &PassOptions,
) -> (FrequencyTable, PassSummary)
{
    fold_corpus(corpus, opts, |acc: &mut FrequencyTable, r| {
        acc.extend(r.tokens(field));
    })
}

/// entity -> group -> count, one increment per (entity, group) token pair
pub fn bind_entities(
    corpus: &Corpus,
    entity: Field,
    group: Field,
    opts: &PassOptions,
) -> (NestedCounts, PassSummary)
{
    fold_corpus(corpus, opts, |acc: &mut NestedCounts, r| {
        let groups = r.tokens(group);

        for e in r.tokens(entity)
        {
            for g in &groups
            {
                acc.add(e, g, 1);
            }
        }
    })
}

/// Pairs whose source is in `sources`; partners unrestricted.
///
/// Every source gets a row, even with no partners.
pub fn cooccur_open(
    corpus: &Corpus,
    field: Field,
    sources: &Vocabulary,
    opts: &PassOptions,
) -> (CooccurrenceTable, PassSummary)
{
    let (mut table, summary) = fold_corpus(corpus, opts, |acc: &mut CooccurrenceTable, r| {
        acc.observe(&r.tokens(field), |a| sources.contains(a), |_| true);
    });

    for s in sources.sorted()
    {
        table.ensure_source(s);
    }

    (table, summary)
}

/// Result of the two-pass mutually restricted build
#[derive(Debug, Clone)]
pub struct MutualCooccurrence
{
    pub table: CooccurrenceTable,

    /// Tokens above the cutoff, with pass-1 counts
    pub vocabulary: Vocabulary,

    /// Pass 1 (frequency) summary
    pub first: PassSummary,

    /// Pass 2 (pairs) summary
    pub second: PassSummary,
}

/// Pass 1 counts `field`; pass 2 pairs only tokens with count > `min`.
pub fn cooccur_mutual(
    corpus: &Corpus,
    field: Field,
    min: u64,
    opts: &PassOptions,
) -> MutualCooccurrence
{
    let (freq, first) = count_tokens(corpus, field, opts);
    let vocabulary = Vocabulary::above(&freq, min);

    info!(kept = vocabulary.len(), min, "vocabulary above cutoff");

    let (table, second) = fold_corpus(corpus, opts, |acc: &mut CooccurrenceTable, r| {
        let admit = |t: &str| vocabulary.contains(t);
        acc.observe(&r.tokens(field), admit, admit);
    });

    MutualCooccurrence { table, vocabulary, first, second }
}
