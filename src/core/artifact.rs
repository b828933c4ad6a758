//! Filepath: src/core/artifact.rs
//! Output row shapes and their builders from finished accumulators.
//!
//! Rows are what later steps (export, report) read back, so the
//! readers accept the older key spellings too (`fandom`, `character`,
//! `relationship`) via serde aliases.

use std::path::Path;

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        cooccur::{CooccurrenceTable, NestedCounts},
        freq::FrequencyTable,
        select::{NearTie, Vocabulary, rank_partners},
    },
    infra::io::read_jsonl,
};

/// `{"id", "name", "count"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow
{
    #[serde(default)]
    pub id: u64,

    #[serde(alias = "fandom", alias = "tag")]
    pub name: String,

    pub count: u64,
}

/// `{"id", "name", "fandom": [home..], "count"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRow
{
    #[serde(default)]
    pub id: u64,

    pub name: String,

    /// One or two home groups (near-tie rule)
    #[serde(default)]
    pub fandom: Vec<String>,

    pub count: u64,
}

/// `{"id", "name", "count", "co_occurs_with": {partner: weight}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooccurRow
{
    #[serde(default)]
    pub id: u64,

    #[serde(alias = "character", alias = "relationship")]
    pub name: String,

    #[serde(default)]
    pub count: u64,

    /// Weight descending, then partner name ascending
    pub co_occurs_with: IndexMap<String, u64>,
}

/// Frequency snapshot as rows, ids in output order
pub fn frequency_rows(table: &FrequencyTable) -> Vec<CountRow>
{
    table
        .snapshot()
        .into_iter()
        .zip(1..)
        .map(|((name, count), id)| CountRow { id, name, count })
        .collect()
}

/// Entity rows in first-seen order with their home groups
pub fn entity_rows(
    counts: &NestedCounts,
    rule: NearTie,
) -> Vec<EntityRow>
{
    counts
        .iter()
        .zip(1..)
        .map(|((name, groups), id)| EntityRow {
            id,
            name: name.to_owned(),
            fandom: rule.select(groups),
            count: groups.total(),
        })
        .collect()
}

/// One row per `sources` entry (sorted by name) whether or not it has
/// partners; `count` comes from the vocabulary.
pub fn cooccur_rows<'a>(
    table: &CooccurrenceTable,
    sources: impl IntoIterator<Item = &'a str>,
    vocab: &Vocabulary,
) -> Vec<CooccurRow>
{
    let mut names: Vec<&str> = sources
        .into_iter()
        .collect();
    names.sort_unstable();
    names.dedup();

    names
        .into_iter()
        .zip(1..)
        .map(|(name, id)| {
            let co_occurs_with = table
                .partners(name)
                .map(|row| {
                    rank_partners(row)
                        .into_iter()
                        .map(|(k, v)| (k.to_owned(), v))
                        .collect()
                })
                .unwrap_or_default();

            CooccurRow { id, name: name.to_owned(), count: vocab.count(name), co_occurs_with }
        })
        .collect()
}

/// Source vocabulary from an entity list: entities with count > `min`
pub fn load_vocabulary(
    path: &Path,
    min: u64,
) -> Result<Vocabulary>
{
    let rows = read_jsonl::<EntityRow>(path)?.rows;

    Ok(rows
        .into_iter()
        .filter(|r| r.count > min)
        .map(|r| (r.name, r.count))
        .collect())
}
