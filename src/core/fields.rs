//! Filepath: src/core/fields.rs
//! Comma-joined metadata fields resolved into tokens.
//!
//! Every consumer (fandom counts, character lists, relationship
//! co-occurrence, rewrite predicates) goes through `split_tokens`
//! so the split/trim rule is identical everywhere. Tokens keep
//! their case and inner whitespace exactly as written.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Metadata fields the corpus carries as comma-joined strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Field
{
    /// `Fandom`
    Fandom,

    /// `Characters`
    Characters,

    /// `Relationship`
    Relationship,

    /// `Additional Tags`
    Tags,

    /// `Rating`
    Rating,

    /// `Archive Warning`
    Warning,

    /// `Language`
    Language,
}

impl Field
{
    /// Key used inside the record's `metadata` mapping
    pub fn key(self) -> &'static str
    {
        match self
        {
            Field::Fandom => "Fandom",
            Field::Characters => "Characters",
            Field::Relationship => "Relationship",
            Field::Tags => "Additional Tags",
            Field::Rating => "Rating",
            Field::Warning => "Archive Warning",
            Field::Language => "Language",
        }
    }

    /// Resolve a raw metadata key back to a known field
    pub fn from_key(key: &str) -> Option<Self>
    {
        Self::value_variants()
            .iter()
            .copied()
            .find(|f| f.key() == key)
    }
}

/// Split a comma-joined value into trimmed, non-empty tokens.
pub fn split_tokens(raw: &str) -> impl Iterator<Item = &str>
{
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
