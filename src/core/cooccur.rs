//! Filepath: src/core/cooccur.rs
//! Two-level multisets: entity -> group counts and token co-occurrence.
//!
//! `NestedCounts` is the shared storage (absent keys read as zero).
//! `CooccurrenceTable` feeds it from per-record token lists under
//! source/target inclusion predicates.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::core::freq::FrequencyTable;

/// outer token -> (inner token -> count), first-seen order on both levels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedCounts
{
    rows: IndexMap<String, FrequencyTable>,
}

impl NestedCounts
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add `n` to rows[outer][inner]
    pub fn add(
        &mut self,
        outer: &str,
        inner: &str,
        n: u64,
    )
    {
        self.ensure_row(outer)
            .add(inner, n);
    }

    /// Row for `outer`, created empty if missing
    pub fn ensure_row(
        &mut self,
        outer: &str,
    ) -> &mut FrequencyTable
    {
        // Only allocate the key on first sight
        match self
            .rows
            .get_index_of(outer)
        {
            Some(i) => &mut self.rows[i],
            None => self
                .rows
                .entry(outer.to_owned())
                .or_default(),
        }
    }

    /// rows[outer][inner], zero when absent
    pub fn get(
        &self,
        outer: &str,
        inner: &str,
    ) -> u64
    {
        self.rows
            .get(outer)
            .map_or(0, |row| row.get(inner))
    }

    pub fn row(
        &self,
        outer: &str,
    ) -> Option<&FrequencyTable>
    {
        self.rows
            .get(outer)
    }

    /// Rows in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FrequencyTable)>
    {
        self.rows
            .iter()
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize
    {
        self.rows
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.rows
            .is_empty()
    }

    /// Key-wise addition on both levels
    pub fn merge(
        &mut self,
        other: NestedCounts,
    )
    {
        for (outer, row) in other.rows
        {
            self.rows
                .entry(outer)
                .or_default()
                .merge(row);
        }
    }

    /// Ordered copy of the whole table
    pub fn to_btree(&self) -> BTreeMap<String, BTreeMap<String, u64>>
    {
        self.rows
            .iter()
            .map(|(outer, row)| {
                let inner: BTreeMap<String, u64> = row
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v))
                    .collect();
                (outer.clone(), inner)
            })
            .collect()
    }
}

/// Per-record co-occurrence accumulator.
///
/// Tokens are de-duplicated per record (first occurrence wins) before
/// pairing, so "A, A, B" contributes exactly A->B and B->A.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooccurrenceTable
{
    table: NestedCounts,
}

impl CooccurrenceTable
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Count every ordered pair (a, b), a != b, where `source(a)` and
    /// `target(b)` hold.
    pub fn observe<S, T>(
        &mut self,
        tokens: &[&str],
        source: S,
        target: T,
    ) where
        S: Fn(&str) -> bool,
        T: Fn(&str) -> bool,
    {
        let unique: Vec<&str> = tokens
            .iter()
            .copied()
            .unique()
            .collect();

        // A lone token has no partner
        if unique.len() < 2
        {
            return;
        }

        for &a in unique
            .iter()
            .filter(|a| source(**a))
        {
            for &b in &unique
            {
                if a != b && target(b)
                {
                    self.table
                        .add(a, b, 1);
                }
            }
        }
    }

    /// Unrestricted observation: every distinct pair counts
    pub fn observe_all(
        &mut self,
        tokens: &[&str],
    )
    {
        self.observe(tokens, |_| true, |_| true);
    }

    /// Make `token` a row even if it never gains a partner
    pub fn ensure_source(
        &mut self,
        token: &str,
    )
    {
        self.table
            .ensure_row(token);
    }

    /// table[a][b], zero when absent
    pub fn get(
        &self,
        a: &str,
        b: &str,
    ) -> u64
    {
        self.table
            .get(a, b)
    }

    pub fn partners(
        &self,
        token: &str,
    ) -> Option<&FrequencyTable>
    {
        self.table
            .row(token)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str>
    {
        self.table
            .iter()
            .map(|(k, _)| k)
    }

    pub fn len(&self) -> usize
    {
        self.table
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.table
            .is_empty()
    }

    pub fn merge(
        &mut self,
        other: CooccurrenceTable,
    )
    {
        self.table
            .merge(other.table);
    }

    /// Drop every entry whose source or partner fails `keep`; rows left
    /// without partners are removed.
    pub fn restricted_to<K>(
        &self,
        keep: K,
    ) -> CooccurrenceTable
    where
        K: Fn(&str) -> bool,
    {
        let mut out = CooccurrenceTable::new();

        for (a, row) in self
            .table
            .iter()
            .filter(|(a, _)| keep(*a))
        {
            for (b, n) in row
                .iter()
                .filter(|(b, _)| keep(*b))
            {
                out.table
                    .add(a, b, n);
            }
        }

        out
    }

    /// token -> partner -> count, ordered by key on both levels
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<String, u64>>
    {
        self.table
            .to_btree()
    }
}
