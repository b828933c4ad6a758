//! Filepath: src/core/freq.rs
//! Token multiset with deterministic snapshots.

use indexmap::IndexMap;

/// Token -> count, remembering first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable
{
    counts: IndexMap<String, u64>,
}

impl FrequencyTable
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add one occurrence of `token`
    pub fn increment(
        &mut self,
        token: &str,
    )
    {
        self.add(token, 1);
    }

    /// Add `n` occurrences of `token`
    pub fn add(
        &mut self,
        token: &str,
        n: u64,
    )
    {
        // Avoid allocating a key for tokens already present
        if let Some(c) = self
            .counts
            .get_mut(token)
        {
            *c += n;
        }
        else
        {
            self.counts
                .insert(token.to_owned(), n);
        }
    }

    /// Count every token in `tokens`, repeats included
    pub fn extend<'a>(
        &mut self,
        tokens: impl IntoIterator<Item = &'a str>,
    )
    {
        for t in tokens
        {
            self.increment(t);
        }
    }

    /// Count for `token`; absent is zero
    pub fn get(
        &self,
        token: &str,
    ) -> u64
    {
        self.counts
            .get(token)
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize
    {
        self.counts
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.counts
            .is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> u64
    {
        self.counts
            .values()
            .sum()
    }

    /// Key-wise addition; new keys append in `other`'s order
    pub fn merge(
        &mut self,
        other: FrequencyTable,
    )
    {
        for (token, n) in other.counts
        {
            *self
                .counts
                .entry(token)
                .or_insert(0) += n;
        }
    }

    /// (token, count) by count descending, first-seen order on ties
    pub fn snapshot(&self) -> Vec<(String, u64)>
    {
        let mut out: Vec<(String, u64)> = self
            .counts
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();

        // Stable sort keeps insertion order among equal counts
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }

    /// Iterate in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)>
    {
        self.counts
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
    }
}

impl<'a> FromIterator<&'a str> for FrequencyTable
{
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self
    {
        let mut table = FrequencyTable::new();
        table.extend(iter);
        table
    }
}
