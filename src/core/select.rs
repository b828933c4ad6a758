//! Filepath: src/core/select.rs
//! Post-accumulation selection policies:
//! - count thresholds (strictly above a minimum)
//! - per-node degree caps with deterministic tie-breaks
//! - "primary ± near tie" selection for home-group assignment

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::freq::FrequencyTable;

/// Default ratio a runner-up must reach to share the top spot
pub const DEFAULT_NEAR_TIE_RATIO: f64 = 0.9;

/// Entries whose count is strictly greater than `min`, order preserved
pub fn above_threshold(
    entries: impl IntoIterator<Item = (String, u64)>,
    min: u64,
) -> Vec<(String, u64)>
{
    entries
        .into_iter()
        .filter(|(_, n)| *n > min)
        .collect()
}

/// The `k` heaviest partners, weight descending then name ascending.
pub fn cap_degree<'a>(
    partners: impl IntoIterator<Item = (&'a str, u64)>,
    k: usize,
) -> Vec<(&'a str, u64)>
{
    let mut ranked: Vec<(&str, u64)> = partners
        .into_iter()
        .collect();

    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked.truncate(k);
    ranked
}

/// All partners, weight descending then name ascending
pub fn rank_partners(partners: &FrequencyTable) -> Vec<(&str, u64)>
{
    cap_degree(partners.iter(), usize::MAX)
}

/// Picks the top label, plus the runner-up when it is within `ratio`
/// of the top count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearTie
{
    pub ratio: f64,
}

impl Default for NearTie
{
    fn default() -> Self
    {
        Self { ratio: DEFAULT_NEAR_TIE_RATIO }
    }
}

impl NearTie
{
    pub fn new(ratio: f64) -> Self
    {
        Self { ratio }
    }

    /// 0, 1 or 2 labels. Equal counts keep first-seen order.
    pub fn select(
        &self,
        counts: &FrequencyTable,
    ) -> Vec<String>
    {
        let ranked = counts.snapshot();

        let mut picked = Vec::with_capacity(2);
        let mut iter = ranked.into_iter();

        let Some((top, top_n)) = iter.next()
        else
        {
            return picked;
        };
        picked.push(top);

        if let Some((second, second_n)) = iter.next()
            && second_n as f64 >= top_n as f64 * self.ratio
        {
            picked.push(second);
        }

        picked
    }
}

/// Tokens admitted by a count cutoff, with their counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary
{
    counts: IndexMap<String, u64>,
}

impl Vocabulary
{
    /// Tokens of `table` with count > `min`
    pub fn above(
        table: &FrequencyTable,
        min: u64,
    ) -> Self
    {
        table
            .iter()
            .filter(|(_, n)| *n > min)
            .map(|(k, n)| (k.to_owned(), n))
            .collect()
    }

    pub fn contains(
        &self,
        token: &str,
    ) -> bool
    {
        self.counts
            .contains_key(token)
    }

    /// Count recorded for `token`; absent is zero
    pub fn count(
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

    /// Tokens sorted by name
    pub fn sorted(&self) -> Vec<&str>
    {
        let mut names: Vec<&str> = self
            .counts
            .keys()
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<(String, u64)> for Vocabulary
{
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self
    {
        Self {
            counts: iter
                .into_iter()
                .collect(),
        }
    }
}
