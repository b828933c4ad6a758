//! Filepath: src/core/report.rs
//! Console summary over built artifacts: top groups, their most
//! frequent entities, and entities homed in more than one group.

use std::collections::HashSet;

use indexmap::IndexMap;
use itertools::Itertools;
use owo_colors::OwoColorize;
use tabled::{Table, Tabled};

use crate::core::artifact::{CountRow, EntityRow};

/// Report derived from a group frequency list and an entity list
#[derive(Debug)]
pub struct Report<'a>
{
    /// Top groups, count descending
    pub groups: Vec<&'a CountRow>,

    /// Entities with at least one home in `groups`, count descending
    pub entities: Vec<&'a EntityRow>,
}

impl<'a> Report<'a>
{
    /// Select the `top_groups` largest groups and their entities.
    pub fn build(
        groups: &'a [CountRow],
        entities: &'a [EntityRow],
        top_groups: usize,
    ) -> Self
    {
        let groups: Vec<&CountRow> = groups
            .iter()
            .sorted_by(|a, b| b.count.cmp(&a.count))
            .take(top_groups)
            .collect();

        let names: HashSet<&str> = groups
            .iter()
            .map(|g| g.name.as_str())
            .collect();

        let entities = entities
            .iter()
            .filter(|e| {
                e.fandom
                    .iter()
                    .any(|f| names.contains(f.as_str()))
            })
            .sorted_by(|a, b| b.count.cmp(&a.count))
            .collect();

        Self { groups, entities }
    }

    /// Most frequent `n` entities overall
    pub fn top_entities(
        &self,
        n: usize,
    ) -> &[&'a EntityRow]
    {
        &self.entities[..n.min(self.entities.len())]
    }

    /// Per top group: (entities homed there, top `k` of them)
    pub fn per_group(
        &self,
        k: usize,
    ) -> IndexMap<&'a str, (usize, Vec<&'a EntityRow>)>
    {
        let mut out: IndexMap<&str, (usize, Vec<&EntityRow>)> = self
            .groups
            .iter()
            .map(|g| (g.name.as_str(), (0, Vec::new())))
            .collect();

        // Entities are already count-ordered
        for e in &self.entities
        {
            for f in &e.fandom
            {
                if let Some((total, top)) = out.get_mut(f.as_str())
                {
                    *total += 1;
                    if top.len() < k
                    {
                        top.push(e);
                    }
                }
            }
        }

        out
    }

    /// Entities with more than one home group
    pub fn cross_group(&self) -> Vec<&'a EntityRow>
    {
        self.entities
            .iter()
            .copied()
            .filter(|e| e.fandom.len() > 1)
            .collect()
    }

    /// Render all sections as text tables
    pub fn render(
        &self,
        top: usize,
        per_group: usize,
        color: bool,
    ) -> String
    {
        let mut out = String::new();
        let heading = |s: String| if color { s.bold().to_string() } else { s };

        out.push_str(&heading(format!("Top {} groups", self.groups.len())));
        out.push('\n');
        out.push_str(
            &Table::new(
                self.groups
                    .iter()
                    .zip(1..)
                    .map(|(g, rank)| GroupLine { rank, name: g.name.clone(), works: g.count }),
            )
            .to_string(),
        );
        out.push_str("\n\n");

        out.push_str(&heading(format!("Top {top} entities in those groups")));
        out.push('\n');
        out.push_str(&entity_table(self.top_entities(top)));
        out.push_str("\n\n");

        for (group, (total, entities)) in self.per_group(per_group)
        {
            out.push_str(&heading(format!("{group} ({total} entities)")));
            out.push('\n');
            out.push_str(&entity_table(&entities));
            out.push_str("\n\n");
        }

        out.push_str(&heading("Cross-group entities".to_string()));
        out.push('\n');
        for e in self.cross_group()
        {
            out.push_str(&format!("- {} -> {}\n", e.name, e.fandom.join(", ")));
        }

        out
    }
}

#[derive(Tabled)]
struct GroupLine
{
    rank: usize,
    name: String,
    works: u64,
}

#[derive(Tabled)]
struct EntityLine
{
    rank: usize,
    name: String,
    works: u64,
    homes: String,
}

fn entity_table(entities: &[&EntityRow]) -> String
{
    Table::new(
        entities
            .iter()
            .zip(1..)
            .map(|(e, rank)| EntityLine {
                rank,
                name: e.name.clone(),
                works: e.count,
                homes: e.fandom.join(", "),
            }),
    )
    .to_string()
}
