use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{AppContext, InitArgs},
    core::{
        rewrite::{Exclusion, RewritePolicy},
        select::DEFAULT_NEAR_TIE_RATIO,
        stream::DEFAULT_CHUNK_SIZE,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Corpus file name suffix
    pub corpus_extension: String,

    /// Extra glob patterns excluded from corpus discovery
    pub ignore_patterns: Vec<String>,

    /// Decompressed read size in bytes
    pub chunk_size: usize,

    /// zstd level for rewritten corpora
    pub compression_level: i32,

    /// Runner-up ratio for home-group selection
    pub near_tie_ratio: f64,

    /// Popularity cutoff for co-occurrence sources (strictly above)
    pub min_count: u64,

    /// Graph export filters
    pub export: ExportConfig,

    /// Corpus rewrite defaults
    pub rewrite: RewriteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig
{
    pub min_appearances: u64,
    pub min_edge_weight: u64,
    pub degree_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig
{
    /// Top-level fields dropped from every kept record
    pub strip_fields: Vec<String>,

    /// `Key=Token` rules; a matching record is dropped
    pub exclude: Vec<String>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            corpus_extension: ".jsonl.zst".to_string(),
            ignore_patterns: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression_level: 3,
            near_tie_ratio: DEFAULT_NEAR_TIE_RATIO,
            min_count: 20,
            export: ExportConfig::default(),
            rewrite: RewriteConfig::default(),
        }
    }
}

impl Default for ExportConfig
{
    fn default() -> Self
    {
        Self { min_appearances: 100, min_edge_weight: 10, degree_cap: 20 }
    }
}

impl Default for RewriteConfig
{
    fn default() -> Self
    {
        Self {
            strip_fields: vec!["text".to_string()],
            exclude: vec!["Fandom=Original Work".to_string(), "Characters=Reader".to_string()],
        }
    }
}

impl RewriteConfig
{
    /// Parse the configured rules into a policy
    pub fn policy(&self) -> Result<RewritePolicy>
    {
        let exclude = self
            .exclude
            .iter()
            .map(|s| {
                s.parse::<Exclusion>()
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("Invalid rewrite.exclude rule '{s}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RewritePolicy { exclude, strip: self.strip_fields.clone() })
    }
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["ficstream.toml", "ficstream.yaml", "ficstream.json", ".ficstream.toml"];

    for path in &config_paths
    {
        if Path::new(path).exists()
        {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // Add environment variables with FICSTREAM_ prefix
    builder = builder.add_source(
        config::Environment::with_prefix("FICSTREAM")
            .prefix_separator("_")
            .separator("__"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("ficstream.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("DRY RUN: would write {}", config_path.display());
        }
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();

        assert_eq!(back.chunk_size, 65536);
        assert_eq!(back.min_count, 20);
        assert_eq!(back.export.degree_cap, 20);
        assert_eq!(back.rewrite.strip_fields, vec!["text"]);
    }

    #[test]
    fn partial_toml_fills_defaults()
    {
        let back: Config = toml::from_str("min_count = 5\n[export]\ndegree_cap = 3\n").unwrap();
        assert_eq!(back.min_count, 5);
        assert_eq!(back.export.degree_cap, 3);
        assert_eq!(back.export.min_edge_weight, 10);
        assert_eq!(back.corpus_extension, ".jsonl.zst");
    }

    #[test]
    fn rewrite_rules_parse()
    {
        let policy = RewriteConfig::default()
            .policy()
            .unwrap();
        assert_eq!(policy.exclude.len(), 2);
        assert_eq!(policy.exclude[1].token, "Reader");

        let bad = RewriteConfig { strip_fields: vec![], exclude: vec!["nope".into()] };
        assert!(bad.policy().is_err());
    }
}
