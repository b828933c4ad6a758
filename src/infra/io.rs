//! Filepath: src/infra/io.rs
//! Line-delimited JSON artifacts: atomic writes, tolerant reads.

use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;
use tracing::debug;

/// Writes JSONL artifacts through a temp file in the target directory
pub struct JsonlWriter;

impl JsonlWriter
{
    /// Write one compact JSON object per line, replacing `path` atomically.
    pub fn write_rows<T: Serialize>(
        path: &Path,
        rows: &[T],
    ) -> Result<()>
    {
        // Ensure the destination directory exists
        let dir = match path.parent()
        {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        let mut w = BufWriter::new(tmp);

        // Serialize rows one per line
        for row in rows
        {
            serde_json::to_writer(&mut w, row).context("Failed to serialize row")?;
            w.write_all(b"\n")?;
        }

        // Flush and move into place
        let tmp = w
            .into_inner()
            .map_err(|e| e.into_error())
            .context("Failed to flush output")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }
}

/// Rows decoded from a JSONL artifact
#[derive(Debug)]
pub struct JsonlRows<T>
{
    pub rows: Vec<T>,

    /// Lines that did not decode into `T`
    pub skipped: usize,
}

/// Read a JSONL artifact; blank lines are ignored, malformed ones counted.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<JsonlRows<T>>
{
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    let mut skipped = 0;

    for line in reader.lines()
    {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;

        if line
            .trim()
            .is_empty()
        {
            continue;
        }

        match serde_json::from_str(&line)
        {
            Ok(row) => rows.push(row),
            Err(e) =>
            {
                debug!(file = %path.display(), error = %e, "skipping malformed artifact line");
                skipped += 1;
            }
        }
    }

    Ok(JsonlRows { rows, skipped })
}
