//! Filepath: src/infra/walk.rs
//! Corpus discovery: the compressed files directly inside one directory.
//! - Suffix match on the configured extension (e.g. ".jsonl.zst")
//! - Extra ignore globs matched against the file name
//! - Deterministic, lexicographic order by file name
//!
//! Backed by ripgrep's `ignore` crate and `globset`. A corpus
//! directory is data, so gitignore and hidden-file rules are off.

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::{debug, warn};

/// Corpus discovery failures
#[derive(Debug, thiserror::Error)]
pub enum CorpusError
{
    #[error("corpus directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Lists corpus files in a directory (non-recursive).
pub struct CorpusWalker
{
    /// File name suffix a corpus file must carry
    extension: String,

    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,
}

impl CorpusWalker
{
    /// Build a walker for files ending in `extension`, minus any whose
    /// name matches one of `additional_ignores`.
    pub fn new(
        extension: &str,
        additional_ignores: &[String],
    ) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self { extension: extension.to_owned(), ignore_patterns: builder.build()? })
    }

    fn accepts(
        &self,
        name: &str,
    ) -> bool
    {
        name.ends_with(&self.extension) && !self
            .ignore_patterns
            .is_match(name)
    }

    /// Corpus files under `root`, sorted by file name.
    pub fn corpus_files(
        &self,
        root: &Path,
    ) -> Result<Vec<PathBuf>, CorpusError>
    {
        if !root.exists()
        {
            return Err(CorpusError::MissingDirectory(root.to_path_buf()));
        }
        if !root.is_dir()
        {
            return Err(CorpusError::NotADirectory(root.to_path_buf()));
        }

        let mut b = WalkBuilder::new(root);

        // Plain listing: no ignore files, no hidden-file policy
        b.standard_filters(false);
        b.max_depth(Some(1));

        let mut out: Vec<PathBuf> = b
            .build()
            .filter_map(|res| match res
            {
                Ok(entry) => Some(entry),
                Err(e) =>
                {
                    warn!(error = %e, "skipping unreadable corpus entry");
                    None
                }
            })
            // Keep only regular files
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| self.accepts(name))
            })
            .map(|entry| entry.into_path())
            .collect();

        // Deterministic order by name
        out.sort_by(|a, b| {
            a.file_name()
                .cmp(&b.file_name())
        });

        debug!(root = %root.display(), files = out.len(), "discovered corpus files");

        Ok(out)
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn names(files: &[PathBuf]) -> Vec<String>
    {
        files
            .iter()
            .map(|p| {
                p.file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    #[test]
    fn lists_matching_files_sorted() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        for name in ["b.jsonl.zst", "a.jsonl.zst", "notes.txt", "c.jsonl", ".h.jsonl.zst"]
        {
            fs::write(root.join(name), "x")?;
        }
        fs::create_dir_all(root.join("sub"))?;
        fs::write(root.join("sub/d.jsonl.zst"), "x")?;

        let walker = CorpusWalker::new(".jsonl.zst", &[])?;
        let files = walker.corpus_files(root)?;

        assert_eq!(names(&files), vec![".h.jsonl.zst", "a.jsonl.zst", "b.jsonl.zst"]);
        Ok(())
    }

    #[test]
    fn gitignore_does_not_hide_data() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        fs::write(root.join(".gitignore"), "*.zst\n")?;
        fs::write(root.join("a.jsonl.zst"), "x")?;

        let files = CorpusWalker::new(".jsonl.zst", &[])?.corpus_files(root)?;
        assert_eq!(names(&files), vec!["a.jsonl.zst"]);
        Ok(())
    }

    #[test]
    fn extra_globs_exclude_names() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        fs::write(root.join("part-0.jsonl.zst"), "x")?;
        fs::write(root.join("tmp-1.jsonl.zst"), "x")?;

        let walker = CorpusWalker::new(".jsonl.zst", &["tmp-*".to_string()])?;
        assert_eq!(names(&walker.corpus_files(root)?), vec!["part-0.jsonl.zst"]);
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let walker = CorpusWalker::new(".jsonl.zst", &[])?;

        let err = walker
            .corpus_files(&tmp.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, CorpusError::MissingDirectory(_)));
        Ok(())
    }
}
