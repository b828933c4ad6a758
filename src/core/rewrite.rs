//! Filepath: src/core/rewrite.rs
//! Corpus rewriter: stream records through a keep/strip transform and
//! re-compress them, one output file per input file.
//!
//! Each output file is a complete zstd frame written to a temp file
//! and persisted only once the frame is finished, so a crash never
//! leaves a half-written file under the final name.

use std::{
    fs,
    io::{self, BufWriter, Read, Write},
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::core::{
    record::{Decoded, Record},
    stream::{Corpus, LineSplitter, open_decoder},
};

/// Per-record keep/transform step. `None` drops the record.
pub trait RecordTransform
{
    fn apply(
        &self,
        record: Record,
    ) -> Option<Record>;
}

impl<F> RecordTransform for F
where
    F: Fn(Record) -> Option<Record>,
{
    fn apply(
        &self,
        record: Record,
    ) -> Option<Record>
    {
        self(record)
    }
}

/// Drop a record when `key` (a metadata field) contains `token`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion
{
    pub key: String,
    pub token: String,
}

impl FromStr for Exclusion
{
    type Err = String;

    /// Parse `Key=Token`, e.g. `Fandom=Original Work`
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let (key, token) = s
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=TOKEN, got '{s}'"))?;

        let (key, token) = (key.trim(), token.trim());
        if key.is_empty() || token.is_empty()
        {
            return Err(format!("empty key or token in '{s}'"));
        }

        Ok(Self { key: key.to_owned(), token: token.to_owned() })
    }
}

/// Exclusion rules plus top-level fields to strip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewritePolicy
{
    /// A record matching any rule is dropped
    pub exclude: Vec<Exclusion>,

    /// Top-level fields removed from kept records (e.g. "text")
    pub strip: Vec<String>,
}

impl RewritePolicy
{
    pub fn excludes(
        &self,
        record: &Record,
    ) -> bool
    {
        self.exclude
            .iter()
            .any(|rule| record.has_token(&rule.key, &rule.token))
    }
}

impl RecordTransform for RewritePolicy
{
    fn apply(
        &self,
        mut record: Record,
    ) -> Option<Record>
    {
        if self.excludes(&record)
        {
            return None;
        }

        for field in &self.strip
        {
            record.remove(field);
        }

        Some(record)
    }
}

/// Reconcilable counts: `lines == kept + dropped + malformed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats
{
    /// Raw lines read
    pub lines: u64,

    /// Records written
    pub kept: u64,

    /// Records the transform rejected
    pub dropped: u64,

    /// Lines that did not decode
    pub malformed: u64,

    /// Files rewritten
    pub files: usize,

    /// Files that could not be opened or failed mid-stream
    pub failed_files: usize,
}

impl RewriteStats
{
    pub fn merge(
        &mut self,
        other: RewriteStats,
    )
    {
        self.lines += other.lines;
        self.kept += other.kept;
        self.dropped += other.dropped;
        self.malformed += other.malformed;
        self.files += other.files;
        self.failed_files += other.failed_files;
    }
}

/// Rewrite one decompressed stream into `output` (uncompressed lines).
///
/// A read error ends the stream early: everything read so far is kept
/// and `failed_files` is set. Write errors are returned.
pub fn rewrite_stream<R, W, T>(
    input: R,
    output: &mut W,
    chunk_size: usize,
    transform: &T,
) -> io::Result<RewriteStats>
where
    R: Read,
    W: Write,
    T: RecordTransform + ?Sized,
{
    let mut stats = RewriteStats { files: 1, ..Default::default() };
    let mut splitter = LineSplitter::new(input, chunk_size);
    let mut line = Vec::new();

    loop
    {
        let raw = match splitter.next_record()
        {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(e) =>
            {
                warn!(error = %e, "input stream failed, keeping records read so far");
                stats.failed_files = 1;
                break;
            }
        };

        stats.lines += 1;

        let record = match Record::decode(&raw)
        {
            Decoded::Record(r) => r,
            Decoded::Skip(_) =>
            {
                stats.malformed += 1;
                continue;
            }
        };

        match transform.apply(record)
        {
            Some(kept) =>
            {
                line.clear();
                kept.encode_line(&mut line)
                    .map_err(io::Error::other)?;
                output.write_all(&line)?;
                stats.kept += 1;
            }
            None => stats.dropped += 1,
        }
    }

    Ok(stats)
}

/// Rewrite one compressed file into a new compressed file.
#[instrument(level = "debug", skip_all, fields(file = %input.display()))]
pub fn rewrite_file<T>(
    input: &Path,
    output: &Path,
    level: i32,
    chunk_size: usize,
    transform: &T,
) -> Result<RewriteStats>
where
    T: RecordTransform + ?Sized,
{
    // Unreadable input is a per-file failure, not a fatal one
    let decoder = match open_decoder(input)
    {
        Ok(d) => d,
        Err(e) =>
        {
            warn!(file = %input.display(), error = %e, "cannot open corpus file, skipping");
            return Ok(RewriteStats { failed_files: 1, ..Default::default() });
        }
    };

    let dir = output
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

    let mut encoder = zstd::stream::write::Encoder::new(BufWriter::new(tmp), level)
        .context("Failed to start zstd encoder")?;

    let stats = rewrite_stream(decoder, &mut encoder, chunk_size, transform)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    // Close the frame so the file decompresses on its own
    let mut writer = encoder
        .finish()
        .context("Failed to finish zstd frame")?;
    writer
        .flush()
        .context("Failed to flush output")?;

    let tmp = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush output")?;
    tmp.persist(output)
        .with_context(|| format!("Failed to persist {}", output.display()))?;

    debug!(
        file = %input.display(),
        kept = stats.kept,
        dropped = stats.dropped,
        malformed = stats.malformed,
        "rewrote corpus file"
    );

    Ok(stats)
}

/// Rewrite every corpus file into `out_dir`, keeping file names.
pub fn rewrite_corpus<T>(
    corpus: &Corpus,
    out_dir: &Path,
    level: i32,
    transform: &T,
    progress: &ProgressBar,
) -> Result<RewriteStats>
where
    T: RecordTransform + ?Sized,
{
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut total = RewriteStats::default();

    for input in corpus.files()
    {
        let name = input
            .file_name()
            .with_context(|| format!("Corpus path has no file name: {}", input.display()))?;
        let output = out_dir.join(name);

        // Never truncate the file being read
        if same_file(input, &output)
        {
            anyhow::bail!(
                "Output {} would overwrite its own input; choose another directory",
                output.display()
            );
        }

        progress.set_message(name.to_string_lossy().into_owned());
        let stats = rewrite_file(input, &output, level, corpus.chunk_size(), transform)?;
        total.merge(stats);
        progress.inc(1);
    }

    info!(
        lines = total.lines,
        kept = total.kept,
        dropped = total.dropped,
        malformed = total.malformed,
        files = total.files,
        failed_files = total.failed_files,
        "rewrite finished"
    );

    Ok(total)
}

fn same_file(
    a: &Path,
    b: &Path,
) -> bool
{
    match (a.canonicalize(), b.canonicalize())
    {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests
{
    use std::io::Cursor;

    use serde_json::json;

    use super::*;

    const INPUT: &str = concat!(
        r#"{"id":1,"metadata":{"Fandom":"Original Work","Characters":"A"},"text":"x"}"#,
        "\n",
        r#"{"id":2,"metadata":{"Fandom":"F","Characters":"Reader, B"},"text":"y"}"#,
        "\n",
        "{not json\n",
        r#"{"id":3,"metadata":{"Fandom":"F","Characters":"B"},"text":"z","extra":[1,2]}"#,
        "\n",
    );

    fn policy() -> RewritePolicy
    {
        RewritePolicy {
            exclude: vec![
                "Fandom=Original Work"
                    .parse()
                    .unwrap(),
                "Characters=Reader"
                    .parse()
                    .unwrap(),
            ],
            strip: vec!["text".into()],
        }
    }

    #[test]
    fn drops_strips_and_reconciles()
    {
        let mut out = Vec::new();
        let stats = rewrite_stream(Cursor::new(INPUT), &mut out, 16, &policy()).unwrap();

        assert_eq!(stats.lines, 4);
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.lines, stats.kept + stats.dropped + stats.malformed);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "{\"id\":3,\"metadata\":{\"Fandom\":\"F\",\"Characters\":\"B\"},\"extra\":[1,2]}\n"
        );
    }

    #[test]
    fn stripped_field_absent_and_others_equal()
    {
        let line = concat!(
            r#"{"b":{"z":1,"a":[true,null]},"text":"long body","a":"é","#,
            r#""big":12345678901234567890123,"exp":1.0e2,"frac":1.50}"#,
        );
        let strip_only = RewritePolicy { exclude: vec![], strip: vec!["text".into()] };

        let mut out = Vec::new();
        rewrite_stream(Cursor::new(line), &mut out, 64, &strip_only).unwrap();

        let Decoded::Record(before) = Record::decode(line.as_bytes())
        else
        {
            panic!("fixture must decode");
        };
        let Decoded::Record(after) = Record::decode(&out)
        else
        {
            panic!("output must decode");
        };

        assert!(!after.fields().contains_key("text"));
        assert_eq!(after.fields().len(), before.fields().len() - 1);
        for (k, v) in after.fields()
        {
            assert_eq!(Some(v), before.fields().get(k), "field {k}");
        }
        assert_eq!(after.fields()["b"], json!({"z": 1, "a": [true, null]}));
        // Non-ASCII stays unescaped and numbers keep their spelling
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains('é'));
        assert!(text.contains(r#""big":12345678901234567890123"#));
        assert!(text.contains(r#""exp":1.0e2"#));
        assert!(text.contains(r#""frac":1.50"#));
    }

    #[test]
    fn long_window_input_is_rewritten()
    {
        let dir = tempfile::tempdir().unwrap();
        let input = dir
            .path()
            .join("in.jsonl.zst");
        let output = dir
            .path()
            .join("out.jsonl.zst");

        // Window log above the decoder's default limit of 27
        let mut enc = zstd::stream::write::Encoder::new(fs::File::create(&input).unwrap(), 3)
            .unwrap();
        enc.long_distance_matching(true)
            .unwrap();
        enc.window_log(28)
            .unwrap();
        for _ in 0..50
        {
            enc.write_all(INPUT.as_bytes())
                .unwrap();
        }
        enc.finish()
            .unwrap();

        let stats = rewrite_file(&input, &output, 3, 64, &policy()).unwrap();
        assert_eq!(stats.failed_files, 0);
        assert_eq!(stats.lines, 200);
        assert_eq!(stats.kept, 50);

        let data = zstd::decode_all(fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(
            data.iter()
                .filter(|&&b| b == b'\n')
                .count(),
            50
        );
    }

    #[test]
    fn closure_transform()
    {
        let keep_even = |r: Record| {
            let even = r
                .fields()
                .get("id")
                .and_then(|v| v.as_u64())
                .is_some_and(|n| n % 2 == 0);
            even.then_some(r)
        };

        let mut out = Vec::new();
        let stats = rewrite_stream(Cursor::new(INPUT), &mut out, 7, &keep_even).unwrap();
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.dropped, 2);
    }

    #[test]
    fn exclusion_parsing()
    {
        let e: Exclusion = " Fandom = Original Work "
            .parse()
            .unwrap();
        assert_eq!(e, Exclusion { key: "Fandom".into(), token: "Original Work".into() });
        assert!("NoEquals".parse::<Exclusion>().is_err());
        assert!("=x".parse::<Exclusion>().is_err());
    }
}
