//! Filepath: src/core/stream.rs
//! Bounded-memory record streaming over a multi-file zstd corpus.
//!
//! - `LineSplitter` turns any `Read` into newline-delimited records,
//!   reading fixed-size chunks and carrying partial lines across reads.
//! - `CorpusStream` chains splitters over the corpus files in order,
//!   one decompressor open at a time.
//! - `Records` decodes each raw line and tallies the skips.
//!
//! Memory is O(chunk size + longest record) regardless of corpus size.

use std::{
    fs::File,
    io::{self, BufReader, ErrorKind, Read},
    path::{Path, PathBuf},
};

use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::record::{Decoded, Record};

/// Read size for decompressed chunks
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Splits a byte reader into '\n'-terminated records.
///
/// The final record is emitted at EOF even without a trailing newline.
/// After a read error the partial tail is dropped and the splitter is
/// exhausted.
pub struct LineSplitter<R>
{
    /// Underlying (decompressed) byte source
    inner: R,

    /// Fixed-size read buffer
    chunk: Vec<u8>,

    /// Bytes read but not yet handed out
    carry: Vec<u8>,

    /// Offset of the first unconsumed byte in `carry`
    start: usize,

    /// Bytes of `carry` already searched for '\n'
    scanned: usize,

    /// Source hit EOF or failed
    done: bool,
}

impl<R: Read> LineSplitter<R>
{
    pub fn new(
        inner: R,
        chunk_size: usize,
    ) -> Self
    {
        Self {
            inner,
            chunk: vec![0; chunk_size.max(1)],
            carry: Vec::new(),
            start: 0,
            scanned: 0,
            done: false,
        }
    }

    /// Next record without its '\n', `Ok(None)` once exhausted.
    pub fn next_record(&mut self) -> io::Result<Option<Vec<u8>>>
    {
        loop
        {
            // A complete line already buffered? Only new bytes are searched
            let from = self
                .scanned
                .max(self.start);
            if let Some(pos) = memchr::memchr(b'\n', &self.carry[from..])
            {
                let end = from + pos;
                let record = self.carry[self.start..end].to_vec();
                self.start = end + 1;
                self.scanned = self.start;
                return Ok(Some(record));
            }
            self.scanned = self
                .carry
                .len();

            if self.done
            {
                // Flush whatever is left as the last record
                if self.start < self.carry.len()
                {
                    let record = self.carry[self.start..].to_vec();
                    self.reset_carry();
                    return Ok(Some(record));
                }
                return Ok(None);
            }

            // Drop consumed bytes before growing the carry
            if self.start > 0
            {
                self.carry
                    .drain(..self.start);
                self.scanned -= self.start;
                self.start = 0;
            }

            match self
                .inner
                .read(&mut self.chunk)
            {
                Ok(0) => self.done = true,
                Ok(n) => self
                    .carry
                    .extend_from_slice(&self.chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) =>
                {
                    // Partial record is unrecoverable
                    self.done = true;
                    self.reset_carry();
                    return Err(e);
                }
            }
        }
    }

    fn reset_carry(&mut self)
    {
        self.carry
            .clear();
        self.start = 0;
        self.scanned = 0;
    }
}

impl<R: Read> Iterator for LineSplitter<R>
{
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        self.next_record()
            .transpose()
    }
}

/// An ordered, re-readable set of compressed corpus files
#[derive(Debug, Clone)]
pub struct Corpus
{
    files: Vec<PathBuf>,
    chunk_size: usize,
}

impl Corpus
{
    /// Files are read in the order given; discovery sorts them.
    pub fn new(
        files: Vec<PathBuf>,
        chunk_size: usize,
    ) -> Self
    {
        Self { files, chunk_size }
    }

    pub fn files(&self) -> &[PathBuf]
    {
        &self.files
    }

    pub fn chunk_size(&self) -> usize
    {
        self.chunk_size
    }

    /// One single-file corpus per file, for per-file workers
    pub fn per_file(&self) -> Vec<Corpus>
    {
        self.files
            .iter()
            .map(|f| Corpus::new(vec![f.clone()], self.chunk_size))
            .collect()
    }

    /// Fresh raw-line stream from the first file
    pub fn stream(&self) -> CorpusStream
    {
        CorpusStream {
            pending: self
                .files
                .clone()
                .into_iter()
                .rev()
                .collect(),
            chunk_size: self.chunk_size,
            current: None,
            stats: StreamStats::default(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Fresh decoded-record stream from the first file
    pub fn records(&self) -> Records
    {
        Records::new(self.stream())
    }
}

/// Decompressing reader over one corpus file
pub type FileDecoder = zstd::stream::read::Decoder<'static, BufReader<File>>;

/// Open a corpus file for streaming decompression; shared by every
/// corpus reader.
pub fn open_decoder(path: &Path) -> io::Result<FileDecoder>
{
    let file = File::open(path)?;
    let mut decoder = zstd::stream::read::Decoder::new(file)?;

    // Allow long-window frames produced with --long
    decoder.window_log_max(31)?;

    Ok(decoder)
}

/// File-level counters for one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats
{
    /// Files opened, including ones that later failed mid-stream
    pub files: usize,

    /// Files that could not be opened (not in `files`) or failed
    /// mid-stream (also in `files`)
    pub failed_files: usize,
}

/// Raw lines across all corpus files, in order.
pub struct CorpusStream
{
    /// Files not yet opened, next file last
    pending: Vec<PathBuf>,

    chunk_size: usize,

    /// File currently being split
    current: Option<(PathBuf, LineSplitter<FileDecoder>)>,

    stats: StreamStats,

    /// Advanced once per finished file
    progress: ProgressBar,
}

impl CorpusStream
{
    /// Tick `bar` once per finished file
    pub fn with_progress(
        mut self,
        bar: ProgressBar,
    ) -> Self
    {
        self.progress = bar;
        self
    }

    pub fn stats(&self) -> StreamStats
    {
        self.stats
    }

    fn open(
        path: &Path,
        chunk_size: usize,
    ) -> io::Result<LineSplitter<FileDecoder>>
    {
        Ok(LineSplitter::new(open_decoder(path)?, chunk_size))
    }

    /// Open the next pending file, skipping ones that fail to open
    fn advance(&mut self) -> bool
    {
        while let Some(path) = self
            .pending
            .pop()
        {
            match Self::open(&path, self.chunk_size)
            {
                Ok(splitter) =>
                {
                    debug!(file = %path.display(), "opened corpus file");
                    self.stats
                        .files += 1;
                    self.current = Some((path, splitter));
                    return true;
                }
                Err(e) =>
                {
                    warn!(file = %path.display(), error = %e, "cannot open corpus file, skipping");
                    self.stats
                        .failed_files += 1;
                    self.progress
                        .inc(1);
                }
            }
        }
        false
    }
}

impl Iterator for CorpusStream
{
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>>
    {
        loop
        {
            if self
                .current
                .is_none()
                && !self.advance()
            {
                return None;
            }

            let (path, splitter) = self
                .current
                .as_mut()?;

            match splitter.next_record()
            {
                Ok(Some(record)) => return Some(record),
                Ok(None) =>
                {
                    self.current = None;
                    self.progress
                        .inc(1);
                }
                Err(e) =>
                {
                    // Keep what was read; drop the rest of this file
                    warn!(file = %path.display(), error = %e, "decompression failed, dropping file tail");
                    self.stats
                        .failed_files += 1;
                    self.current = None;
                    self.progress
                        .inc(1);
                }
            }
        }
    }
}

/// Counts reported at the end of a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary
{
    /// Records decoded and handed to the caller
    pub records: u64,

    /// Raw lines that did not decode
    pub skipped: u64,

    /// Corpus files opened, including ones that later failed mid-stream
    pub files: usize,

    /// Corpus files that failed to open (not in `files`) or failed
    /// mid-stream (also in `files`)
    pub failed_files: usize,
}

impl PassSummary
{
    /// Key-wise sum of two summaries
    pub fn merge(
        &mut self,
        other: PassSummary,
    )
    {
        self.records += other.records;
        self.skipped += other.skipped;
        self.files += other.files;
        self.failed_files += other.failed_files;
    }
}

/// Decoded records; malformed lines are counted and skipped.
pub struct Records
{
    stream: CorpusStream,
    records: u64,
    skipped: u64,
}

impl Records
{
    pub fn new(stream: CorpusStream) -> Self
    {
        Self { stream, records: 0, skipped: 0 }
    }

    /// Tick `bar` once per finished file
    pub fn with_progress(
        mut self,
        bar: ProgressBar,
    ) -> Self
    {
        self.stream = self
            .stream
            .with_progress(bar);
        self
    }

    /// Counts so far (final once the iterator is drained)
    pub fn summary(&self) -> PassSummary
    {
        let stats = self
            .stream
            .stats();
        PassSummary {
            records: self.records,
            skipped: self.skipped,
            files: stats.files,
            failed_files: stats.failed_files,
        }
    }
}

impl Iterator for Records
{
    type Item = Record;

    fn next(&mut self) -> Option<Record>
    {
        for raw in self
            .stream
            .by_ref()
        {
            match Record::decode(&raw)
            {
                Decoded::Record(r) =>
                {
                    self.records += 1;
                    return Some(r);
                }
                Decoded::Skip(_) => self.skipped += 1,
            }
        }
        None
    }
}
