//! Streaming JSON array writer.
//!
//! Serializes accepted items into a single JSON array without keeping the
//! whole result set in memory. Items are buffered into chunks of
//! `chunk_size` and written out whenever a chunk fills; [`finish`] writes the
//! residual chunk and the closing bracket.
//!
//! The document layout is one compact item per line:
//!
//! ```text
//! [
//! {"number":1,"title":"...","body":"...","url":"..."},
//! {"number":2,"title":"...","body":"...","url":"..."}
//! ]
//! ```
//!
//! With an envelope key the same array is wrapped in an object:
//! `{"responses":[ ... ]}`. An empty crawl yields `[]` (or
//! `{"responses":[]}`), which is still a valid document.
//!
//! [`finish`]: StreamingArrayWriter::finish

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::crawl::CrawlError;

/// Extension every output document carries.
pub const OUTPUT_EXTENSION: &str = "json";

pub struct StreamingArrayWriter<T, W: Write> {
    sink: W,
    chunk_size: usize,
    pending: Vec<T>,
    wrote_first: bool,
    written: u64,
    flushes: u64,
    envelope: Option<String>,
}

impl<T: Serialize> StreamingArrayWriter<T, BufWriter<File>> {
    /// Create (or truncate) the output file and write the opening delimiter.
    ///
    /// The path is normalized with [`normalize_output_path`] and missing
    /// parent directories are created.
    pub fn create(
        path: &Path,
        chunk_size: usize,
        envelope: Option<&str>,
    ) -> Result<(Self, PathBuf), CrawlError> {
        let path = normalize_output_path(path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&path)?;
        let writer = Self::new(BufWriter::new(file), chunk_size, envelope)?;
        Ok((writer, path))
    }
}

impl<T: Serialize, W: Write> StreamingArrayWriter<T, W> {
    /// Wrap `sink` and write the opening delimiter immediately.
    pub fn new(mut sink: W, chunk_size: usize, envelope: Option<&str>) -> Result<Self, CrawlError> {
        match envelope {
            Some(key) => {
                sink.write_all(b"{")?;
                serde_json::to_writer(&mut sink, key)?;
                sink.write_all(b":[")?;
            }
            None => sink.write_all(b"[")?,
        }
        Ok(Self {
            sink,
            chunk_size: chunk_size.max(1),
            pending: Vec::new(),
            wrote_first: false,
            written: 0,
            flushes: 0,
            envelope: envelope.map(str::to_string),
        })
    }

    /// Queue one item, flushing when the chunk is full.
    pub fn push(&mut self, item: T) -> Result<(), CrawlError> {
        self.pending.push(item);
        if self.pending.len() >= self.chunk_size {
            self.flush_pending()?;
        }
        Ok(())
    }

    /// Write a batch of items directly, bypassing the chunk buffer.
    ///
    /// Anything still pending is written first so insertion order holds.
    pub fn write_batch(&mut self, items: Vec<T>) -> Result<(), CrawlError> {
        self.flush_pending()?;
        self.write_items(items)
    }

    /// Number of items queued but not yet written.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Items written or queued so far.
    pub fn accepted(&self) -> u64 {
        self.written + self.pending.len() as u64
    }

    /// Number of chunk flushes performed.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Flush the residual chunk, close the array and return the sink together
    /// with the total item count.
    pub fn finish(mut self) -> Result<(W, u64), CrawlError> {
        self.flush_pending()?;
        if self.wrote_first {
            self.sink.write_all(b"\n")?;
        }
        self.sink.write_all(b"]")?;
        if self.envelope.is_some() {
            self.sink.write_all(b"}")?;
        }
        self.sink.write_all(b"\n")?;
        self.sink.flush()?;
        Ok((self.sink, self.written))
    }

    fn flush_pending(&mut self) -> Result<(), CrawlError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.pending);
        tracing::debug!(count = chunk.len(), "Flushing chunk");
        self.write_items(chunk)
    }

    fn write_items(&mut self, items: Vec<T>) -> Result<(), CrawlError> {
        if items.is_empty() {
            return Ok(());
        }
        for item in &items {
            if self.wrote_first {
                self.sink.write_all(b",\n")?;
            } else {
                self.sink.write_all(b"\n")?;
                self.wrote_first = true;
            }
            serde_json::to_writer(&mut self.sink, item)?;
            self.written += 1;
        }
        self.flushes += 1;
        Ok(())
    }
}

/// Expand a leading `~/` and append `.json` if the path lacks it.
pub fn normalize_output_path(path: &Path) -> PathBuf {
    let mut path = expand_home(path);
    let has_ext = path
        .extension()
        .map(|e| e == OUTPUT_EXTENSION)
        .unwrap_or(false);
    if !has_ext {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(OUTPUT_EXTENSION);
        path = PathBuf::from(name);
    }
    path
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
