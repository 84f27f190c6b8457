use record::FixedRecord;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::buffer::RunBuffer;

/// Writes `records` to a new run file at `path`, replacing any previous one.
pub fn write_run<R: FixedRecord>(path: &Path, records: &[R]) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    let mut w = BufWriter::with_capacity(64 * 1024, file);
    for record in records {
        record.encode(&mut w)?;
    }
    w.flush()?;
    Ok(())
}

/// Spools records of one kind into sorted run files of bounded size.
///
/// Runs are named `<prefix>-<n>.run` inside the spool directory and numbered
/// from zero in creation order.
pub struct RunSpooler<R> {
    dir: PathBuf,
    prefix: &'static str,
    buffer: RunBuffer<R>,
    runs: Vec<PathBuf>,
}

impl<R: FixedRecord> RunSpooler<R> {
    /// Creates a spooler writing into `dir`, which is created if missing.
    pub fn new(dir: impl Into<PathBuf>, prefix: &'static str, memory_limit: usize) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            prefix,
            buffer: RunBuffer::new(memory_limit),
            runs: Vec::new(),
        })
    }

    /// Buffers a record, flushing a sorted run when the buffer fills up.
    pub fn push(&mut self, record: R) -> io::Result<()> {
        if self.buffer.push(record) {
            self.flush()?;
        }
        Ok(())
    }

    /// Number of records currently buffered (not yet in a run).
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Run files produced so far.
    pub fn runs(&self) -> &[PathBuf] {
        &self.runs
    }

    /// Sorts and writes the buffered records as the next run.
    ///
    /// Does nothing when the buffer is empty.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.buffer.sort();
        let path = self
            .dir
            .join(format!("{}-{}.run", self.prefix, self.runs.len()));
        write_run(&path, self.buffer.records())?;
        tracing::debug!(
            run = %path.display(),
            records = self.buffer.len(),
            "flushed sorted run"
        );
        self.runs.push(path);
        self.buffer.clear();
        Ok(())
    }

    /// Flushes the remainder and returns every run path.
    pub fn finish(mut self) -> io::Result<Vec<PathBuf>> {
        self.flush()?;
        Ok(self.runs)
    }
}
