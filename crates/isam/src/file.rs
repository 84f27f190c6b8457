use record::{FixedRecord, RecordStream};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::error::{IsamError, Result};

/// A flat file of fixed-width records, record `n` at byte `n * R::SIZE`.
///
/// The handle is opened once and held until the value is dropped. Every
/// access seeks explicitly, so reads and writes can be interleaved freely.
pub struct RecordFile<R> {
    path: PathBuf,
    file: File,
    _record: PhantomData<R>,
}

fn open_rw(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}

impl<R: FixedRecord> RecordFile<R> {
    /// Opens `path` for reading and writing, creating an empty file if absent.
    ///
    /// # Errors
    ///
    /// Returns [`IsamError::Corrupt`] when the file length is not a whole
    /// number of records.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = open_rw(&path)?;
        let this = Self {
            path,
            file,
            _record: PhantomData,
        };
        this.len()?;
        Ok(this)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn byte_len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Number of records in the file.
    pub fn len(&self) -> Result<u64> {
        let bytes = self.byte_len()?;
        if bytes % R::SIZE as u64 != 0 {
            return Err(IsamError::Corrupt {
                path: self.path.clone(),
                reason: format!("length {bytes} is not a multiple of {}", R::SIZE),
            });
        }
        Ok(bytes / R::SIZE as u64)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.byte_len()? == 0)
    }

    /// Reads the record at byte `offset`, or `None` at or past the end.
    pub fn read_at(&mut self, offset: u64) -> Result<Option<R>> {
        if offset + R::SIZE as u64 > self.byte_len()? {
            return Ok(None);
        }
        let mut buf = vec![0u8; R::SIZE];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf)?;
        Ok(Some(R::from_bytes(&buf)?))
    }

    /// Reads record number `n`.
    pub fn get(&mut self, n: u64) -> Result<Option<R>> {
        self.read_at(R::offset_of(n))
    }

    /// Overwrites the record at byte `offset`.
    pub fn write_at(&mut self, offset: u64, record: &R) -> Result<()> {
        let mut buf = Vec::with_capacity(R::SIZE);
        record.encode(&mut buf)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&buf)?;
        Ok(())
    }

    /// Overwrites a single byte, used to stamp tombstones in place.
    pub fn write_byte_at(&mut self, offset: u64, byte: u8) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&[byte])?;
        Ok(())
    }

    /// Appends a record and returns its byte offset.
    pub fn append(&mut self, record: &R) -> Result<u64> {
        let offset = self.len()? * R::SIZE as u64;
        self.write_at(offset, record)?;
        Ok(offset)
    }

    /// Streams records from byte `offset` to the end of the file.
    pub fn scan_from(&mut self, offset: u64) -> Result<RecordStream<R, BufReader<&File>>> {
        let mut handle = &self.file;
        handle.seek(SeekFrom::Start(offset))?;
        Ok(RecordStream::starting_at(BufReader::new(handle), offset))
    }

    pub fn scan(&mut self) -> Result<RecordStream<R, BufReader<&File>>> {
        self.scan_from(0)
    }

    /// Replaces the whole contents with `records`, returning how many were written.
    pub fn rewrite<I>(&mut self, records: I) -> Result<u64>
    where
        I: IntoIterator<Item = R>,
    {
        self.truncate()?;
        let mut w = BufWriter::new(&self.file);
        let mut written = 0u64;
        for record in records {
            record.encode(&mut w)?;
            written += 1;
        }
        w.flush()?;
        Ok(written)
    }

    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Moves `src` over this file and reopens the handle on the new contents.
    pub fn replace_with(&mut self, src: &Path) -> Result<()> {
        fs::rename(src, &self.path)?;
        self.file = open_rw(&self.path)?;
        self.len()?;
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Raw handle, for writers that stream through their own buffer.
    pub(crate) fn handle(&self) -> &File {
        &self.file
    }
}
