//! Codec trait and fixed-width field helpers shared by every record kind.

use std::io::{self, Read, Write};
use std::marker::PhantomData;

/// Sentinel written over the first timestamp byte of a removed order.
pub const TOMBSTONE: u8 = b'*';

pub const TIMESTAMP_WIDTH: usize = 30;
pub const ALIAS_WIDTH: usize = 30;
pub const COLOR_WIDTH: usize = 10;
pub const METAL_WIDTH: usize = 10;
pub const GEM_WIDTH: usize = 25;

const PADDING: [u8; 32] = [0u8; 32];

/// A record with a fixed encoded size and an `i64` ordering key.
///
/// Implementors must write exactly [`SIZE`](FixedRecord::SIZE) bytes in
/// [`encode`](FixedRecord::encode) and consume exactly as many in
/// [`decode`](FixedRecord::decode); the file layer relies on this to address
/// record `n` at `n * SIZE`.
pub trait FixedRecord: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Ordering key of the record.
    fn key(&self) -> i64;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()>;

    fn decode<R: Read>(r: &mut R) -> io::Result<Self>;

    /// Whether the record carries a tombstone. Only orders can be removed.
    fn is_removed(&self) -> bool {
        false
    }

    /// Decodes a record from a buffer of at least `SIZE` bytes.
    fn from_bytes(buf: &[u8]) -> io::Result<Self> {
        let mut slice = buf;
        Self::decode(&mut slice)
    }

    /// Byte offset of record number `n`.
    fn offset_of(n: u64) -> u64 {
        n * Self::SIZE as u64
    }
}

/// Returns the longest prefix of `s` that fits in `width` bytes without
/// splitting a character.
pub fn truncate_to_width(s: &str, width: usize) -> &str {
    if s.len() <= width {
        return s;
    }
    let mut end = width;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Writes `s` as a zero-padded field of exactly `width` bytes.
pub fn write_fixed_str<W: Write>(w: &mut W, s: &str, width: usize) -> io::Result<()> {
    debug_assert!(width <= PADDING.len());
    let bytes = truncate_to_width(s, width).as_bytes();
    w.write_all(bytes)?;
    w.write_all(&PADDING[..width - bytes.len()])
}

/// Reads a `width`-byte field, stopping the string at the first NUL.
pub fn read_fixed_str<R: Read>(r: &mut R, width: usize) -> io::Result<String> {
    let mut buf = [0u8; 32];
    let field = &mut buf[..width];
    r.read_exact(field)?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    Ok(String::from_utf8_lossy(&field[..end]).into_owned())
}

/// Sequential reader yielding `(byte_offset, record)` pairs.
///
/// The offset is the position of the record relative to the start of the
/// file, given the position the stream was created at. A clean end of file
/// ends the stream; a trailing partial record is reported as
/// [`io::ErrorKind::UnexpectedEof`].
pub struct RecordStream<R, S> {
    src: S,
    buf: Vec<u8>,
    pos: u64,
    _record: PhantomData<R>,
}

impl<R: FixedRecord, S: Read> RecordStream<R, S> {
    pub fn new(src: S) -> Self {
        Self::starting_at(src, 0)
    }

    /// Wraps a source already positioned at byte offset `pos`.
    pub fn starting_at(src: S, pos: u64) -> Self {
        Self {
            src,
            buf: vec![0u8; R::SIZE],
            pos,
            _record: PhantomData,
        }
    }

    /// Byte offset of the next record to be read.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn next_record(&mut self) -> io::Result<Option<(u64, R)>> {
        let mut filled = 0;
        while filled < R::SIZE {
            match self.src.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < R::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "truncated record at offset {}: {} of {} bytes",
                    self.pos,
                    filled,
                    R::SIZE
                ),
            ));
        }
        let record = R::from_bytes(&self.buf)?;
        let at = self.pos;
        self.pos += R::SIZE as u64;
        Ok(Some((at, record)))
    }
}

impl<R: FixedRecord, S: Read> Iterator for RecordStream<R, S> {
    type Item = io::Result<(u64, R)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
