use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::format::FixedRecord;

/// One entry of a sparse index: the key of a record and its byte offset in
/// the indexed data file.
///
/// Index files are flat arrays of entries in ascending key order, one entry
/// per `index_gap` records of the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: i64,
    pub offset: u64,
}

impl IndexEntry {
    pub fn new(key: i64, offset: u64) -> Self {
        Self { key, offset }
    }
}

impl FixedRecord for IndexEntry {
    const SIZE: usize = 8 + 8;

    fn key(&self) -> i64 {
        self.key
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i64::<LittleEndian>(self.key)?;
        w.write_u64::<LittleEndian>(self.offset)?;
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            key: r.read_i64::<LittleEndian>()?,
            offset: r.read_u64::<LittleEndian>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_layout_is_key_then_offset() -> io::Result<()> {
        let mut buf = Vec::new();
        IndexEntry::new(-2, 308).encode(&mut buf)?;
        assert_eq!(buf.len(), IndexEntry::SIZE);
        assert_eq!(&buf[..8], &(-2i64).to_le_bytes());
        assert_eq!(&buf[8..], &308u64.to_le_bytes());
        Ok(())
    }
}
