use record::IndexEntry;
use std::path::PathBuf;

use crate::error::Result;
use crate::file::RecordFile;

/// File-backed sparse index: `(key, offset)` pairs in ascending key order.
///
/// The index is never loaded whole. [`floor`](SparseIndex::floor) binary
/// searches the file and reads one entry per comparison.
pub struct SparseIndex {
    entries: RecordFile<IndexEntry>,
}

impl SparseIndex {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            entries: RecordFile::open(path)?,
        })
    }

    pub fn len(&self) -> Result<u64> {
        self.entries.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.entries.is_empty()
    }

    /// Entry number `i`, or `None` past the end.
    pub fn entry(&mut self, i: u64) -> Result<Option<IndexEntry>> {
        self.entries.get(i)
    }

    /// The entry with the greatest key `<= key`.
    ///
    /// Returns `None` when the index is empty or every entry is greater.
    pub fn floor(&mut self, key: i64) -> Result<Option<IndexEntry>> {
        let mut lo = 0u64;
        let mut hi = self.len()?;
        let mut best = None;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let Some(entry) = self.entries.get(mid)? else {
                break;
            };
            if entry.key <= key {
                best = Some(entry);
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(best)
    }

    /// Appends one entry; the caller keeps keys ascending.
    pub fn push(&mut self, entry: IndexEntry) -> Result<()> {
        self.entries.append(&entry)?;
        Ok(())
    }

    /// Replaces every entry.
    pub fn rewrite<I>(&mut self, entries: I) -> Result<u64>
    where
        I: IntoIterator<Item = IndexEntry>,
    {
        self.entries.rewrite(entries)
    }

    /// Reads all entries. Intended for reports and verification.
    pub fn entries(&mut self) -> Result<Vec<IndexEntry>> {
        let mut out = Vec::new();
        for item in self.entries.scan()? {
            out.push(item?.1);
        }
        Ok(out)
    }

    pub(crate) fn file(&mut self) -> &mut RecordFile<IndexEntry> {
        &mut self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn index_with(keys: &[i64]) -> anyhow::Result<(tempfile::TempDir, SparseIndex)> {
        let dir = tempdir()?;
        let mut idx = SparseIndex::open(dir.path().join("t.idx"))?;
        idx.rewrite(keys.iter().enumerate().map(|(i, &k)| IndexEntry::new(k, i as u64 * 100)))?;
        Ok((dir, idx))
    }

    #[test]
    fn floor_finds_greatest_key_not_above_target() -> anyhow::Result<()> {
        let (_dir, mut idx) = index_with(&[10, 20, 30, 40])?;
        assert_eq!(idx.floor(10)?.map(|e| e.key), Some(10));
        assert_eq!(idx.floor(25)?.map(|e| e.key), Some(20));
        assert_eq!(idx.floor(99)?.map(|e| e.offset), Some(300));
        Ok(())
    }

    #[test]
    fn floor_below_first_key_is_none() -> anyhow::Result<()> {
        let (_dir, mut idx) = index_with(&[10, 20])?;
        assert!(idx.floor(9)?.is_none());
        Ok(())
    }

    #[test]
    fn empty_index() -> anyhow::Result<()> {
        let (_dir, mut idx) = index_with(&[])?;
        assert!(idx.is_empty()?);
        assert!(idx.floor(1)?.is_none());
        Ok(())
    }

    #[test]
    fn push_extends_and_entries_reads_all() -> anyhow::Result<()> {
        let (_dir, mut idx) = index_with(&[1])?;
        idx.push(IndexEntry::new(5, 100))?;
        assert_eq!(idx.len()?, 2);
        assert_eq!(idx.entry(1)?, Some(IndexEntry::new(5, 100)));
        assert_eq!(
            idx.entries()?,
            vec![IndexEntry::new(1, 0), IndexEntry::new(5, 100)]
        );
        Ok(())
    }
}
