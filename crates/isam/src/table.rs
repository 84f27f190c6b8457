use extsort::{write_indexed, Dedup, MergeStats};
use record::FixedRecord;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::error::Result;
use crate::file::RecordFile;
use crate::index::SparseIndex;

/// A record found on disk together with its byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<R> {
    pub offset: u64,
    pub record: R,
}

/// A key-ordered data file paired with its sparse index.
///
/// ```text
///  index:  (k0, 0)            (kG, G*SIZE)          (k2G, 2G*SIZE)
///            │                   │                     │
///  data:   [r0 r1 ... rG-1]    [rG ... r2G-1]        [r2G ...]
/// ```
///
/// A lookup binary searches the index for the floor entry and then probes at
/// most `gap` live records forward from its offset.
pub struct SparseTable<R> {
    data: RecordFile<R>,
    index: SparseIndex,
    gap: usize,
}

impl<R: FixedRecord> SparseTable<R> {
    pub fn open(data: impl Into<PathBuf>, index: impl Into<PathBuf>, gap: usize) -> Result<Self> {
        Ok(Self {
            data: RecordFile::open(data)?,
            index: SparseIndex::open(index)?,
            gap: gap.max(1),
        })
    }

    pub fn data(&mut self) -> &mut RecordFile<R> {
        &mut self.data
    }

    pub fn index(&mut self) -> &mut SparseIndex {
        &mut self.index
    }

    pub fn gap(&self) -> usize {
        self.gap
    }

    pub fn len(&self) -> Result<u64> {
        self.data.len()
    }

    /// Bounded probe for a live record with `key`.
    ///
    /// Starts at the index floor of `key` and stops at the first greater key,
    /// after `gap` live records, or at byte `end`. Removed records are skipped
    /// and do not count toward the bound.
    pub fn probe(&mut self, key: i64, end: u64) -> Result<Option<Located<R>>> {
        let Some(start) = self.index.floor(key)? else {
            return Ok(None);
        };
        let mut live = 0usize;
        for item in self.data.scan_from(start.offset)? {
            let (offset, record) = item?;
            if offset >= end {
                break;
            }
            if record.is_removed() {
                continue;
            }
            live += 1;
            if record.key() == key {
                return Ok(Some(Located { offset, record }));
            }
            if record.key() > key || live >= self.gap {
                break;
            }
        }
        Ok(None)
    }

    /// Probe over the whole file.
    pub fn find(&mut self, key: i64) -> Result<Option<Located<R>>> {
        let end = self.data.byte_len()?;
        self.probe(key, end)
    }

    /// Linear scan from byte `start` to the end for a live record with `key`.
    pub fn scan_for(&mut self, key: i64, start: u64) -> Result<Option<Located<R>>> {
        for item in self.data.scan_from(start)? {
            let (offset, record) = item?;
            if !record.is_removed() && record.key() == key {
                return Ok(Some(Located { offset, record }));
            }
        }
        Ok(None)
    }

    /// Replaces data and index with `records`, which must be sorted by key.
    ///
    /// The index gets an entry every `gap` records, first record included.
    pub fn rewrite<I>(&mut self, records: I) -> Result<MergeStats>
    where
        I: IntoIterator<Item = R>,
    {
        self.data.truncate()?;
        self.index.file().truncate()?;

        let mut out = BufWriter::new(self.data.handle());
        let mut idx = BufWriter::new(self.index.file().handle());
        let records = records.into_iter().map(Ok);
        let stats = write_indexed(records, &mut out, &mut idx, self.gap, Dedup::Keep)?;
        out.flush()?;
        idx.flush()?;
        Ok(stats)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.data.sync()?;
        self.index.file().sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use record::{CategorySummary, IndexEntry, Order, TOMBSTONE};
    use tempfile::{tempdir, TempDir};

    fn order(key: i64) -> Order {
        Order {
            timestamp: "2021-03-04".into(),
            order_id: key,
            ..Order::default()
        }
    }

    fn table(keys: &[i64], gap: usize) -> anyhow::Result<(TempDir, SparseTable<Order>)> {
        let dir = tempdir()?;
        let mut t = SparseTable::open(dir.path().join("t.dat"), dir.path().join("t.idx"), gap)?;
        t.rewrite(keys.iter().map(|&k| order(k)))?;
        Ok((dir, t))
    }

    #[test]
    fn rewrite_indexes_every_gap_records() -> anyhow::Result<()> {
        let (_dir, mut t) = table(&[2, 4, 6, 8, 10], 2)?;
        assert_eq!(
            t.index().entries()?,
            vec![
                IndexEntry::new(2, 0),
                IndexEntry::new(6, 2 * Order::SIZE as u64),
                IndexEntry::new(10, 4 * Order::SIZE as u64),
            ]
        );
        Ok(())
    }

    #[test]
    fn find_hits_every_key() -> anyhow::Result<()> {
        let keys: Vec<i64> = (1..=20).map(|k| k * 3).collect();
        let (_dir, mut t) = table(&keys, 4)?;
        for (n, &k) in keys.iter().enumerate() {
            let hit = t.find(k)?.expect("present");
            assert_eq!(hit.record.order_id, k);
            assert_eq!(hit.offset, Order::offset_of(n as u64));
        }
        assert!(t.find(4)?.is_none());
        assert!(t.find(0)?.is_none());
        assert!(t.find(1000)?.is_none());
        Ok(())
    }

    #[test]
    fn removed_records_are_skipped_and_not_counted() -> anyhow::Result<()> {
        let (_dir, mut t) = table(&[1, 2, 3, 4], 2)?;
        t.data().write_byte_at(Order::offset_of(1), TOMBSTONE)?;
        assert!(t.find(2)?.is_none());
        // entries at 1 and 3; probing from 1 must see past the tombstone
        t.index().rewrite([IndexEntry::new(1, 0)])?;
        assert_eq!(t.find(3)?.map(|l| l.record.order_id), Some(3));
        Ok(())
    }

    #[test]
    fn probe_stops_after_gap_live_records() -> anyhow::Result<()> {
        let keys: Vec<i64> = (1..=10).collect();
        let (_dir, mut t) = table(&keys, 3)?;
        // one entry for the whole file: key 5 is four live records past the floor
        t.index().rewrite([IndexEntry::new(1, 0)])?;
        let end = t.data().byte_len()?;

        assert_eq!(t.probe(3, end)?.map(|l| l.record.order_id), Some(3));
        assert!(t.probe(4, end)?.is_none());
        assert!(t.probe(5, end)?.is_none());
        let hit = t.scan_for(5, 0)?.expect("linear scan hit");
        assert_eq!(hit.offset, Order::offset_of(4));

        // a removed record inside the window does not use up the bound
        t.data().write_byte_at(Order::offset_of(1), TOMBSTONE)?;
        assert_eq!(t.probe(4, end)?.map(|l| l.record.order_id), Some(4));
        assert!(t.probe(5, end)?.is_none());
        Ok(())
    }

    #[test]
    fn probe_respects_end_bound()-> anyhow::Result<()> {
        let (_dir, mut t) = table(&[1, 2, 3], 10)?;
        assert!(t.probe(3, Order::offset_of(2))?.is_none());
        assert!(t.probe(2, Order::offset_of(2))?.is_some());
        Ok(())
    }

    #[test]
    fn scan_for_covers_unordered_records() -> anyhow::Result<()> {
        let (_dir, mut t) = table(&[5, 10], 1)?;
        t.data().append(&order(7))?;
        let hit = t.scan_for(7, Order::offset_of(2))?.expect("tail hit");
        assert_eq!(hit.offset, Order::offset_of(2));
        assert!(t.scan_for(5, Order::offset_of(1))?.is_none());
        Ok(())
    }

    #[test]
    fn works_for_category_summaries() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut t = SparseTable::<CategorySummary>::open(
            dir.path().join("c.dat"),
            dir.path().join("c.idx"),
            1000,
        )?;
        t.rewrite([CategorySummary::new(3, "ring"), CategorySummary::new(8, "pendant")])?;
        let hit = t.find(8)?.expect("category 8");
        assert_eq!(hit.record.alias, "pendant");
        assert_eq!(hit.offset, CategorySummary::SIZE as u64);
        Ok(())
    }
}
