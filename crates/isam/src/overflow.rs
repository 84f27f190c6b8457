use record::{FixedRecord, Order, OverflowRecord, TIMESTAMP_OFFSET, TOMBSTONE};
use std::path::PathBuf;

use crate::error::Result;
use crate::file::RecordFile;
use crate::table::Located;

/// Unordered append log for orders whose target block was full.
///
/// Each entry remembers the block it was destined for. Lookups scan the whole
/// log, so it is meant to stay small relative to the primary file and be
/// folded back in by reorganization.
pub struct OverflowLog {
    file: RecordFile<OverflowRecord>,
}

impl OverflowLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            file: RecordFile::open(path)?,
        })
    }

    /// Number of entries, removed ones included.
    pub fn len(&self) -> Result<u64> {
        self.file.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.file.is_empty()
    }

    pub fn byte_len(&self) -> Result<u64> {
        self.file.byte_len()
    }

    /// Appends `order` tagged with its intended block offset.
    pub fn append(&mut self, order: Order, origin_block: u64) -> Result<u64> {
        self.file.append(&OverflowRecord::new(order, origin_block))
    }

    /// First live entry whose order has `key`.
    pub fn find(&mut self, key: i64) -> Result<Option<Located<OverflowRecord>>> {
        for item in self.file.scan()? {
            let (offset, record) = item?;
            if !record.is_removed() && record.key() == key {
                return Ok(Some(Located { offset, record }));
            }
        }
        Ok(None)
    }

    /// Stamps the tombstone on the entry at `offset`.
    pub fn mark_removed(&mut self, offset: u64) -> Result<()> {
        self.file.write_byte_at(offset + TIMESTAMP_OFFSET, TOMBSTONE)
    }

    /// Every entry, removed ones included, in log order.
    pub fn records(&mut self) -> Result<Vec<OverflowRecord>> {
        let mut out = Vec::new();
        for item in self.file.scan()? {
            out.push(item?.1);
        }
        Ok(out)
    }

    /// Visits every order in log order, removed ones included.
    pub fn for_each<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(Order) -> Result<()>,
    {
        for item in self.file.scan()? {
            f(item?.1.order)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.file.truncate()
    }

    pub fn sync(&self) -> Result<()> {
        self.file.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use record::NO_LINK;
    use tempfile::tempdir;

    fn order(key: i64) -> Order {
        Order {
            timestamp: "2019-07-01".into(),
            order_id: key,
            ..Order::default()
        }
    }

    #[test]
    fn append_then_find() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut log = OverflowLog::open(dir.path().join("o.ovf"))?;
        log.append(order(3), 0)?;
        let off = log.append(order(8), 154 * 100)?;

        let hit = log.find(8)?.expect("in log");
        assert_eq!(hit.offset, off);
        assert_eq!(hit.record.origin_block, 15_400);
        assert_eq!(hit.record.next, NO_LINK);
        assert!(log.find(4)?.is_none());
        Ok(())
    }

    #[test]
    fn removed_entries_are_invisible() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut log = OverflowLog::open(dir.path().join("o.ovf"))?;
        let off = log.append(order(3), 0)?;
        assert!(log.find(3)?.is_some());

        log.mark_removed(off)?;
        assert!(log.find(3)?.is_none());
        assert!(log.records()?[0].is_removed());
        assert_eq!(log.len()?, 1);

        let mut live = 0;
        log.for_each(|o| {
            if !o.is_removed() {
                live += 1;
            }
            Ok(())
        })?;
        assert_eq!(live, 0);
        Ok(())
    }

    #[test]
    fn clear_empties_the_log() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut log = OverflowLog::open(dir.path().join("o.ovf"))?;
        log.append(order(1), 0)?;
        log.clear()?;
        assert!(log.is_empty()?);
        assert!(log.records()?.is_empty());
        Ok(())
    }
}
