//! Index rebuild, category rebuild and data reorganization.
//!
//! ```text
//!  rebuild_index       orders.dat ──scan──► orders.idx        (live records of the ordered prefix)
//!  rebuild_categories  orders.dat + orders.ovf + items.dat ──► categories.dat + categories.idx
//!  reorganize          live orders ──runs──► merge ──► orders.dat + orders.idx, orders.ovf emptied
//! ```

use extsort::{merge_runs, CategoryAggregator, Dedup, MergeOptions, RunSpooler};
use record::{FixedRecord, IndexEntry, Order};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;
use crate::store::Store;

/// Counts removals since the last index rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalTracker {
    pending: usize,
    threshold: usize,
}

impl RemovalTracker {
    pub fn new(threshold: usize) -> Self {
        Self {
            pending: 0,
            threshold: threshold.max(1),
        }
    }

    /// Records one removal and reports whether a rebuild is now due.
    pub fn record(&mut self) -> bool {
        self.pending += 1;
        self.pending >= self.threshold
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn reset(&mut self) {
        self.pending = 0;
    }
}

/// Outcome of [`Store::rebuild_index`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexRebuild {
    /// Records in the primary file, removed ones included.
    pub records: u64,
    pub live: u64,
    /// Length of the key-ordered prefix.
    pub ordered: u64,
    pub entries: u64,
}

/// Outcome of [`Store::reorganize`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reorganization {
    /// Live orders in the new primary file.
    pub records: u64,
    /// Removed orders discarded.
    pub dropped: u64,
    /// Orders moved in from the overflow log.
    pub from_overflow: u64,
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

impl Store {
    /// Re-derives the order index and resets the removal counter.
    ///
    /// The primary file is scanned once. Its ordered prefix ends at the first
    /// record whose key is below its predecessor's; records after that point
    /// are the unordered tail. Within the prefix every `index_gap`-th live
    /// record gets an entry, the first live record included, so removed keys
    /// never appear in the index.
    pub fn rebuild_index(&mut self) -> Result<IndexRebuild> {
        let gap = self.orders.gap() as u64;
        let mut report = IndexRebuild::default();
        let mut entries = Vec::new();
        let mut prev: Option<i64> = None;
        let mut in_prefix = true;
        let mut prefix_live = 0u64;

        for item in self.orders.data().scan()? {
            let (offset, order) = item?;
            report.records += 1;
            let live = !order.is_removed();
            if live {
                report.live += 1;
            }
            if !in_prefix {
                continue;
            }
            if prev.is_some_and(|p| order.order_id < p) {
                in_prefix = false;
                continue;
            }
            prev = Some(order.order_id);
            report.ordered += 1;
            if live {
                if prefix_live % gap == 0 {
                    entries.push(IndexEntry::new(order.order_id, offset));
                }
                prefix_live += 1;
            }
        }

        report.entries = self.orders.index().rewrite(entries)?;
        self.ordered_len = report.ordered;
        self.removals.reset();
        info!(
            records = report.records,
            live = report.live,
            ordered = report.ordered,
            entries = report.entries,
            "order index rebuilt"
        );
        Ok(report)
    }

    /// Recomputes every category summary from scratch.
    ///
    /// Totals count live orders from the primary file and the overflow log.
    /// A category seen only on removed orders is kept with zero totals.
    /// `product_count` is recounted from the catalog.
    pub fn rebuild_categories(&mut self) -> Result<u64> {
        let mut agg = CategoryAggregator::new();
        for item in self.orders.data().scan()? {
            let (_, order) = item?;
            if order.is_removed() {
                agg.register(&order);
            } else {
                agg.observe(&order);
            }
        }
        self.overflow.for_each(|order| {
            if order.is_removed() {
                agg.register(&order);
            } else {
                agg.observe(&order);
            }
            Ok(())
        })?;
        for item in self.items.data().scan()? {
            let (_, product) = item?;
            agg.count_product(product.category_id);
        }

        let stats = self.categories.rewrite(agg.into_summaries())?;
        info!(categories = stats.records, "category file rebuilt");
        Ok(stats.records)
    }

    /// Rebuilds the order index and the category file.
    pub fn rebuild_all(&mut self) -> Result<(IndexRebuild, u64)> {
        let index = self.rebuild_index()?;
        let categories = self.rebuild_categories()?;
        Ok((index, categories))
    }

    /// Rewrites the primary file with only live orders, in key order.
    ///
    /// Live orders from the primary file and the overflow log are spooled into
    /// sorted runs and merged into a temporary file that then replaces
    /// `orders.dat`; the index is regenerated by the same merge and the
    /// overflow log is emptied. Category totals are unaffected.
    pub fn reorganize(&mut self) -> Result<Reorganization> {
        let runs_dir = self.layout.runs_dir();
        let mut spool = RunSpooler::<Order>::new(&runs_dir, "reorg", self.config.memory_limit)?;
        let mut report = Reorganization::default();

        for item in self.orders.data().scan()? {
            let (_, order) = item?;
            if order.is_removed() {
                report.dropped += 1;
            } else {
                spool.push(order)?;
            }
        }
        self.overflow.for_each(|order| {
            if order.is_removed() {
                report.dropped += 1;
            } else {
                report.from_overflow += 1;
                spool.push(order)?;
            }
            Ok(())
        })?;
        let runs = spool.finish()?;

        let data_tmp = tmp_path(&self.layout.orders());
        let index_tmp = tmp_path(&self.layout.orders_index());
        let opts = MergeOptions {
            index_gap: self.config.index_gap,
            dedup: Dedup::Keep,
            write_buffer: self.config.write_buffer,
        };
        let merged = merge_runs::<Order>(&runs, &data_tmp, &index_tmp, opts)?;

        self.orders.data().replace_with(&data_tmp)?;
        self.orders.index().file().replace_with(&index_tmp)?;
        self.overflow.clear()?;
        if let Err(err) = fs::remove_dir(&runs_dir) {
            debug!(dir = %runs_dir.display(), %err, "run directory left in place");
        }

        report.records = merged.records;
        self.ordered_len = merged.records;
        self.removals.reset();
        info!(
            records = report.records,
            dropped = report.dropped,
            from_overflow = report.from_overflow,
            bytes = Order::offset_of(report.records),
            "primary file reorganized"
        );
        Ok(report)
    }
}
