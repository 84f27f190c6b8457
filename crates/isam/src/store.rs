use record::{CatalogItem, CategorySummary, FixedRecord, IndexEntry, Order, TIMESTAMP_OFFSET, TOMBSTONE};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::{DataLayout, IsamConfig};
use crate::error::{IsamError, Result};
use crate::maintenance::RemovalTracker;
use crate::overflow::OverflowLog;
use crate::table::SparseTable;

/// Where a live order was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Byte offset in the primary file.
    Primary { offset: u64 },
    /// Byte offset in the overflow log.
    Overflow { offset: u64 },
}

/// Where an inserted order went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The primary file was empty; the order became its first record and the
    /// index was seeded with it.
    Seeded,
    /// Appended to the primary file tail.
    Tail { offset: u64 },
    /// The target block was full; appended to the overflow log.
    Overflow { offset: u64, origin_block: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub placement: Placement,
    /// `false` when the order's category has no summary record.
    pub category_updated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    /// The order as it was before removal.
    pub order: Order,
    pub location: Location,
    pub category_updated: bool,
    /// Whether this removal crossed the threshold and rebuilt the order index.
    pub index_rebuilt: bool,
}

/// The order store: primary file, sparse index, overflow log, catalog and
/// category files, all held open for the store's lifetime.
///
/// # Read path
///
/// 1. Bounded probe over the key-ordered prefix of the primary file.
/// 2. Linear scan of the unordered tail (orders appended after the last
///    rebuild, in arrival order).
/// 3. Linear scan of the overflow log.
///
/// # Write path
///
/// Inserts find their target block through the index. A block holding
/// `block_size` records sends the order to the overflow log; otherwise it is
/// appended to the primary tail. Deletes stamp a tombstone in place and,
/// every `rebuild_threshold` removals, rebuild the order index.
///
/// Category totals follow every insert and delete.
pub struct Store {
    pub(crate) config: IsamConfig,
    pub(crate) layout: DataLayout,
    pub(crate) orders: SparseTable<Order>,
    pub(crate) overflow: OverflowLog,
    pub(crate) items: SparseTable<CatalogItem>,
    pub(crate) categories: SparseTable<CategorySummary>,
    pub(crate) removals: RemovalTracker,
    /// Leading records of the primary file that are in key order and covered
    /// by the index.
    pub(crate) ordered_len: u64,
}

impl Store {
    /// Opens the store in `data_dir`, creating empty files where missing.
    ///
    /// The order index is re-derived on open so that it covers exactly the
    /// key-ordered prefix of the primary file. Opening therefore costs one
    /// full scan of `orders.dat` plus a rewrite of `orders.idx`, even for a
    /// single lookup; the index read from disk is never trusted as is.
    pub fn open(data_dir: impl Into<PathBuf>, config: IsamConfig) -> Result<Self> {
        config.validate()?;
        let layout = DataLayout::new(data_dir);
        fs::create_dir_all(layout.dir())?;

        let gap = config.index_gap;
        let mut store = Self {
            orders: SparseTable::open(layout.orders(), layout.orders_index(), gap)?,
            overflow: OverflowLog::open(layout.overflow())?,
            items: SparseTable::open(layout.items(), layout.items_index(), gap)?,
            categories: SparseTable::open(layout.categories(), layout.categories_index(), gap)?,
            removals: RemovalTracker::new(config.rebuild_threshold),
            ordered_len: 0,
            config,
            layout,
        };
        store.rebuild_index()?;

        info!(
            dir = %store.layout.dir().display(),
            orders = store.orders.len()?,
            overflow = store.overflow.len()?,
            items = store.items.len()?,
            categories = store.categories.len()?,
            "store opened"
        );
        Ok(store)
    }

    pub fn config(&self) -> &IsamConfig {
        &self.config
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Removals since the last index rebuild.
    pub fn pending_removals(&self) -> usize {
        self.removals.pending()
    }

    /// Syncs every file and releases the handles.
    pub fn close(mut self) -> Result<()> {
        self.orders.sync()?;
        self.overflow.sync()?;
        self.items.sync()?;
        self.categories.sync()?;
        info!(dir = %self.layout.dir().display(), "store closed");
        Ok(())
    }

    /// Returns the live order with `key`, if any.
    pub fn lookup(&mut self, key: i64) -> Result<Option<Order>> {
        Ok(self.locate(key)?.map(|(_, order)| order))
    }

    /// Returns the live order with `key` and where it lives.
    pub fn locate(&mut self, key: i64) -> Result<Option<(Location, Order)>> {
        let ordered_end = Order::offset_of(self.ordered_len);
        if let Some(hit) = self.orders.probe(key, ordered_end)? {
            return Ok(Some((Location::Primary { offset: hit.offset }, hit.record)));
        }
        if let Some(hit) = self.orders.scan_for(key, ordered_end)? {
            debug!(key, offset = hit.offset, "found in unordered tail");
            return Ok(Some((Location::Primary { offset: hit.offset }, hit.record)));
        }
        if let Some(hit) = self.overflow.find(key)? {
            debug!(key, offset = hit.offset, "found in overflow log");
            return Ok(Some((Location::Overflow { offset: hit.offset }, hit.record.order)));
        }
        Ok(None)
    }

    pub fn lookup_item(&mut self, product_id: i64) -> Result<Option<CatalogItem>> {
        Ok(self.items.find(product_id)?.map(|hit| hit.record))
    }

    pub fn lookup_category(&mut self, category_id: i64) -> Result<Option<CategorySummary>> {
        Ok(self.categories.find(category_id)?.map(|hit| hit.record))
    }

    /// Inserts a new order and adds it to its category totals.
    ///
    /// # Errors
    ///
    /// [`IsamError::DuplicateKey`] when a live order already has the key, and
    /// [`IsamError::InvalidRecord`] when the order already carries the
    /// removal marker.
    pub fn insert(&mut self, order: Order) -> Result<InsertOutcome> {
        let key = order.order_id;
        if order.is_removed() {
            return Err(IsamError::InvalidRecord(format!(
                "order {key} starts with the removal marker"
            )));
        }
        if self.locate(key)?.is_some() {
            return Err(IsamError::DuplicateKey(key));
        }

        let category_id = order.category_id;
        let quantity = i64::from(order.quantity);
        let revenue = order.revenue();

        let total = self.orders.len()?;
        let placement = if total == 0 {
            let offset = self.orders.data().append(&order)?;
            self.orders.index().rewrite([IndexEntry::new(key, offset)])?;
            self.ordered_len = 1;
            Placement::Seeded
        } else {
            let block = self.orders.index().floor(key)?.map_or(0, |e| e.offset);
            let block_size = self.config.block_size as u64;
            let resident = total.saturating_sub(block / Order::SIZE as u64).min(block_size);
            if resident >= block_size {
                let offset = self.overflow.append(order, block)?;
                Placement::Overflow {
                    offset,
                    origin_block: block,
                }
            } else {
                Placement::Tail {
                    offset: self.orders.data().append(&order)?,
                }
            }
        };
        debug!(key, ?placement, "order inserted");

        let category_updated = self.adjust_category(category_id, quantity, revenue)?;
        Ok(InsertOutcome {
            placement,
            category_updated,
        })
    }

    /// Tombstones the live order with `key`.
    ///
    /// Returns `None`, with nothing changed, when no live order has the key.
    pub fn delete(&mut self, key: i64) -> Result<Option<DeleteOutcome>> {
        let Some((location, order)) = self.locate(key)? else {
            debug!(key, "delete: no live order");
            return Ok(None);
        };

        match location {
            Location::Primary { offset } => self
                .orders
                .data()
                .write_byte_at(offset + TIMESTAMP_OFFSET, TOMBSTONE)?,
            Location::Overflow { offset } => self.overflow.mark_removed(offset)?,
        }

        let category_updated =
            self.adjust_category(order.category_id, -i64::from(order.quantity), -order.revenue())?;

        let index_rebuilt = if self.removals.record() {
            info!(
                removals = self.removals.pending(),
                "removal threshold reached, rebuilding order index"
            );
            self.rebuild_index()?;
            true
        } else {
            false
        };
        debug!(key, ?location, index_rebuilt, "order removed");

        Ok(Some(DeleteOutcome {
            order,
            location,
            category_updated,
            index_rebuilt,
        }))
    }

    /// Applies a sale (or, negated, a removal) to a category's totals.
    fn adjust_category(&mut self, category_id: i64, quantity: i64, revenue: f64) -> Result<bool> {
        match self.categories.find(category_id)? {
            Some(mut hit) => {
                hit.record.apply(quantity, revenue);
                self.categories.data().write_at(hit.offset, &hit.record)?;
                Ok(true)
            }
            None => {
                warn!(category_id, "category not found, totals not updated");
                Ok(false)
            }
        }
    }
}
