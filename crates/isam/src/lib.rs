//! # ISAM: sparse-indexed sequential order store
//!
//! A bulk-built, mostly sorted primary file of fixed-width orders with a
//! sparse index, an overflow log for inserts that do not fit their block,
//! and in-place tombstone deletes.
//!
//! ## Files
//!
//! ```text
//! ┌──────────────┐   (key, offset) every G live records
//! │ orders.idx   │──────────────┐
//! └──────────────┘              ▼
//! ┌──────────────────────────────────────────────┬───────────────────┐
//! │ orders.dat   key-ordered prefix               │ unordered tail    │
//! │  [blk 0: ≤B records][blk 1] ...               │  (tail inserts)   │
//! └──────────────────────────────────────────────┴───────────────────┘
//! ┌──────────────┐
//! │ orders.ovf   │  inserts whose block was full, tagged with the block
//! └──────────────┘
//! items.dat/.idx        one catalog item per product, immutable after build
//! categories.dat/.idx   per-category totals, updated on insert and delete
//! ```
//!
//! ## Lifecycle
//!
//! 1. [`Store::build`] sorts an order stream with bounded memory
//!    (see the `extsort` crate) and writes every file.
//! 2. [`Store::lookup`], [`Store::insert`] and [`Store::delete`] work on the
//!    open files. Every `rebuild_threshold` deletes the order index is
//!    rebuilt automatically.
//! 3. [`Store::rebuild_all`] re-derives the index and category totals;
//!    [`Store::reorganize`] compacts the primary file and folds the overflow
//!    log back in.

mod analytics;
mod build;
mod config;
mod error;
mod file;
mod index;
mod maintenance;
mod overflow;
mod store;
mod table;

pub use analytics::{
    parse_year_month, ItemSales, MonthSales, Samples, StoreStats, OVERFLOW_WARN_RATIO, SALES_YEARS,
};
pub use build::BuildReport;
pub use config::{DataLayout, IsamConfig};
pub use error::{IsamError, Result};
pub use file::RecordFile;
pub use index::SparseIndex;
pub use maintenance::{IndexRebuild, RemovalTracker, Reorganization};
pub use overflow::OverflowLog;
pub use store::{DeleteOutcome, InsertOutcome, Location, Placement, Store};
pub use table::{Located, SparseTable};
