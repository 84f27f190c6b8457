//! # Record: fixed-width on-disk layouts
//!
//! Every file the ISAM store keeps on disk is a flat array of fixed-size
//! records: record `n` lives at byte offset `n * SIZE`. There is no header,
//! no footer and no checksum, so a file's record count is simply
//! `len / SIZE`.
//!
//! ## Record kinds
//!
//! ```text
//! ┌──────────────────┬───────┬──────────────────────────────────────────────┐
//! │ kind             │ bytes │ key                                          │
//! ├──────────────────┼───────┼──────────────────────────────────────────────┤
//! │ Order            │  154  │ order_id    (tombstone: timestamp[0] == '*') │
//! │ CatalogItem      │   74  │ product_id                                   │
//! │ CategorySummary  │   58  │ category_id                                  │
//! │ IndexEntry       │   16  │ key → byte offset in the indexed file        │
//! │ OverflowRecord   │  170  │ order_id (Order + origin block + link)       │
//! └──────────────────┴───────┴──────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Text fields are UTF-8, zero padded to
//! their width and truncated on a character boundary when too long.
//!
//! The [`source`] module holds the delimited-text reader that turns the raw
//! order export into [`Order`] values for the bulk build.

mod catalog;
mod format;
mod index;
mod order;
pub mod source;

pub use catalog::{CatalogItem, CategorySummary};
pub use format::{
    read_fixed_str, truncate_to_width, write_fixed_str, FixedRecord, RecordStream,
    ALIAS_WIDTH, COLOR_WIDTH, GEM_WIDTH, METAL_WIDTH, TIMESTAMP_WIDTH, TOMBSTONE,
};
pub use index::IndexEntry;
pub use order::{Order, OverflowRecord, NO_LINK, TIMESTAMP_OFFSET};
pub use source::OrderSource;
