//! # Extsort: bounded-memory external sort
//!
//! Turns an unsorted stream of orders into sorted, indexed files while never
//! holding more than `memory_limit` records of one kind in memory.
//!
//! ## Pipeline
//!
//! ```text
//!  orders ──► RunBuilder ──► order-0.run  order-1.run ... ──► merge_runs ──► orders.dat + orders.idx
//!                 │      └─► item-0.run   item-1.run  ... ──► merge_runs ──► items.dat  + items.idx
//!                 │                                           (dedup by key)
//!                 └─► CategoryAggregator ──► category-0.run   (already sorted)
//! ```
//!
//! - [`RunBuffer`] collects up to `memory_limit` records and sorts them.
//! - [`RunSpooler`] flushes full buffers to numbered run files.
//! - [`RunBuilder`] drives the order and catalog-item spoolers in lockstep and
//!   feeds every order to the [`CategoryAggregator`].
//! - [`merge_runs`] merges the runs of one kind into a single sorted file,
//!   emitting a sparse index entry every `index_gap` records, and deletes
//!   the consumed runs.

mod aggregate;
mod buffer;
mod builder;
mod merge;
mod run;

pub use aggregate::CategoryAggregator;
pub use buffer::RunBuffer;
pub use builder::{BuiltRuns, RunBuilder};
pub use merge::{merge_runs, write_indexed, Dedup, KWayMerge, MergeOptions, MergeStats};
pub use run::{write_run, RunSpooler};
