//! Store tunables and on-disk file naming.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IsamError, Result};

/// Tunables for building and maintaining a [`Store`](crate::Store).
///
/// Missing fields fall back to their defaults when deserialized, so a
/// configuration file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsamConfig {
    /// Records between consecutive sparse index entries (G).
    pub index_gap: usize,
    /// Records a block may hold before inserts spill to overflow (B).
    pub block_size: usize,
    /// Records held in memory per run during external sorting (M).
    pub memory_limit: usize,
    /// Deletions that trigger an automatic index rebuild (K).
    pub rebuild_threshold: usize,
    /// Output buffer of the merge, in records.
    pub write_buffer: usize,
}

impl Default for IsamConfig {
    fn default() -> Self {
        Self {
            index_gap: 1000,
            block_size: 100,
            memory_limit: 10_000,
            rebuild_threshold: 10,
            write_buffer: 5000,
        }
    }
}

impl IsamConfig {
    /// Rejects zero values, which would make probing or spooling degenerate.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("index_gap", self.index_gap),
            ("block_size", self.block_size),
            ("memory_limit", self.memory_limit),
            ("rebuild_threshold", self.rebuild_threshold),
            ("write_buffer", self.write_buffer),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(IsamError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

/// File names of a store inside its data directory.
///
/// ```text
/// <dir>/orders.dat      primary order file (fixed-width, mostly key-ordered)
/// <dir>/orders.idx      sparse index over orders.dat
/// <dir>/orders.ovf      overflow log
/// <dir>/items.dat       catalog items, one per product
/// <dir>/items.idx
/// <dir>/categories.dat  per-category totals
/// <dir>/categories.idx
/// <dir>/runs/           scratch space for sorted runs
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    dir: PathBuf,
}

impl DataLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn orders(&self) -> PathBuf {
        self.dir.join("orders.dat")
    }

    pub fn orders_index(&self) -> PathBuf {
        self.dir.join("orders.idx")
    }

    pub fn overflow(&self) -> PathBuf {
        self.dir.join("orders.ovf")
    }

    pub fn items(&self) -> PathBuf {
        self.dir.join("items.dat")
    }

    pub fn items_index(&self) -> PathBuf {
        self.dir.join("items.idx")
    }

    pub fn categories(&self) -> PathBuf {
        self.dir.join("categories.dat")
    }

    pub fn categories_index(&self) -> PathBuf {
        self.dir.join("categories.idx")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.dir.join("runs")
    }
}
