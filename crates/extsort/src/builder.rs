use record::{CatalogItem, Order};
use std::io;
use std::path::PathBuf;

use crate::aggregate::CategoryAggregator;
use crate::run::{write_run, RunSpooler};

/// Run files produced by [`RunBuilder::finish`].
#[derive(Debug, Default)]
pub struct BuiltRuns {
    /// Order runs, each sorted by order id.
    pub order_runs: Vec<PathBuf>,
    /// Catalog-item runs, each sorted by product id (may repeat products).
    pub item_runs: Vec<PathBuf>,
    /// The single category run, sorted by category id; `None` for an empty input.
    pub category_run: Option<PathBuf>,
    /// Number of orders consumed.
    pub records: u64,
}

/// First phase of the bulk build: splits the order stream into sorted runs.
///
/// Every order is buffered twice, once as itself and once as the catalog
/// item it implies, and the two buffers fill and flush in lockstep. Category
/// totals are accumulated in memory and written once, at
/// [`finish`](RunBuilder::finish), as an already sorted run.
pub struct RunBuilder {
    dir: PathBuf,
    orders: RunSpooler<Order>,
    items: RunSpooler<CatalogItem>,
    categories: CategoryAggregator,
    records: u64,
}

impl RunBuilder {
    /// Creates a builder spooling runs of at most `memory_limit` records into `dir`.
    pub fn new(dir: impl Into<PathBuf>, memory_limit: usize) -> io::Result<Self> {
        let dir = dir.into();
        Ok(Self {
            orders: RunSpooler::new(&dir, "order", memory_limit)?,
            items: RunSpooler::new(&dir, "item", memory_limit)?,
            categories: CategoryAggregator::new(),
            dir,
            records: 0,
        })
    }

    pub fn push(&mut self, order: Order) -> io::Result<()> {
        self.categories.observe(&order);
        self.items.push(order.catalog_item())?;
        self.orders.push(order)?;
        self.records += 1;
        Ok(())
    }

    /// Number of orders consumed so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Flushes the partial buffers and writes the category run.
    pub fn finish(self) -> io::Result<BuiltRuns> {
        let category_run = if self.categories.is_empty() {
            None
        } else {
            let path = self.dir.join("category-0.run");
            let summaries: Vec<_> = self.categories.into_summaries().collect();
            write_run(&path, &summaries)?;
            Some(path)
        };

        let runs = BuiltRuns {
            order_runs: self.orders.finish()?,
            item_runs: self.items.finish()?,
            category_run,
            records: self.records,
        };
        tracing::info!(
            records = runs.records,
            order_runs = runs.order_runs.len(),
            item_runs = runs.item_runs.len(),
            "sorted runs created"
        );
        Ok(runs)
    }
}
