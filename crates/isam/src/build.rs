use extsort::{merge_runs, write_indexed, Dedup, MergeOptions, MergeStats, RunBuilder};
use record::{CatalogItem, CategorySummary, FixedRecord, Order, OrderSource, RecordStream};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{DataLayout, IsamConfig};
use crate::error::{IsamError, Result};
use crate::store::Store;

/// What a bulk build produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Orders read from the source.
    pub records: u64,
    /// Source lines skipped as malformed.
    pub skipped: u64,
    pub orders: MergeStats,
    pub items: MergeStats,
    pub categories: u64,
}

impl Store {
    /// Builds a fresh store in `data_dir` from an unsorted order stream.
    ///
    /// # Steps
    ///
    /// 1. Split the stream into sorted runs of at most `memory_limit` orders
    ///    (and as many catalog-item runs), aggregating category totals.
    /// 2. Merge the order runs into `orders.dat` + `orders.idx`.
    /// 3. Merge the item runs into `items.dat` + `items.idx`, keeping the
    ///    first item per product.
    /// 4. Count catalog items per category and write `categories.dat` +
    ///    `categories.idx`.
    /// 5. Empty the overflow log and open the store.
    ///
    /// Existing files in `data_dir` are replaced.
    ///
    /// # Errors
    ///
    /// [`IsamError::InvalidRecord`] when an order already carries the removal
    /// marker; such an order could never be found and would skew the
    /// category totals.
    pub fn build<I>(source: I, data_dir: impl Into<PathBuf>, config: IsamConfig) -> Result<(Self, BuildReport)>
    where
        I: IntoIterator<Item = io::Result<Order>>,
    {
        config.validate()?;
        let layout = DataLayout::new(data_dir);
        fs::create_dir_all(layout.dir())?;

        let mut runs = RunBuilder::new(layout.runs_dir(), config.memory_limit)?;
        for order in source {
            let order = order?;
            if order.is_removed() {
                return Err(IsamError::InvalidRecord(format!(
                    "order {} starts with the removal marker",
                    order.order_id
                )));
            }
            runs.push(order)?;
        }
        let built = runs.finish()?;

        let opts = MergeOptions {
            index_gap: config.index_gap,
            dedup: Dedup::Keep,
            write_buffer: config.write_buffer,
        };
        let orders = merge_runs::<Order>(&built.order_runs, &layout.orders(), &layout.orders_index(), opts)?;
        let items = merge_runs::<CatalogItem>(
            &built.item_runs,
            &layout.items(),
            &layout.items_index(),
            MergeOptions {
                dedup: Dedup::ByKey,
                ..opts
            },
        )?;
        let categories = write_categories(built.category_run.as_deref(), &layout, config.index_gap)?;

        create_empty(&layout.overflow())?;
        // leftover runs from an interrupted build would keep the directory
        if fs::remove_dir(layout.runs_dir()).is_err() {
            warn!(dir = %layout.runs_dir().display(), "run directory not empty, left in place");
        }

        let report = BuildReport {
            records: built.records,
            skipped: 0,
            orders,
            items,
            categories,
        };
        info!(
            records = report.records,
            orders = report.orders.records,
            items = report.items.records,
            categories = report.categories,
            "bulk build complete"
        );
        Ok((Self::open(layout.dir(), config)?, report))
    }

    /// Builds from a delimited text file with a header line.
    ///
    /// A source that cannot be opened is treated as empty: the build still
    /// runs and produces an empty store.
    pub fn build_from_path(
        source: impl AsRef<Path>,
        data_dir: impl Into<PathBuf>,
        config: IsamConfig,
    ) -> Result<(Self, BuildReport)> {
        let source = source.as_ref();
        match OrderSource::open(source) {
            Ok(mut orders) => {
                let (store, mut report) = Self::build(orders.by_ref(), data_dir, config)?;
                report.skipped = orders.skipped();
                if report.skipped > 0 {
                    warn!(skipped = report.skipped, "malformed source lines skipped");
                }
                Ok((store, report))
            }
            Err(err) => {
                warn!(path = %source.display(), %err, "cannot open source, building an empty store");
                Self::build(std::iter::empty(), data_dir, config)
            }
        }
    }
}

fn create_empty(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

/// Writes the category file from the aggregated run, filling in
/// `product_count` from the merged catalog.
///
/// The catalog is streamed; only the (small) set of categories is in memory.
fn write_categories(run: Option<&Path>, layout: &DataLayout, gap: usize) -> Result<u64> {
    let mut summaries: Vec<CategorySummary> = Vec::new();
    if let Some(run) = run {
        for item in RecordStream::<CategorySummary, _>::new(BufReader::new(File::open(run)?)) {
            summaries.push(item?.1);
        }
        fs::remove_file(run)?;
    }

    let catalog = BufReader::new(File::open(layout.items())?);
    for item in RecordStream::<CatalogItem, _>::new(catalog) {
        let (_, item) = item?;
        if let Ok(i) = summaries.binary_search_by_key(&item.category_id, |c| c.key()) {
            summaries[i].product_count += 1;
        }
    }

    let mut out = BufWriter::new(create_empty(&layout.categories())?);
    let mut idx = BufWriter::new(create_empty(&layout.categories_index())?);
    let stats = write_indexed(summaries.into_iter().map(Ok), &mut out, &mut idx, gap, Dedup::Keep)?;
    out.flush()?;
    idx.flush()?;
    Ok(stats.records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{config, order};
    use record::IndexEntry;
    use tempfile::tempdir;

    const HEADER: &str = "event_time,order_id,product_id,quantity,category_id,category_code,brand_id,price,user_id,gender,color,metal,gem\n";

    #[test]
    fn every_input_key_is_found_after_build() -> Result<()> {
        let dir = tempdir()?;
        let keys: Vec<i64> = (0..57).map(|i| (i * 37) % 101).collect();
        let orders = keys.iter().map(|&k| Ok(order(k, k % 4, 1, 1.0)));
        let (mut store, report) = Store::build(orders, dir.path(), config(5, 100))?;

        assert_eq!(report.records, 57);
        assert_eq!(report.orders.records, 57);
        assert_eq!(report.orders.index_entries, 12);
        for k in keys {
            assert_eq!(store.lookup(k)?.map(|o| o.order_id), Some(k));
        }
        assert!(!dir.path().join("runs").exists());
        Ok(())
    }

    #[test]
    fn index_entries_point_at_their_keys() -> Result<()> {
        let dir = tempdir()?;
        let orders = (0..23).rev().map(|k| Ok(order(k * 2, 1, 1, 1.0)));
        let (mut store, _) = Store::build(orders, dir.path(), config(4, 100))?;

        let entries = store.orders.index().entries()?;
        for pair in entries.windows(2) {
            assert!(pair[0].key < pair[1].key);
            assert!(pair[0].offset < pair[1].offset);
        }
        for IndexEntry { key, offset } in entries {
            assert_eq!(store.orders.data().read_at(offset)?.unwrap().order_id, key);
        }
        Ok(())
    }

    #[test]
    fn product_count_is_distinct_items_per_category() -> Result<()> {
        let dir = tempdir()?;
        let mut orders = vec![order(1, 3, 1, 1.0), order(2, 3, 1, 1.0), order(3, 4, 1, 1.0)];
        orders[1].product_id = orders[0].product_id;
        let (mut store, report) = Store::build(orders.into_iter().map(Ok), dir.path(), config(10, 100))?;

        assert_eq!(report.items.duplicates, 1);
        assert_eq!(report.categories, 2);
        assert_eq!(store.lookup_category(3)?.unwrap().product_count, 1);
        assert_eq!(store.lookup_category(4)?.unwrap().product_count, 1);
        Ok(())
    }

    #[test]
    fn catalog_keeps_first_order_per_product_within_a_run() -> Result<()> {
        let dir = tempdir()?;
        let orders = (0..300i64).map(|i| {
            let mut o = order(i, 1, 1, i as f64);
            o.product_id = i % 3;
            Ok(o)
        });
        let cfg = IsamConfig {
            memory_limit: 1000,
            ..config(10, 100)
        };
        let (mut store, report) = Store::build(orders, dir.path(), cfg)?;

        assert_eq!(report.items.runs, 1);
        assert_eq!(report.items.records, 3);
        for product in 0..3 {
            let item = store.lookup_item(product)?.expect("catalog item");
            assert_eq!(item.price, product as f64);
        }
        Ok(())
    }

    #[test]
    fn build_from_csv_skips_malformed_lines() -> Result<()> {
        let dir = tempdir()?;
        let csv = dir.path().join("orders.csv");
        let body = format!(
            "{HEADER}\
             2018-12-01 11:40:29 UTC,20,1842195256808833386,1,1806829201890738522,jewelry.earring,0,561.51,1515915625207851155,f,red,gold,diamond\n\
             not a record\n\
             2018-12-02 13:53:42 UTC,10,1873936840742928865,2,1806829201890738522,jewelry.earring,1,212.14,1515915625207851155,f,red,gold,\n"
        );
        fs::write(&csv, body)?;

        let (mut store, report) = Store::build_from_path(&csv, dir.path().join("data"), config(1, 100))?;
        assert_eq!(report.records, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.lookup(10)?.map(|o| o.quantity), Some(2));
        let cat = store.lookup_category(1_806_829_201_890_738_522)?.unwrap();
        assert_eq!(cat.total_sales, 3);
        assert_eq!(cat.alias, "jewelry.earring");
        Ok(())
    }

    #[test]
    fn removed_input_order_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let mut removed = order(7, 1, 4, 1.0);
        removed.timestamp = "*2020-05-17".into();
        let orders = [Ok(order(5, 1, 1, 1.0)), Ok(removed)];
        match Store::build(orders, dir.path(), config(2, 100)) {
            Err(IsamError::InvalidRecord(msg)) => assert!(msg.contains("order 7")),
            other => panic!("expected InvalidRecord, got {:?}", other.map(|(_, r)| r)),
        }
        Ok(())
    }

    #[test]
    fn marked_csv_line_is_skipped_and_not_counted() -> Result<()> {
        let dir = tempdir()?;
        let csv = dir.path().join("orders.csv");
        let body = format!(
            "{HEADER}\
             2020-05-17 10:00:00 UTC,5,500,1,1,jewelry.ring,0,1.0,1,f,,,\n\
             *2020-05-17 10:00:00 UTC,7,700,4,1,jewelry.ring,0,1.0,1,f,,,\n"
        );
        fs::write(&csv, body)?;

        let (mut store, report) = Store::build_from_path(&csv, dir.path().join("data"), config(2, 100))?;
        assert_eq!(report.records, 1);
        assert_eq!(report.skipped, 1);
        assert!(store.lookup(7)?.is_none());
        assert_eq!(store.lookup_category(1)?.unwrap().total_sales, 1);
        store.rebuild_categories()?;
        assert_eq!(store.lookup_category(1)?.unwrap().total_sales, 1);
        Ok(())
    }

    #[test]
    fn missing_source_builds_empty_store() -> Result<()> {
        let dir = tempdir()?;
        let (mut store, report) =
            Store::build_from_path(dir.path().join("absent.csv"), dir.path(), config(10, 100))?;
        assert_eq!(report.records, 0);
        assert!(store.lookup(1)?.is_none());
        assert_eq!(fs::metadata(dir.path().join("orders.dat"))?.len(), 0);
        assert_eq!(fs::metadata(dir.path().join("categories.dat"))?.len(), 0);
        Ok(())
    }

    #[test]
    fn rebuild_replaces_previous_store() -> Result<()> {
        let dir = tempdir()?;
        let first = (1..=5).map(|k| Ok(order(k, 1, 1, 1.0)));
        let (store, _) = Store::build(first, dir.path(), config(2, 100))?;
        store.close()?;

        let second = [Ok(order(100, 2, 1, 1.0))];
        let (mut store, _) = Store::build(second, dir.path(), config(2, 100))?;
        assert!(store.lookup(3)?.is_none());
        assert!(store.lookup(100)?.is_some());
        assert!(store.lookup_category(1)?.is_none());
        Ok(())
    }
}
