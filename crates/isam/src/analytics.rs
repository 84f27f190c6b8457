//! Read-only reports over a [`Store`].
//!
//! Nothing here mutates files. Reports that aggregate orders count live
//! orders from both the primary file and the overflow log.

use record::{CatalogItem, CategorySummary, FixedRecord, Order, OverflowRecord};
use std::collections::HashMap;

use crate::error::Result;
use crate::store::Store;

/// Overflow entries above this share of the primary file suggest a reorganization.
pub const OVERFLOW_WARN_RATIO: f64 = 0.05;

/// Years accepted by [`Store::best_month`].
pub const SALES_YEARS: std::ops::RangeInclusive<u32> = 2018..=2025;

/// First and last records of a file, by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples<R> {
    pub total: u64,
    pub head: Vec<(u64, R)>,
    pub tail: Vec<(u64, R)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreStats {
    pub records: u64,
    pub live: u64,
    pub removed: u64,
    /// Length of the key-ordered prefix of the primary file.
    pub ordered: u64,
    pub overflow: u64,
    pub overflow_live: u64,
    pub index_entries: u64,
    pub primary_bytes: u64,
    pub items: u64,
    pub categories: u64,
    pub pending_removals: usize,
}

impl StoreStats {
    pub fn overflow_ratio(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.overflow as f64 / self.records as f64
        }
    }

    pub fn needs_reorganize(&self) -> bool {
        self.overflow_ratio() > OVERFLOW_WARN_RATIO
    }
}

/// Units sold of one product.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSales {
    pub product_id: i64,
    pub quantity: i64,
    /// Catalog entry, when the product is in the catalog.
    pub item: Option<CatalogItem>,
}

/// Sales of one calendar month, all years combined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthSales {
    /// 1 = January.
    pub month: u32,
    pub orders: u64,
    pub quantity: i64,
    pub revenue: f64,
}

/// Parses the `YYYY-MM` prefix of an order timestamp.
///
/// Returns `None` for short strings, unparsable digits, years outside
/// [`SALES_YEARS`] and months outside 1..=12.
pub fn parse_year_month(timestamp: &str) -> Option<(u32, u32)> {
    let year: u32 = timestamp.get(0..4)?.parse().ok()?;
    let month: u32 = timestamp.get(5..7)?.parse().ok()?;
    if !SALES_YEARS.contains(&year) || !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

impl Store {
    /// Visits every live order: the primary file first, then the overflow log.
    fn for_each_live<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&Order),
    {
        for item in self.orders.data().scan()? {
            let (_, order) = item?;
            if !order.is_removed() {
                f(&order);
            }
        }
        self.overflow.for_each(|order| {
            if !order.is_removed() {
                f(&order);
            }
            Ok(())
        })
    }

    /// The first and last `n` records of the primary file, removed ones included.
    pub fn samples(&mut self, n: usize) -> Result<Samples<Order>> {
        let total = self.orders.len()?;
        let data = self.orders.data();
        sample_file(total, n as u64, |i| data.get(i))
    }

    /// The first and last `n` catalog items.
    pub fn item_samples(&mut self, n: usize) -> Result<Samples<CatalogItem>> {
        let total = self.items.len()?;
        let data = self.items.data();
        sample_file(total, n as u64, |i| data.get(i))
    }

    pub fn stats(&mut self) -> Result<StoreStats> {
        let mut live = 0u64;
        let mut removed = 0u64;
        for item in self.orders.data().scan()? {
            if item?.1.is_removed() {
                removed += 1;
            } else {
                live += 1;
            }
        }
        let mut overflow_live = 0u64;
        self.overflow.for_each(|order| {
            if !order.is_removed() {
                overflow_live += 1;
            }
            Ok(())
        })?;

        Ok(StoreStats {
            records: live + removed,
            live,
            removed,
            ordered: self.ordered_len,
            overflow: self.overflow.len()?,
            overflow_live,
            index_entries: self.orders.index().len()?,
            primary_bytes: self.orders.data().byte_len()?,
            items: self.items.len()?,
            categories: self.categories.len()?,
            pending_removals: self.removals.pending(),
        })
    }

    /// Live overflow entries in log order.
    pub fn overflow_records(&mut self) -> Result<Vec<OverflowRecord>> {
        Ok(self
            .overflow
            .records()?
            .into_iter()
            .filter(|r| !r.order.is_removed())
            .collect())
    }

    /// The `n` categories with the most units sold, best first.
    pub fn top_categories(&mut self, n: usize) -> Result<Vec<CategorySummary>> {
        let mut all = Vec::new();
        for item in self.categories.data().scan()? {
            all.push(item?.1);
        }
        all.sort_by(|a, b| {
            b.total_sales
                .cmp(&a.total_sales)
                .then(a.category_id.cmp(&b.category_id))
        });
        all.truncate(n);
        Ok(all)
    }

    /// The `n` products with the most units sold, best first.
    pub fn top_items(&mut self, n: usize) -> Result<Vec<ItemSales>> {
        let mut sold: HashMap<i64, i64> = HashMap::new();
        self.for_each_live(|order| {
            *sold.entry(order.product_id).or_default() += i64::from(order.quantity);
        })?;

        let mut ranked: Vec<(i64, i64)> = sold.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);

        ranked
            .into_iter()
            .map(|(product_id, quantity)| -> Result<ItemSales> {
                Ok(ItemSales {
                    product_id,
                    quantity,
                    item: self.lookup_item(product_id)?,
                })
            })
            .collect()
    }

    /// The calendar month with the most units sold, or `None` without dated sales.
    ///
    /// Ties go to the earlier month.
    pub fn best_month(&mut self) -> Result<Option<MonthSales>> {
        let mut months: [MonthSales; 12] = std::array::from_fn(|i| MonthSales {
            month: i as u32 + 1,
            orders: 0,
            quantity: 0,
            revenue: 0.0,
        });
        self.for_each_live(|order| {
            if let Some((_, month)) = parse_year_month(&order.timestamp) {
                let m = &mut months[month as usize - 1];
                m.orders += 1;
                m.quantity += i64::from(order.quantity);
                m.revenue += order.revenue();
            }
        })?;

        let mut best: Option<MonthSales> = None;
        for m in months {
            if m.orders > 0 && best.map_or(true, |b| m.quantity > b.quantity) {
                best = Some(m);
            }
        }
        Ok(best)
    }
}

fn sample_file<R, F>(total: u64, n: u64, mut get: F) -> Result<Samples<R>>
where
    F: FnMut(u64) -> Result<Option<R>>,
{
    let mut collect = |range: std::ops::Range<u64>| -> Result<Vec<(u64, R)>> {
        let mut out = Vec::new();
        for i in range {
            if let Some(r) = get(i)? {
                out.push((i, r));
            }
        }
        Ok(out)
    };
    let head = collect(0..n.min(total))?;
    let tail = collect(total.saturating_sub(n)..total)?;
    Ok(Samples { total, head, tail })
}
