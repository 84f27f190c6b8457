use record::{CategorySummary, Order};
use std::collections::btree_map::{self, BTreeMap};

/// Running per-category totals, keyed by category id.
///
/// Backed by an ordered map, so iteration is already sorted by category key
/// and the aggregate can be written out as a single sorted run.
#[derive(Debug, Default)]
pub struct CategoryAggregator {
    categories: BTreeMap<i64, CategorySummary>,
}

impl CategoryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the order's quantity and revenue to its category.
    ///
    /// The first order seen for a category fixes its label; `product_count`
    /// is left untouched.
    pub fn observe(&mut self, order: &Order) {
        self.entry(order)
            .apply(i64::from(order.quantity), order.revenue());
    }

    /// Makes the order's category known without counting the order.
    pub fn register(&mut self, order: &Order) {
        self.entry(order);
    }

    /// Counts one distinct catalog item for `category_id`.
    ///
    /// Returns `false` when the category is unknown.
    pub fn count_product(&mut self, category_id: i64) -> bool {
        match self.categories.get_mut(&category_id) {
            Some(c) => {
                c.product_count += 1;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, category_id: i64) -> Option<&CategorySummary> {
        self.categories.get(&category_id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Summaries in ascending category order.
    pub fn iter(&self) -> impl Iterator<Item = &CategorySummary> {
        self.categories.values()
    }

    /// Consumes the aggregator, yielding summaries in ascending category order.
    pub fn into_summaries(self) -> btree_map::IntoValues<i64, CategorySummary> {
        self.categories.into_values()
    }

    fn entry(&mut self, order: &Order) -> &mut CategorySummary {
        self.categories
            .entry(order.category_id)
            .or_insert_with(|| CategorySummary::new(order.category_id, order.category_alias.clone()))
    }
}
