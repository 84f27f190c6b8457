//! Plain-text rendering of store results.

use isam::{
    BuildReport, DeleteOutcome, IndexRebuild, InsertOutcome, ItemSales, MonthSales, Placement,
    Reorganization, Samples, StoreStats, OVERFLOW_WARN_RATIO,
};
use record::{CatalogItem, CategorySummary, Order, OverflowRecord};
use std::io::{self, Write};

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const RULE: &str = "----------------------------------------------------------------------------------";

pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTHS.get(i as usize))
        .copied()
        .unwrap_or("invalid")
}

fn gender(code: u8) -> char {
    if code == 0 {
        '-'
    } else {
        code as char
    }
}

pub fn order<W: Write>(w: &mut W, o: &Order) -> io::Result<()> {
    writeln!(w, "order {}", o.order_id)?;
    writeln!(w, "  date:      {}", o.timestamp)?;
    writeln!(w, "  product:   {}", o.product_id)?;
    writeln!(w, "  quantity:  {}", o.quantity)?;
    writeln!(w, "  category:  {} ({})", o.category_id, o.category_alias)?;
    writeln!(w, "  brand:     {}", o.brand_id)?;
    writeln!(w, "  price:     ${:.2}", o.price)?;
    writeln!(w, "  user:      {}", o.user_id)?;
    writeln!(w, "  gender:    {}", gender(o.gender))?;
    writeln!(w, "  color:     {}", o.color)?;
    writeln!(w, "  metal:     {}", o.metal)?;
    writeln!(w, "  gem:       {}", o.gem)
}

pub fn order_samples<W: Write>(w: &mut W, s: &Samples<Order>) -> io::Result<()> {
    writeln!(w, "total records: {}", s.total)?;
    writeln!(w, "\nfirst {}:", s.head.len())?;
    for (i, o) in &s.head {
        writeln!(w, "{:>8}. id {:<20} date {}", i + 1, o.order_id, o.timestamp)?;
    }
    writeln!(w, "\nlast {}:", s.tail.len())?;
    for (i, o) in &s.tail {
        writeln!(w, "{:>8}. id {:<20} date {}", i + 1, o.order_id, o.timestamp)?;
    }
    Ok(())
}

pub fn item_samples<W: Write>(w: &mut W, s: &Samples<CatalogItem>) -> io::Result<()> {
    writeln!(w, "total items: {}", s.total)?;
    writeln!(w, "\nfirst {}:", s.head.len())?;
    for (i, item) in &s.head {
        writeln!(
            w,
            "{:>8}. product {:<20} category {:<20} color {}",
            i + 1,
            item.product_id,
            item.category_id,
            item.color
        )?;
    }
    Ok(())
}

pub fn insert_outcome<W: Write>(w: &mut W, key: i64, outcome: &InsertOutcome) -> io::Result<()> {
    match outcome.placement {
        Placement::Seeded => writeln!(w, "order {key} inserted as the first record")?,
        Placement::Tail { offset } => writeln!(w, "order {key} appended at byte {offset}")?,
        Placement::Overflow {
            offset,
            origin_block,
        } => writeln!(
            w,
            "order {key} placed in overflow at byte {offset} (block at byte {origin_block} is full)"
        )?,
    }
    if !outcome.category_updated {
        writeln!(w, "warning: category not found, totals not updated")?;
    }
    Ok(())
}

pub fn delete_outcome<W: Write>(w: &mut W, outcome: &DeleteOutcome) -> io::Result<()> {
    writeln!(w, "order {} removed", outcome.order.order_id)?;
    if !outcome.category_updated {
        writeln!(w, "warning: category not found, totals not updated")?;
    }
    if outcome.index_rebuilt {
        writeln!(w, "removal threshold reached, order index rebuilt")?;
    }
    Ok(())
}

pub fn build_report<W: Write>(w: &mut W, r: &BuildReport) -> io::Result<()> {
    writeln!(w, "orders read:      {}", r.records)?;
    writeln!(w, "lines skipped:    {}", r.skipped)?;
    writeln!(w, "order runs:       {}", r.orders.runs)?;
    writeln!(w, "orders written:   {} ({} index entries)", r.orders.records, r.orders.index_entries)?;
    writeln!(w, "catalog items:    {} ({} duplicates dropped)", r.items.records, r.items.duplicates)?;
    writeln!(w, "categories:       {}", r.categories)
}

pub fn rebuild<W: Write>(w: &mut W, index: &IndexRebuild, categories: u64) -> io::Result<()> {
    writeln!(
        w,
        "order index rebuilt: {} entries over {} live records ({} in key order)",
        index.entries, index.live, index.ordered
    )?;
    writeln!(w, "category file rebuilt: {categories} categories")
}

pub fn reorganization<W: Write>(w: &mut W, r: &Reorganization) -> io::Result<()> {
    writeln!(
        w,
        "primary file rewritten: {} records, {} removed dropped, {} moved in from overflow",
        r.records, r.dropped, r.from_overflow
    )
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

pub fn stats<W: Write>(w: &mut W, s: &StoreStats) -> io::Result<()> {
    writeln!(w, "=== statistics ===")?;
    writeln!(w, "total records:     {}", s.records)?;
    writeln!(w, "live records:      {} ({:.1}%)", s.live, percent(s.live, s.records))?;
    writeln!(w, "removed records:   {} ({:.1}%)", s.removed, percent(s.removed, s.records))?;
    writeln!(w, "in key order:      {}", s.ordered)?;
    writeln!(w, "overflow records:  {} ({} live)", s.overflow, s.overflow_live)?;
    writeln!(w, "index entries:     {}", s.index_entries)?;
    writeln!(w, "catalog items:     {}", s.items)?;
    writeln!(w, "categories:        {}", s.categories)?;
    writeln!(w, "pending removals:  {}", s.pending_removals)?;
    writeln!(w, "file size:         {:.2} MB", s.primary_bytes as f64 / (1024.0 * 1024.0))?;
    if s.needs_reorganize() {
        writeln!(
            w,
            "\nwarning: more than {:.0}% of records are in overflow, reorganize recommended",
            OVERFLOW_WARN_RATIO * 100.0
        )?;
    }
    Ok(())
}

pub fn overflow<W: Write>(w: &mut W, records: &[OverflowRecord]) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(w, "no live overflow records");
    }
    writeln!(w, "{} live overflow records:", records.len())?;
    for (i, r) in records.iter().enumerate() {
        writeln!(
            w,
            "{:>6}. id {:<20} date {:<30} block {}",
            i + 1,
            r.order.order_id,
            r.order.timestamp,
            r.origin_block
        )?;
    }
    Ok(())
}

pub fn top_categories<W: Write>(w: &mut W, categories: &[CategorySummary]) -> io::Result<()> {
    if categories.is_empty() {
        return writeln!(w, "no categories");
    }
    writeln!(
        w,
        "{:<4} {:<20} {:<30} {:>8} {:>10} {:>14}",
        "pos", "category", "alias", "products", "units", "revenue"
    )?;
    writeln!(w, "{RULE}")?;
    for (i, c) in categories.iter().enumerate() {
        writeln!(
            w,
            "{:<4} {:<20} {:<30} {:>8} {:>10} {:>14.2}",
            i + 1,
            c.category_id,
            c.alias,
            c.product_count,
            c.total_sales,
            c.total_revenue
        )?;
    }
    writeln!(w, "{RULE}")
}

pub fn top_items<W: Write>(w: &mut W, items: &[ItemSales]) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(w, "no sales");
    }
    writeln!(
        w,
        "{:<4} {:<20} {:>8} {:>10} {:<10} {:<10} {}",
        "pos", "product", "units", "price", "color", "metal", "gem"
    )?;
    writeln!(w, "{RULE}")?;
    for (i, s) in items.iter().enumerate() {
        match &s.item {
            Some(item) => writeln!(
                w,
                "{:<4} {:<20} {:>8} {:>10.2} {:<10} {:<10} {}",
                i + 1,
                s.product_id,
                s.quantity,
                item.price,
                item.color,
                item.metal,
                item.gem
            )?,
            None => writeln!(w, "{:<4} {:<20} {:>8} (not in catalog)", i + 1, s.product_id, s.quantity)?,
        }
    }
    writeln!(w, "{RULE}")
}

pub fn best_month<W: Write>(w: &mut W, best: Option<&MonthSales>) -> io::Result<()> {
    let Some(m) = best else {
        return writeln!(w, "no dated sales found");
    };
    writeln!(w, "best month: {}", month_name(m.month))?;
    writeln!(w, "  orders:   {}", m.orders)?;
    writeln!(w, "  units:    {}", m.quantity)?;
    writeln!(w, "  revenue:  ${:.2}", m.revenue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn month_names() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(0), "invalid");
        assert_eq!(month_name(13), "invalid");
    }

    #[test]
    fn overflow_placement_mentions_block() {
        let outcome = InsertOutcome {
            placement: Placement::Overflow {
                offset: 0,
                origin_block: 15_400,
            },
            category_updated: false,
        };
        let text = render(|w| insert_outcome(w, 7, &outcome));
        assert!(text.contains("block at byte 15400 is full"));
        assert!(text.contains("category not found"));
    }

    #[test]
    fn stats_warns_on_large_overflow() {
        let s = StoreStats {
            records: 10,
            live: 10,
            removed: 0,
            ordered: 10,
            overflow: 1,
            overflow_live: 1,
            index_entries: 1,
            primary_bytes: 1540,
            items: 3,
            categories: 2,
            pending_removals: 0,
        };
        let text = render(|w| stats(w, &s));
        assert!(text.contains("live records:      10 (100.0%)"));
        assert!(text.contains("reorganize recommended"));
    }

    #[test]
    fn empty_reports() {
        assert_eq!(render(|w| best_month(w, None)), "no dated sales found\n");
        assert_eq!(render(|w| top_items(w, &[])), "no sales\n");
        assert_eq!(render(|w| overflow(w, &[])), "no live overflow records\n");
    }
}
