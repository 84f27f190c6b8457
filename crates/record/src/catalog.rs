use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::format::{
    read_fixed_str, write_fixed_str, FixedRecord, ALIAS_WIDTH, COLOR_WIDTH, GEM_WIDTH,
    METAL_WIDTH,
};

/// A product of the catalog, derived from the first order that mentions it.
///
/// The catalog file holds exactly one item per `product_id`, strictly in key
/// order, and is never modified after the bulk build.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogItem {
    pub product_id: i64,
    pub category_id: i64,
    pub brand_id: i32,
    pub price: f64,
    pub gender: u8,
    pub color: String,
    pub metal: String,
    pub gem: String,
}

impl FixedRecord for CatalogItem {
    const SIZE: usize = 8 + 8 + 4 + 8 + 1 + COLOR_WIDTH + METAL_WIDTH + GEM_WIDTH;

    fn key(&self) -> i64 {
        self.product_id
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i64::<LittleEndian>(self.product_id)?;
        w.write_i64::<LittleEndian>(self.category_id)?;
        w.write_i32::<LittleEndian>(self.brand_id)?;
        w.write_f64::<LittleEndian>(self.price)?;
        w.write_u8(self.gender)?;
        write_fixed_str(w, &self.color, COLOR_WIDTH)?;
        write_fixed_str(w, &self.metal, METAL_WIDTH)?;
        write_fixed_str(w, &self.gem, GEM_WIDTH)?;
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            product_id: r.read_i64::<LittleEndian>()?,
            category_id: r.read_i64::<LittleEndian>()?,
            brand_id: r.read_i32::<LittleEndian>()?,
            price: r.read_f64::<LittleEndian>()?,
            gender: r.read_u8()?,
            color: read_fixed_str(r, COLOR_WIDTH)?,
            metal: read_fixed_str(r, METAL_WIDTH)?,
            gem: read_fixed_str(r, GEM_WIDTH)?,
        })
    }
}

/// Per-category sales aggregate.
///
/// `total_sales` and `total_revenue` move with every insert and removal and
/// are recomputed from the order file by a category rebuild.
/// `product_count` is the number of distinct catalog items in the category.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategorySummary {
    pub category_id: i64,
    pub alias: String,
    pub product_count: u32,
    pub total_sales: i64,
    pub total_revenue: f64,
}

impl CategorySummary {
    /// An empty aggregate carrying the category's first-seen label.
    pub fn new(category_id: i64, alias: impl Into<String>) -> Self {
        Self {
            category_id,
            alias: alias.into(),
            ..Self::default()
        }
    }

    /// Adds (or, with a negative quantity, removes) one sale.
    pub fn apply(&mut self, quantity: i64, revenue: f64) {
        self.total_sales += quantity;
        self.total_revenue += revenue;
    }
}

impl FixedRecord for CategorySummary {
    const SIZE: usize = 8 + ALIAS_WIDTH + 4 + 8 + 8;

    fn key(&self) -> i64 {
        self.category_id
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_i64::<LittleEndian>(self.category_id)?;
        write_fixed_str(w, &self.alias, ALIAS_WIDTH)?;
        w.write_u32::<LittleEndian>(self.product_count)?;
        w.write_i64::<LittleEndian>(self.total_sales)?;
        w.write_f64::<LittleEndian>(self.total_revenue)?;
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            category_id: r.read_i64::<LittleEndian>()?,
            alias: read_fixed_str(r, ALIAS_WIDTH)?,
            product_count: r.read_u32::<LittleEndian>()?,
            total_sales: r.read_i64::<LittleEndian>()?,
            total_revenue: r.read_f64::<LittleEndian>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Order;

    #[test]
    fn catalog_item_derived_from_order() -> io::Result<()> {
        let order = Order {
            order_id: 10,
            product_id: 77,
            category_id: 3,
            brand_id: 1,
            price: 99.9,
            gender: b'm',
            color: "white".into(),
            metal: "silver".into(),
            gem: "topaz".into(),
            ..Order::default()
        };
        let item = order.catalog_item();
        assert_eq!(item.key(), 77);

        let mut buf = Vec::new();
        item.encode(&mut buf)?;
        assert_eq!(buf.len(), CatalogItem::SIZE);
        assert_eq!(CatalogItem::from_bytes(&buf)?, item);
        Ok(())
    }

    #[test]
    fn category_apply_adds_and_subtracts() {
        let mut c = CategorySummary::new(1, "jewelry.ring");
        c.apply(2, 10.0);
        c.apply(1, 5.0);
        assert_eq!(c.total_sales, 3);
        assert_eq!(c.total_revenue, 15.0);

        c.apply(-1, -5.0);
        assert_eq!(c.total_sales, 2);
        assert_eq!(c.total_revenue, 10.0);
    }

    #[test]
    fn category_encodes_to_fixed_size() -> io::Result<()> {
        let c = CategorySummary {
            category_id: 9,
            alias: "jewelry.pendant".into(),
            product_count: 4,
            total_sales: 12,
            total_revenue: 340.25,
        };
        let mut buf = Vec::new();
        c.encode(&mut buf)?;
        assert_eq!(buf.len(), CategorySummary::SIZE);
        assert_eq!(CategorySummary::from_bytes(&buf)?, c);
        Ok(())
    }
}
