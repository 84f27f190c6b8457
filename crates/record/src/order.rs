use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::catalog::CatalogItem;
use crate::format::{
    read_fixed_str, write_fixed_str, FixedRecord, ALIAS_WIDTH, COLOR_WIDTH, GEM_WIDTH,
    METAL_WIDTH, TIMESTAMP_WIDTH, TOMBSTONE,
};

/// Byte offset of the timestamp field (and thus the tombstone byte) inside
/// an encoded [`Order`].
pub const TIMESTAMP_OFFSET: u64 = 0;

/// Value of [`OverflowRecord::next`]; overflow segments are never chained.
pub const NO_LINK: i64 = -1;

/// One sale: the transaction record of the primary order file.
///
/// The first byte of `timestamp` doubles as the tombstone marker. Removing an
/// order overwrites that single byte in place with [`TOMBSTONE`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Order {
    pub timestamp: String,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub category_id: i64,
    pub category_alias: String,
    pub brand_id: i32,
    pub price: f64,
    pub user_id: i64,
    /// ASCII gender code (`b'f'`, `b'm'`, ...), `0` when absent.
    pub gender: u8,
    pub color: String,
    pub metal: String,
    pub gem: String,
}

impl Order {
    /// `quantity * price`.
    pub fn revenue(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    /// Replaces the first timestamp character with the tombstone marker.
    pub fn mark_removed(&mut self) {
        let rest = self
            .timestamp
            .char_indices()
            .nth(1)
            .map(|(i, _)| &self.timestamp[i..])
            .unwrap_or("");
        self.timestamp = format!("{}{}", TOMBSTONE as char, rest);
    }

    /// The catalog entry this order implies for its product.
    pub fn catalog_item(&self) -> CatalogItem {
        CatalogItem {
            product_id: self.product_id,
            category_id: self.category_id,
            brand_id: self.brand_id,
            price: self.price,
            gender: self.gender,
            color: self.color.clone(),
            metal: self.metal.clone(),
            gem: self.gem.clone(),
        }
    }
}

impl FixedRecord for Order {
    const SIZE: usize = TIMESTAMP_WIDTH + 8 + 8 + 4 + 8 + ALIAS_WIDTH + 4 + 8 + 8 + 1
        + COLOR_WIDTH
        + METAL_WIDTH
        + GEM_WIDTH;

    fn key(&self) -> i64 {
        self.order_id
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_fixed_str(w, &self.timestamp, TIMESTAMP_WIDTH)?;
        w.write_i64::<LittleEndian>(self.order_id)?;
        w.write_i64::<LittleEndian>(self.product_id)?;
        w.write_i32::<LittleEndian>(self.quantity)?;
        w.write_i64::<LittleEndian>(self.category_id)?;
        write_fixed_str(w, &self.category_alias, ALIAS_WIDTH)?;
        w.write_i32::<LittleEndian>(self.brand_id)?;
        w.write_f64::<LittleEndian>(self.price)?;
        w.write_i64::<LittleEndian>(self.user_id)?;
        w.write_u8(self.gender)?;
        write_fixed_str(w, &self.color, COLOR_WIDTH)?;
        write_fixed_str(w, &self.metal, METAL_WIDTH)?;
        write_fixed_str(w, &self.gem, GEM_WIDTH)?;
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            timestamp: read_fixed_str(r, TIMESTAMP_WIDTH)?,
            order_id: r.read_i64::<LittleEndian>()?,
            product_id: r.read_i64::<LittleEndian>()?,
            quantity: r.read_i32::<LittleEndian>()?,
            category_id: r.read_i64::<LittleEndian>()?,
            category_alias: read_fixed_str(r, ALIAS_WIDTH)?,
            brand_id: r.read_i32::<LittleEndian>()?,
            price: r.read_f64::<LittleEndian>()?,
            user_id: r.read_i64::<LittleEndian>()?,
            gender: r.read_u8()?,
            color: read_fixed_str(r, COLOR_WIDTH)?,
            metal: read_fixed_str(r, METAL_WIDTH)?,
            gem: read_fixed_str(r, GEM_WIDTH)?,
        })
    }

    fn is_removed(&self) -> bool {
        self.timestamp.as_bytes().first() == Some(&TOMBSTONE)
    }
}

/// An order that could not be placed in its target block.
///
/// `origin_block` is the byte offset of the primary-file block the order was
/// destined for. `next` is a reserved link field and always holds [`NO_LINK`].
#[derive(Debug, Clone, PartialEq)]
pub struct OverflowRecord {
    pub order: Order,
    pub origin_block: u64,
    pub next: i64,
}

impl OverflowRecord {
    pub fn new(order: Order, origin_block: u64) -> Self {
        Self {
            order,
            origin_block,
            next: NO_LINK,
        }
    }
}

impl FixedRecord for OverflowRecord {
    const SIZE: usize = Order::SIZE + 8 + 8;

    fn key(&self) -> i64 {
        self.order.order_id
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.order.encode(w)?;
        w.write_u64::<LittleEndian>(self.origin_block)?;
        w.write_i64::<LittleEndian>(self.next)?;
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            order: Order::decode(r)?,
            origin_block: r.read_u64::<LittleEndian>()?,
            next: r.read_i64::<LittleEndian>()?,
        })
    }

    fn is_removed(&self) -> bool {
        self.order.is_removed()
    }
}
