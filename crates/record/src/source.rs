//! Delimited-text order source.
//!
//! The export has a header line followed by one order per line, fields in
//! the positional order of [`Order`]:
//!
//! ```text
//! timestamp,order_id,product_id,quantity,category_id,category_alias,
//! brand_id,price,user_id,gender,color,metal,gem
//! ```
//!
//! Malformed lines are skipped and counted rather than failing the import.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::{Order, TOMBSTONE};

/// Iterator over the orders of a delimited-text export.
///
/// Yields `Err` only for I/O failures; unparsable lines are skipped and
/// counted in [`skipped`](OrderSource::skipped).
pub struct OrderSource<R> {
    reader: R,
    line: String,
    line_no: u64,
    skipped: u64,
}

impl OrderSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> OrderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Number of malformed lines skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: BufRead> Iterator for OrderSource<R> {
    type Item = io::Result<Order>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
            self.line_no += 1;
            if self.line_no == 1 {
                continue; // header
            }
            if self.line.trim().is_empty() {
                continue;
            }
            match parse_line(&self.line) {
                Some(order) => return Some(Ok(order)),
                None => {
                    self.skipped += 1;
                    tracing::debug!(line = self.line_no, "skipping malformed order line");
                }
            }
        }
    }
}

/// Parses one data line into an [`Order`].
///
/// Returns `None` when the line has fewer than two fields, the order id is
/// not an integer, a non-empty numeric field does not parse, or the date
/// starts with the removal marker. Empty
/// numeric fields decode as zero; missing trailing fields are empty.
pub fn parse_line(line: &str) -> Option<Order> {
    let line = line.trim_end_matches(['\n', '\r']);
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 2 {
        return None;
    }
    let field = |i: usize| fields.get(i).map(|f| f.trim()).unwrap_or("");
    if field(0).as_bytes().first() == Some(&TOMBSTONE) {
        return None;
    }

    Some(Order {
        timestamp: field(0).to_string(),
        order_id: field(1).parse().ok()?,
        product_id: number(field(2))?,
        quantity: number(field(3))?,
        category_id: number(field(4))?,
        category_alias: field(5).to_string(),
        brand_id: number(field(6))?,
        price: number(field(7))?,
        user_id: number(field(8))?,
        gender: field(9).as_bytes().first().copied().unwrap_or(0),
        color: field(10).to_string(),
        metal: field(11).to_string(),
        gem: field(12).to_string(),
    })
}

fn number<T: FromStr + Default>(s: &str) -> Option<T> {
    if s.is_empty() {
        Some(T::default())
    } else {
        s.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "date,order_id,product_id,qty,category_id,alias,brand,price,user,gender,color,metal,gem\n";

    #[test]
    fn parses_full_line() {
        let o = parse_line(
            "2018-12-01 11:40:29 UTC,101,77,2,5,jewelry.ring,1,12.5,900,f,red,gold,ruby\r\n",
        )
        .expect("valid line");
        assert_eq!(o.order_id, 101);
        assert_eq!(o.product_id, 77);
        assert_eq!(o.quantity, 2);
        assert_eq!(o.category_alias, "jewelry.ring");
        assert_eq!(o.price, 12.5);
        assert_eq!(o.gender, b'f');
        assert_eq!(o.gem, "ruby");
    }

    #[test]
    fn empty_numeric_fields_are_zero() {
        let o = parse_line("2019-01-02,7,,1,,,,3.0,,,,,").expect("valid line");
        assert_eq!(o.product_id, 0);
        assert_eq!(o.category_id, 0);
        assert_eq!(o.gender, 0);
        assert!(o.color.is_empty());
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("garbage").is_none());
        assert!(parse_line("2019-01-02,not-a-number,1").is_none());
        assert!(parse_line("2019-01-02,5,1,many").is_none());
    }

    #[test]
    fn removal_marker_in_date_is_malformed() {
        assert!(parse_line("*2019-01-02,5,1,1,1,a,0,2.0,1,f,,,").is_none());
        let text = format!("{HEADER}*2018-12-01,7,1,4,1,a,0,5.0,1,f,,,\n2018-12-01,5,1,1,1,a,0,5.0,1,f,,,\n");
        let mut src = OrderSource::new(Cursor::new(text));
        let keys: Vec<i64> = src
            .by_ref()
            .map(|o| o.map(|o| o.order_id))
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(keys, vec![5]);
        assert_eq!(src.skipped(), 1);
    }

    #[test]
    fn source_skips_header_and_bad_lines() {
        let text = format!(
            "{HEADER}2018-12-01,10,1,2,1,a,0,5.0,1,f,red,gold,\nbad line\n\n2018-12-02,5,2,1,1,a,0,5.0,1,m,red,gold,\n"
        );
        let mut src = OrderSource::new(Cursor::new(text));
        let keys: Vec<i64> = src
            .by_ref()
            .map(|o| o.map(|o| o.order_id))
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(keys, vec![10, 5]);
        assert_eq!(src.skipped(), 1);
    }

    #[test]
    fn header_only_source_is_empty() {
        let mut src = OrderSource::new(Cursor::new(HEADER.to_string()));
        assert!(src.next().is_none());
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OrderSource::open(dir.path().join("nope.csv")).is_err());
    }
}
