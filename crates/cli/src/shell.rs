//! Interactive menu over an open [`Store`].
//!
//! Reads one choice per line, dispatches through [`MENU`] and keeps going
//! until `0`, `q` or end of input. An error in one action is printed and the
//! menu comes back; only I/O errors on the terminal itself end the session.

use anyhow::{anyhow, Context, Result};
use isam::Store;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crate::input::NewOrder;
use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    ShowOrders,
    ShowItems,
    Search,
    Insert,
    Remove,
    Rebuild,
    Reorganize,
    Stats,
    Overflow,
    TopItems,
    BestMonth,
    TopCategories,
}

const MENU: &[(&str, &str, Action)] = &[
    ("1", "show first and last orders", Action::ShowOrders),
    ("2", "show catalog items", Action::ShowItems),
    ("3", "search order by id", Action::Search),
    ("4", "insert order", Action::Insert),
    ("5", "remove order", Action::Remove),
    ("6", "rebuild indexes", Action::Rebuild),
    ("7", "reorganize primary file", Action::Reorganize),
    ("8", "statistics", Action::Stats),
    ("9", "overflow records", Action::Overflow),
    ("10", "top selling items", Action::TopItems),
    ("11", "best sales month", Action::BestMonth),
    ("12", "top categories", Action::TopCategories),
];

const SAMPLE: usize = 5;
const TOP: usize = 10;

/// Asks a yes/no question; anything but `y`/`yes` (or end of input) is no.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> io::Result<bool> {
    write!(out, "{question} [y/N]: ")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(out)?;
        return Ok(false);
    }
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub struct Shell<'a, R, W> {
    store: &'a mut Store,
    input: R,
    out: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(store: &'a mut Store, input: R, out: W) -> Self {
        Self { store, input, out }
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            self.menu()?;
            let Some(choice) = self.prompt("choice")? else {
                break;
            };
            if choice == "0" || choice.eq_ignore_ascii_case("q") {
                break;
            }
            match MENU.iter().find(|(k, _, _)| *k == choice) {
                Some(&(_, _, action)) => {
                    if let Err(err) = self.dispatch(action) {
                        writeln!(self.out, "error: {err:#}")?;
                    }
                }
                None => writeln!(self.out, "unknown option: {choice}")?,
            }
        }
        writeln!(self.out, "bye")?;
        Ok(())
    }

    fn menu(&mut self) -> io::Result<()> {
        writeln!(self.out, "\n=== order store ===")?;
        for (key, label, _) in MENU {
            writeln!(self.out, "{key:>3}. {label}")?;
        }
        writeln!(self.out, "  0. quit")
    }

    /// Reads one trimmed line, `None` at end of input.
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.out, "{label}: ")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.out)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask<T>(&mut self, label: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let text = self
            .prompt(label)?
            .ok_or_else(|| anyhow!("input closed while reading {label}"))?;
        text.parse()
            .with_context(|| format!("invalid {label}: {text:?}"))
    }

    fn ask_text(&mut self, label: &str) -> Result<String> {
        self.prompt(label)?
            .ok_or_else(|| anyhow!("input closed while reading {label}"))
    }

    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        confirm(&mut self.input, &mut self.out, question)
    }

    fn dispatch(&mut self, action: Action) -> Result<()> {
        match action {
            Action::ShowOrders => {
                let samples = self.store.samples(SAMPLE)?;
                render::order_samples(&mut self.out, &samples)?;
            }
            Action::ShowItems => {
                let samples = self.store.item_samples(SAMPLE)?;
                render::item_samples(&mut self.out, &samples)?;
            }
            Action::Search => {
                let key: i64 = self.ask("order id")?;
                match self.store.lookup(key)? {
                    Some(order) => render::order(&mut self.out, &order)?,
                    None => writeln!(self.out, "order {key} not found")?,
                }
            }
            Action::Insert => self.insert()?,
            Action::Remove => self.remove()?,
            Action::Rebuild => {
                let (index, categories) = self.store.rebuild_all()?;
                render::rebuild(&mut self.out, &index, categories)?;
            }
            Action::Reorganize => {
                if self.confirm("rewrite the primary file now?")? {
                    let report = self.store.reorganize()?;
                    render::reorganization(&mut self.out, &report)?;
                } else {
                    writeln!(self.out, "cancelled")?;
                }
            }
            Action::Stats => {
                let stats = self.store.stats()?;
                render::stats(&mut self.out, &stats)?;
            }
            Action::Overflow => {
                let records = self.store.overflow_records()?;
                render::overflow(&mut self.out, &records)?;
            }
            Action::TopItems => {
                let items = self.store.top_items(TOP)?;
                render::top_items(&mut self.out, &items)?;
            }
            Action::BestMonth => {
                let best = self.store.best_month()?;
                render::best_month(&mut self.out, best.as_ref())?;
            }
            Action::TopCategories => {
                let categories = self.store.top_categories(TOP)?;
                render::top_categories(&mut self.out, &categories)?;
            }
        }
        Ok(())
    }

    fn insert(&mut self) -> Result<()> {
        let new = NewOrder {
            order_id: self.ask("order id")?,
            product_id: self.ask("product id")?,
            quantity: self.ask("quantity")?,
            category_id: self.ask("category id")?,
            category_alias: self.ask_text("category alias")?,
            brand_id: self.ask("brand id")?,
            price: self.ask("price")?,
            user_id: self.ask("user id")?,
            gender: self.ask_text("gender (f/m)")?,
            color: self.ask_text("color")?,
            metal: self.ask_text("metal")?,
            gem: self.ask_text("gem")?,
            timestamp: None,
        };
        let order = new.into_order();
        let key = order.order_id;
        let outcome = self.store.insert(order)?;
        render::insert_outcome(&mut self.out, key, &outcome)?;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        let key: i64 = self.ask("order id")?;
        let Some(order) = self.store.lookup(key)? else {
            writeln!(self.out, "order {key} not found")?;
            return Ok(());
        };
        render::order(&mut self.out, &order)?;
        if !self.confirm("remove this order?")? {
            writeln!(self.out, "cancelled")?;
            return Ok(());
        }
        match self.store.delete(key)? {
            Some(outcome) => render::delete_outcome(&mut self.out, &outcome)?,
            None => writeln!(self.out, "order {key} not found")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isam::IsamConfig;
    use record::Order;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    fn order(key: i64, category: i64) -> Order {
        Order {
            timestamp: "2021-06-01 12:00:00 UTC".into(),
            order_id: key,
            product_id: key * 10,
            quantity: 1,
            category_id: category,
            category_alias: "jewelry.ring".into(),
            brand_id: 0,
            price: 100.0,
            user_id: 1,
            gender: b'f',
            color: "red".into(),
            metal: "gold".into(),
            gem: "ruby".into(),
        }
    }

    fn store() -> Result<(TempDir, Store)> {
        let dir = tempdir()?;
        let orders = (1..=5).map(|k| Ok::<_, std::io::Error>(order(k * 10, 1)));
        let (store, _) = Store::build(orders, dir.path(), IsamConfig::default())?;
        Ok((dir, store))
    }

    fn session(store: &mut Store, input: &str) -> Result<String> {
        let mut out = Vec::new();
        Shell::new(store, Cursor::new(input), &mut out).run()?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn search_finds_order() -> Result<()> {
        let (_dir, mut store) = store()?;
        let out = session(&mut store, "3\n30\n3\n31\n0\n")?;
        assert!(out.contains("order 30\n"));
        assert!(out.contains("order 31 not found"));
        assert!(out.ends_with("bye\n"));
        Ok(())
    }

    #[test]
    fn bad_input_keeps_menu_running() -> Result<()> {
        let (_dir, mut store) = store()?;
        let out = session(&mut store, "42\n3\nabc\n")?;
        assert!(out.contains("unknown option: 42"));
        assert!(out.contains("error: invalid order id"));
        assert!(out.ends_with("bye\n"));
        Ok(())
    }

    #[test]
    fn remove_requires_confirmation() -> Result<()> {
        let (_dir, mut store) = store()?;
        let out = session(&mut store, "5\n20\nn\nq\n")?;
        assert!(out.contains("cancelled"));
        assert!(store.lookup(20)?.is_some());

        let out = session(&mut store, "5\n20\ny\nq\n")?;
        assert!(out.contains("order 20 removed"));
        assert!(store.lookup(20)?.is_none());
        Ok(())
    }

    #[test]
    fn insert_from_prompts() -> Result<()> {
        let (_dir, mut store) = store()?;
        let input = "4\n60\n600\n2\n1\njewelry.ring\n3\n49.5\n7\nm\nwhite\nsilver\n\n0\n";
        let out = session(&mut store, input)?;
        assert!(out.contains("order 60 appended"), "{out}");

        let order = store.lookup(60)?.expect("inserted");
        assert_eq!(order.quantity, 2);
        assert_eq!(order.gender, b'm');
        assert_eq!(order.gem, "");
        assert_eq!(store.lookup_category(1)?.map(|c| c.total_sales), Some(7));
        Ok(())
    }

    #[test]
    fn confirm_defaults_to_no() -> io::Result<()> {
        let mut out = Vec::new();
        assert!(confirm(&mut Cursor::new("YES\n"), &mut out, "go?")?);
        assert!(!confirm(&mut Cursor::new("\n"), &mut out, "go?")?);
        assert!(!confirm(&mut Cursor::new(""), &mut out, "go?")?);
        Ok(())
    }
}
