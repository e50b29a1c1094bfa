//! Per-dialog order lists
//!
//! An order file is a semicolon-separated table with `Item` and `Quantity`
//! columns, one file per dialog (`Order-0001.csv`, ...). A dialog without an
//! order file runs in freeform mode and the customer orders whatever it
//! likes.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One (item, quantity) pair the customer has to order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderLine {
    pub item: String,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }
}

impl fmt::Display for OrderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.item)
    }
}

/// Where the customer's order comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSource {
    /// A predefined list the customer must get through exactly once
    Fixed(Vec<OrderLine>),
    /// No list; the customer improvises
    Freeform,
}

impl OrderSource {
    /// Load a fixed order from `path`, or freeform when no path is given
    pub fn from_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::Fixed(load_order(path)?)),
            None => Ok(Self::Freeform),
        }
    }

    pub fn is_freeform(&self) -> bool {
        matches!(self, Self::Freeform)
    }

    /// Rendered `"<quantity> <item>"` strings; empty for freeform orders
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Fixed(lines) => lines.iter().map(|l| l.to_string()).collect(),
            Self::Freeform => vec![],
        }
    }
}

/// Load an order file. Every failure names the offending path.
pub fn load_order(path: impl AsRef<Path>) -> Result<Vec<OrderLine>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::OrderFileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    parse_records(&mut rdr, path)
}

fn parse_records<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    path: &Path,
) -> Result<Vec<OrderLine>> {
    let empty = || Error::EmptyOrderFile {
        path: path.to_path_buf(),
    };

    let headers = match rdr.headers() {
        Ok(h) if !h.iter().all(str::is_empty) => h.clone(),
        Ok(_) => return Err(empty()),
        Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => return Err(empty()),
        Err(e) => return Err(e.into()),
    };

    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn {
                path: PathBuf::from(path),
                column: name.to_string(),
            })
    };
    let item_idx = column("Item")?;
    let quantity_idx = column("Quantity")?;

    let mut lines = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let item = record.get(item_idx).unwrap_or_default().to_string();
        let raw_quantity = record.get(quantity_idx).unwrap_or_default();
        let quantity = raw_quantity
            .parse::<u32>()
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| Error::InvalidQuantity {
                path: path.to_path_buf(),
                item: item.clone(),
                value: raw_quantity.to_string(),
            })?;

        lines.push(OrderLine { item, quantity });
    }

    if lines.is_empty() {
        return Err(empty());
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn order_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_order() {
        let file = order_file("Item;Quantity\nBurger;2\nFries;1\n");
        let lines = load_order(file.path()).unwrap();
        assert_eq!(
            lines,
            vec![OrderLine::new("Burger", 2), OrderLine::new("Fries", 1)]
        );
        assert_eq!(lines[0].to_string(), "2 Burger");
    }

    #[test]
    fn test_columns_in_any_order_with_spaces() {
        let file = order_file("Quantity ; Item\n3 ; Big Tasty\n");
        let lines = load_order(file.path()).unwrap();
        assert_eq!(lines, vec![OrderLine::new("Big Tasty", 3)]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_order("/no/such/Order-0001.csv").unwrap_err();
        assert!(matches!(err, Error::OrderFileNotFound { .. }));
        assert!(err.to_string().contains("Order-0001.csv"));
    }

    #[test]
    fn test_empty_file() {
        let file = order_file("");
        assert!(matches!(
            load_order(file.path()),
            Err(Error::EmptyOrderFile { .. })
        ));
    }

    #[test]
    fn test_header_only() {
        let file = order_file("Item;Quantity\n");
        assert!(matches!(
            load_order(file.path()),
            Err(Error::EmptyOrderFile { .. })
        ));
    }

    #[test]
    fn test_missing_quantity_column() {
        let file = order_file("Item;Count\nBurger;2\n");
        match load_order(file.path()) {
            Err(Error::MissingColumn { column, .. }) => assert_eq!(column, "Quantity"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_quantity() {
        let file = order_file("Item;Quantity\nBurger;0\n");
        match load_order(file.path()) {
            Err(Error::InvalidQuantity { item, value, .. }) => {
                assert_eq!(item, "Burger");
                assert_eq!(value, "0");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_order_source() {
        assert!(OrderSource::from_path(None).unwrap().is_freeform());

        let file = order_file("Item;Quantity\nCola;1\n");
        let source = OrderSource::from_path(Some(file.path())).unwrap();
        assert_eq!(source.lines(), vec!["1 Cola"]);
    }
}
