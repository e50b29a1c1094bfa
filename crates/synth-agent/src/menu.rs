//! Restaurant menu loaded from an `Item,Category` table

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// A single orderable item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
struct MenuRow {
    #[serde(rename = "Item")]
    item: String,
    #[serde(rename = "Category")]
    category: String,
}

/// The full menu. Built once per run and shared read-only between cashiers.
#[derive(Debug, Clone, Default)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    /// Load a comma-separated menu file with `Item` and `Category` columns
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| Error::Menu {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_reader(file).map_err(|e| match e {
            Error::Other(message) => Error::Menu {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse a menu table from any reader
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for column in ["Item", "Category"] {
            if !headers.iter().any(|h| h == column) {
                return Err(Error::Other(format!("missing column: {}", column)));
            }
        }

        let mut items = Vec::new();
        for row in rdr.deserialize::<MenuRow>() {
            let row = row?;
            if row.item.is_empty() {
                continue;
            }
            items.push(MenuItem {
                name: row.item,
                category: row.category,
            });
        }

        if items.is_empty() {
            return Err(Error::Other("menu has no items".to_string()));
        }
        Ok(Self { items })
    }

    /// Item names in file order
    pub fn item_names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name.as_str()).collect()
    }

    /// One sentence per category, categories sorted by name, items in file
    /// order within each category.
    pub fn category_summaries(&self) -> Vec<String> {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for item in &self.items {
            groups
                .entry(item.category.as_str())
                .or_default()
                .push(item.name.as_str());
        }

        groups
            .into_iter()
            .map(|(category, names)| {
                format!(
                    "In our menu in the category {} we ONLY have: {}.",
                    category,
                    names.join(", ")
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn small_menu() -> Menu {
        Menu::new(vec![
            MenuItem {
                name: "Burger".into(),
                category: "Burgers".into(),
            },
            MenuItem {
                name: "Fries".into(),
                category: "Sides".into(),
            },
            MenuItem {
                name: "Cola".into(),
                category: "Drinks".into(),
            },
        ])
    }

    #[test]
    fn test_from_reader() {
        let data = "Item,Category\nBig Burger,Burgers\nCola, Drinks\nCheeseburger,Burgers\n";
        let menu = Menu::from_reader(data.as_bytes()).unwrap();
        assert_eq!(menu.item_names(), vec!["Big Burger", "Cola", "Cheeseburger"]);
        assert!(
            menu.category_summaries()
                .contains(&"In our menu in the category Drinks we ONLY have: Cola.".to_string())
        );
    }

    #[test]
    fn test_category_summaries_sorted_by_category() {
        let data = "Item,Category\nCola,Drinks\nBig Burger,Burgers\nCheeseburger,Burgers\n";
        let menu = Menu::from_reader(data.as_bytes()).unwrap();
        assert_eq!(
            menu.category_summaries(),
            vec![
                "In our menu in the category Burgers we ONLY have: Big Burger, Cheeseburger.",
                "In our menu in the category Drinks we ONLY have: Cola.",
            ]
        );
    }

    #[test]
    fn test_missing_column() {
        let err = Menu::from_reader("Name,Category\nCola,Drinks\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("missing column: Item"));
    }

    #[test]
    fn test_load_reports_path() {
        let err = Menu::load("/definitely/not/here/menu.csv").unwrap_err();
        match err {
            Error::Menu { path, .. } => assert!(path.ends_with("menu.csv")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
