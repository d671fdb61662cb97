use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Spending category assigned to a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Category {
    Groceries,
    DiningOut,
    Shopping,
    Fuel,
    Entertainment,
    Travel,
    Utilities,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Groceries,
        Category::DiningOut,
        Category::Shopping,
        Category::Fuel,
        Category::Entertainment,
        Category::Travel,
        Category::Utilities,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::DiningOut => "Dining Out",
            Category::Shopping => "Shopping",
            Category::Fuel => "Fuel",
            Category::Entertainment => "Entertainment",
            Category::Travel => "Travel",
            Category::Utilities => "Utilities",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known = Category::ALL.map(Category::as_str).join(", ");
                format!("unknown category `{wanted}`, expected one of: {known}")
            })
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for &'static str {
    fn from(c: Category) -> Self {
        c.as_str()
    }
}
