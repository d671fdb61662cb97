use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;

use crate::dates::optional_date;

/// Inclusive calendar-date window; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    #[serde(default, deserialize_with = "optional_date::deserialize")]
    pub start_date: Option<Date>,
    #[serde(default, deserialize_with = "optional_date::deserialize")]
    pub end_date: Option<Date>,
}

impl DateRange {
    pub fn validate(&self) -> Result<(), String> {
        match (self.start_date, self.end_date) {
            (Some(s), Some(e)) if s > e => Err("start_date must not be after end_date".into()),
            _ => Ok(()),
        }
    }
}

pub const DEFAULT_TOP_ITEMS: i64 = 10;
pub const MAX_TOP_ITEMS: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct TopItemsQuery {
    #[serde(default, deserialize_with = "optional_date::deserialize")]
    pub start_date: Option<Date>,
    #[serde(default, deserialize_with = "optional_date::deserialize")]
    pub end_date: Option<Date>,
    pub limit: Option<i64>,
}

impl TopItemsQuery {
    pub fn range(&self) -> DateRange {
        DateRange {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_TOP_ITEMS)
            .clamp(1, MAX_TOP_ITEMS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct KpiData {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_spend: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_tax: Decimal,
    pub total_bills: i64,
}

/// One labelled total: a month, a category or an item name.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ChartPoint {
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}
