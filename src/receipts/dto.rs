use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::dates::receipt_datetime;
use crate::receipts::repo_types::{ItemRow, ReceiptWithItems};
use crate::receipts::Category;

/// Receipt fields as produced by the parser, after validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptCreate {
    pub seller_name: String,
    pub category: Category,
    #[serde(with = "receipt_datetime")]
    pub receipt_date: PrimitiveDateTime,
    pub total_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Option<Decimal>,
    pub items: Vec<ItemCreate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemCreate {
    pub item_name: String,
    #[serde(deserialize_with = "whole_quantity::deserialize")]
    pub quantity: i32,
    pub rate: Decimal,
    pub subtotal: Decimal,
}

/// Item counts as models write them: `2`, `2.0` or `"2"`. Fractions are rejected.
mod whole_quantity {
    use serde::{de::Error, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    fn whole(f: f64) -> Option<i64> {
        (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
        let raw = Raw::deserialize(d)
            .map_err(|_| D::Error::custom("quantity must be a whole number"))?;
        let n = match raw {
            Raw::Int(n) => Some(n),
            Raw::Float(f) => whole(f),
            Raw::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole))
            }
        };
        n.and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("quantity must be a whole number"))
    }
}

impl ReceiptCreate {
    /// Validates a raw parser mapping. The error message is shown to the client as-is.
    pub fn from_parsed(map: Map<String, Value>) -> Result<Self, String> {
        let receipt: ReceiptCreate =
            serde_json::from_value(Value::Object(map)).map_err(|e| e.to_string())?;
        receipt.validate()?;
        Ok(receipt)
    }

    fn validate(&self) -> Result<(), String> {
        if self.seller_name.trim().is_empty() {
            return Err("seller_name must not be empty".into());
        }
        if self.items.is_empty() {
            return Err("items must contain at least one item".into());
        }
        if self.total_amount.is_sign_negative() {
            return Err("total_amount must not be negative".into());
        }
        if self.tax_amount.is_some_and(|t| t.is_sign_negative()) {
            return Err("tax_amount must not be negative".into());
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.item_name.trim().is_empty() {
                return Err(format!("items[{i}].item_name must not be empty"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub item_name: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}

impl From<ItemRow> for ItemResponse {
    fn from(r: ItemRow) -> Self {
        Self {
            id: r.id,
            receipt_id: r.receipt_id,
            item_name: r.item_name,
            quantity: r.quantity,
            rate: r.rate,
            subtotal: r.subtotal,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_email: String,
    pub seller_name: String,
    pub category: String,
    #[serde(with = "receipt_datetime")]
    pub receipt_date: PrimitiveDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub tax_amount: Option<Decimal>,
    pub items: Vec<ItemResponse>,
}

impl From<ReceiptWithItems> for ReceiptResponse {
    fn from(r: ReceiptWithItems) -> Self {
        let ReceiptWithItems { receipt, items } = r;
        Self {
            id: receipt.id,
            owner_id: receipt.owner_id,
            owner_email: receipt.owner_email,
            seller_name: receipt.seller_name,
            category: receipt.category,
            receipt_date: receipt.receipt_date,
            upload_date: receipt.upload_date,
            total_amount: receipt.total_amount,
            tax_amount: receipt.tax_amount,
            items: items.into_iter().map(ItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn as_map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn sample() -> Value {
        json!({
            "seller_name": "イオン 幕張店",
            "category": "Groceries",
            "receipt_date": "2024-05-01T10:15:00",
            "items": [
                {"item_name": "牛乳", "quantity": 2, "rate": 198, "subtotal": 396},
                {"item_name": "Bread", "quantity": 1, "rate": "250.50", "subtotal": 250.5}
            ],
            "total_amount": 698.26,
            "tax_amount": 51.76
        })
    }

    #[test]
    fn accepts_well_formed_parser_output() {
        let r = ReceiptCreate::from_parsed(as_map(sample())).unwrap();
        assert_eq!(r.seller_name, "イオン 幕張店");
        assert_eq!(r.category, Category::Groceries);
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.items[0].subtotal, dec("396"));
        assert_eq!(r.items[1].rate, dec("250.50"));
        assert_eq!(r.total_amount, dec("698.26"));
        assert_eq!(r.tax_amount, Some(dec("51.76")));
    }

    #[test]
    fn tax_may_be_missing_or_null() {
        let mut v = sample();
        v["tax_amount"] = Value::Null;
        assert_eq!(ReceiptCreate::from_parsed(as_map(v.clone())).unwrap().tax_amount, None);
        v.as_object_mut().unwrap().remove("tax_amount");
        assert_eq!(ReceiptCreate::from_parsed(as_map(v)).unwrap().tax_amount, None);
    }

    #[test]
    fn missing_field_names_the_field() {
        let mut v = sample();
        v.as_object_mut().unwrap().remove("total_amount");
        let err = ReceiptCreate::from_parsed(as_map(v)).unwrap_err();
        assert!(err.contains("total_amount"), "{err}");
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut v = sample();
        v["category"] = json!("Snacks");
        let err = ReceiptCreate::from_parsed(as_map(v)).unwrap_err();
        assert!(err.contains("unknown category"), "{err}");
    }

    #[test]
    fn bad_date_is_rejected() {
        let mut v = sample();
        v["receipt_date"] = json!("May 1st");
        let err = ReceiptCreate::from_parsed(as_map(v)).unwrap_err();
        assert!(err.contains("receipt_date"), "{err}");
    }

    #[test]
    fn empty_items_and_negative_amounts_are_rejected() {
        let mut v = sample();
        v["items"] = json!([]);
        assert!(ReceiptCreate::from_parsed(as_map(v)).unwrap_err().contains("items"));

        let mut v = sample();
        v["total_amount"] = json!(-1);
        assert!(ReceiptCreate::from_parsed(as_map(v)).unwrap_err().contains("total_amount"));
    }

    #[test]
    fn discount_lines_may_be_negative() {
        let mut v = sample();
        v["items"]
            .as_array_mut()
            .unwrap()
            .push(json!({"item_name": "値引", "quantity": 1, "rate": -50, "subtotal": -50}));
        let r = ReceiptCreate::from_parsed(as_map(v)).unwrap();
        assert_eq!(r.items.len(), 3);
        assert_eq!(r.items[2].rate, dec("-50"));
        assert_eq!(r.items[2].subtotal, dec("-50"));
    }

    #[test]
    fn quantity_accepts_integral_floats_and_numeric_strings() {
        for (raw, want) in [(json!(2.0), 2), (json!("2"), 2), (json!(" 3.0 "), 3), (json!(4), 4)] {
            let mut v = sample();
            v["items"][0]["quantity"] = raw.clone();
            let r = ReceiptCreate::from_parsed(as_map(v)).unwrap();
            assert_eq!(r.items[0].quantity, want, "{raw}");
        }
    }

    #[test]
    fn fractional_or_garbage_quantity_is_rejected() {
        for raw in [json!(1.5), json!("two"), json!(true), json!(1e12)] {
            let mut v = sample();
            v["items"][0]["quantity"] = raw.clone();
            let err = ReceiptCreate::from_parsed(as_map(v)).unwrap_err();
            assert!(err.contains("quantity must be a whole number"), "{raw}: {err}");
        }
    }

    #[test]
    fn empty_mapping_fails_validation() {
        assert!(ReceiptCreate::from_parsed(Map::new()).is_err());
    }

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { limit: 10_000, offset: -3 };
        assert_eq!(p.clamped(), (100, 0));
        let p = Pagination { limit: 0, offset: 5 };
        assert_eq!(p.clamped(), (1, 5));
    }
}
