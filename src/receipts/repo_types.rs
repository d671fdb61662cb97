use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::FromRow;
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

/// Receipt row joined with its owner's email.
#[derive(Debug, Clone, FromRow)]
pub struct ReceiptRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_email: String,
    pub seller_name: String,
    pub category: String,
    pub receipt_date: PrimitiveDateTime,
    pub upload_date: OffsetDateTime,
    pub total_amount: Decimal,
    pub tax_amount: Option<Decimal>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub item_name: String,
    pub quantity: i32,
    pub rate: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone)]
pub struct ReceiptWithItems {
    pub receipt: ReceiptRow,
    pub items: Vec<ItemRow>,
}

/// Attaches items to their receipts, keeping the receipts' order.
pub fn attach_items(receipts: Vec<ReceiptRow>, items: Vec<ItemRow>) -> Vec<ReceiptWithItems> {
    let mut by_receipt: HashMap<Uuid, Vec<ItemRow>> = HashMap::new();
    for item in items {
        by_receipt.entry(item.receipt_id).or_default().push(item);
    }
    receipts
        .into_iter()
        .map(|receipt| {
            let items = by_receipt.remove(&receipt.id).unwrap_or_default();
            ReceiptWithItems { receipt, items }
        })
        .collect()
}
