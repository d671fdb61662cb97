use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::receipts::dto::{ItemCreate, ReceiptCreate};
use crate::receipts::repo_types::{attach_items, ItemRow, ReceiptRow, ReceiptWithItems};

const RECEIPT_SELECT: &str = r#"
    SELECT r.id, r.owner_id, u.email AS owner_email, r.seller_name, r.category,
           r.receipt_date, r.upload_date, r.total_amount, r.tax_amount
      FROM receipts r
      JOIN users u ON u.id = r.owner_id
"#;

/// Insert a receipt and all of its items in one transaction.
pub async fn create_receipt(
    db: &PgPool,
    owner_id: Uuid,
    receipt: &ReceiptCreate,
) -> anyhow::Result<ReceiptWithItems> {
    let mut tx = db.begin().await.context("begin tx")?;

    let receipt_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO receipts (owner_id, seller_name, category, receipt_date, total_amount, tax_amount)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(receipt.seller_name.trim())
    .bind(receipt.category.as_str())
    .bind(receipt.receipt_date)
    .bind(receipt.total_amount)
    .bind(receipt.tax_amount)
    .fetch_one(&mut *tx)
    .await
    .context("insert receipt")?;

    let mut items = Vec::with_capacity(receipt.items.len());
    for (line_no, item) in receipt.items.iter().enumerate() {
        items.push(insert_item_tx(&mut tx, receipt_id, line_no as i32, item).await?);
    }

    let row = sqlx::query_as::<_, ReceiptRow>(&format!("{RECEIPT_SELECT} WHERE r.id = $1"))
        .bind(receipt_id)
        .fetch_one(&mut *tx)
        .await
        .context("reload receipt")?;

    tx.commit().await.context("commit tx")?;

    Ok(ReceiptWithItems { receipt: row, items })
}

async fn insert_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    receipt_id: Uuid,
    line_no: i32,
    item: &ItemCreate,
) -> anyhow::Result<ItemRow> {
    sqlx::query_as::<_, ItemRow>(
        r#"
        INSERT INTO items (receipt_id, line_no, item_name, quantity, rate, subtotal)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, receipt_id, item_name, quantity, rate, subtotal
        "#,
    )
    .bind(receipt_id)
    .bind(line_no)
    .bind(item.item_name.trim())
    .bind(item.quantity)
    .bind(item.rate)
    .bind(item.subtotal)
    .fetch_one(&mut **tx)
    .await
    .context("insert item")
}

// ---- Queries ----

/// Receipts of one owner, newest upload first. `limit = None` returns all.
pub async fn list_by_owner(
    db: &PgPool,
    owner_id: Uuid,
    limit: Option<i64>,
    offset: i64,
) -> anyhow::Result<Vec<ReceiptWithItems>> {
    let receipts = sqlx::query_as::<_, ReceiptRow>(&format!(
        "{RECEIPT_SELECT} WHERE r.owner_id = $1 ORDER BY r.upload_date DESC, r.id LIMIT $2 OFFSET $3"
    ))
    .bind(owner_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list receipts by owner")?;

    with_items(db, receipts).await
}

/// Every receipt in the system, newest upload first.
pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<ReceiptWithItems>> {
    let receipts = sqlx::query_as::<_, ReceiptRow>(&format!(
        "{RECEIPT_SELECT} ORDER BY r.upload_date DESC, r.id"
    ))
    .fetch_all(db)
    .await
    .context("list all receipts")?;

    with_items(db, receipts).await
}

pub async fn get_for_owner(
    db: &PgPool,
    receipt_id: Uuid,
    owner_id: Uuid,
) -> anyhow::Result<Option<ReceiptWithItems>> {
    let receipt = sqlx::query_as::<_, ReceiptRow>(&format!(
        "{RECEIPT_SELECT} WHERE r.id = $1 AND r.owner_id = $2"
    ))
    .bind(receipt_id)
    .bind(owner_id)
    .fetch_optional(db)
    .await
    .context("get receipt")?;

    match receipt {
        Some(r) => Ok(with_items(db, vec![r]).await?.pop()),
        None => Ok(None),
    }
}

/// Delete a receipt owned by `owner_id`. Items go with it via `ON DELETE CASCADE`.
/// Returns false when no such receipt belongs to the owner.
pub async fn delete_for_owner(db: &PgPool, receipt_id: Uuid, owner_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM receipts WHERE id = $1 AND owner_id = $2")
        .bind(receipt_id)
        .bind(owner_id)
        .execute(db)
        .await
        .context("delete receipt")?;
    Ok(res.rows_affected() > 0)
}

async fn with_items(db: &PgPool, receipts: Vec<ReceiptRow>) -> anyhow::Result<Vec<ReceiptWithItems>> {
    if receipts.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = receipts.iter().map(|r| r.id).collect();
    let items = sqlx::query_as::<_, ItemRow>(
        r#"
        SELECT id, receipt_id, item_name, quantity, rate, subtotal
          FROM items
         WHERE receipt_id = ANY($1)
         ORDER BY receipt_id, line_no
        "#,
    )
    .bind(&ids[..])
    .fetch_all(db)
    .await
    .context("list items for receipts")?;

    Ok(attach_items(receipts, items))
}
