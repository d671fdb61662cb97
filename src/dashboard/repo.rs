use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::dto::{ChartPoint, DateRange, KpiData};

// $1 = owner, $2 = start date, $3 = end date (both inclusive, both optional).
const OWNER_IN_RANGE: &str = r#"
    r.owner_id = $1
    AND ($2::date IS NULL OR r.receipt_date >= $2::date)
    AND ($3::date IS NULL OR r.receipt_date < $3::date + 1)
"#;

/// Total spend, total tax and number of bills in the range.
pub async fn kpis(db: &PgPool, owner_id: Uuid, range: DateRange) -> anyhow::Result<KpiData> {
    sqlx::query_as::<_, KpiData>(&format!(
        r#"
        SELECT COALESCE(SUM(r.total_amount), 0) AS total_spend,
               COALESCE(SUM(r.tax_amount), 0)   AS total_tax,
               COUNT(r.id)                      AS total_bills
          FROM receipts r
         WHERE {OWNER_IN_RANGE}
        "#
    ))
    .bind(owner_id)
    .bind(range.start_date)
    .bind(range.end_date)
    .fetch_one(db)
    .await
    .context("kpi aggregate")
}

/// Spend per `YYYY-MM`, oldest month first.
pub async fn spending_over_time(
    db: &PgPool,
    owner_id: Uuid,
    range: DateRange,
) -> anyhow::Result<Vec<ChartPoint>> {
    sqlx::query_as::<_, ChartPoint>(&format!(
        r#"
        SELECT to_char(r.receipt_date, 'YYYY-MM') AS label,
               SUM(r.total_amount)                AS value
          FROM receipts r
         WHERE {OWNER_IN_RANGE}
         GROUP BY label
         ORDER BY label
        "#
    ))
    .bind(owner_id)
    .bind(range.start_date)
    .bind(range.end_date)
    .fetch_all(db)
    .await
    .context("spending over time")
}

/// Spend per category, largest first.
pub async fn spending_by_category(
    db: &PgPool,
    owner_id: Uuid,
    range: DateRange,
) -> anyhow::Result<Vec<ChartPoint>> {
    sqlx::query_as::<_, ChartPoint>(&format!(
        r#"
        SELECT r.category          AS label,
               SUM(r.total_amount) AS value
          FROM receipts r
         WHERE {OWNER_IN_RANGE}
         GROUP BY r.category
         ORDER BY value DESC, label
        "#
    ))
    .bind(owner_id)
    .bind(range.start_date)
    .bind(range.end_date)
    .fetch_all(db)
    .await
    .context("spending by category")
}

/// Item names with the highest summed subtotal, at most `limit` rows.
pub async fn top_items(
    db: &PgPool,
    owner_id: Uuid,
    range: DateRange,
    limit: i64,
) -> anyhow::Result<Vec<ChartPoint>> {
    sqlx::query_as::<_, ChartPoint>(&format!(
        r#"
        SELECT i.item_name      AS label,
               SUM(i.subtotal)  AS value
          FROM items i
          JOIN receipts r ON r.id = i.receipt_id
         WHERE {OWNER_IN_RANGE}
         GROUP BY i.item_name
         ORDER BY value DESC, label
         LIMIT $4
        "#
    ))
    .bind(owner_id)
    .bind(range.start_date)
    .bind(range.end_date)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("top items")
}
