use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// Row counts removed by [`clear_all`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClearedCounts {
    pub items: u64,
    pub receipts: u64,
    pub users: u64,
}

/// Small pool for one-shot maintenance commands.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .context("connect to database")
}

/// Empties items, receipts and users in one transaction, children first.
pub async fn clear_all(db: &PgPool) -> anyhow::Result<ClearedCounts> {
    let mut tx = db.begin().await?;

    let items = sqlx::query("DELETE FROM items")
        .execute(&mut *tx)
        .await
        .context("delete items")?
        .rows_affected();
    let receipts = sqlx::query("DELETE FROM receipts")
        .execute(&mut *tx)
        .await
        .context("delete receipts")?
        .rows_affected();
    let users = sqlx::query("DELETE FROM users")
        .execute(&mut *tx)
        .await
        .context("delete users")?
        .rows_affected();

    tx.commit().await?;
    info!(items, receipts, users, "tables cleared");

    Ok(ClearedCounts {
        items,
        receipts,
        users,
    })
}
