#![allow(dead_code)]

use std::sync::Arc;

use axum::extract::FromRef;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use receiptwise::{
    auth::{dto::JwtKeys, repo_types::User, services::hash_password},
    receipts::{dto::ReceiptCreate, repo, repo_types::ReceiptWithItems},
    state::{
        fakes::{self, FakeOcr, FakeParser},
        AppState,
    },
    storage::{ImageStore, LocalImageStore},
};

pub fn state(db: PgPool, ocr: FakeOcr, parser: FakeParser) -> AppState {
    let config = Arc::new(fakes::config("postgres://unused"));
    let images = Arc::new(LocalImageStore::new(&config.upload_dir).unwrap()) as Arc<dyn ImageStore>;
    AppState::from_parts(db, config, images, Arc::new(ocr), Arc::new(parser))
}

pub async fn user(db: &PgPool, email: &str) -> User {
    let hash = hash_password("password123").await.unwrap();
    User::create(db, email, &hash).await.unwrap()
}

pub async fn count_items(db: &PgPool, receipt_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE receipt_id = $1")
        .bind(receipt_id)
        .fetch_one(db)
        .await
        .unwrap()
}

pub fn bearer(state: &AppState, user_id: Uuid) -> String {
    let token = JwtKeys::from_ref(state).sign_access(user_id).unwrap();
    format!("Bearer {token}")
}

pub fn parsed_receipt(date: &str, category: &str, items: &[(&str, f64)]) -> Value {
    let total: f64 = items.iter().map(|(_, s)| s).sum();
    json!({
        "seller_name": "Corner Shop",
        "category": category,
        "receipt_date": date,
        "total_amount": total,
        "tax_amount": 1.0,
        "items": items
            .iter()
            .map(|(name, subtotal)| json!({
                "item_name": name,
                "quantity": 1,
                "rate": subtotal,
                "subtotal": subtotal,
            }))
            .collect::<Vec<_>>(),
    })
}

pub async fn receipt(
    db: &PgPool,
    owner_id: Uuid,
    date: &str,
    category: &str,
    items: &[(&str, f64)],
) -> ReceiptWithItems {
    let map = parsed_receipt(date, category, items)
        .as_object()
        .cloned()
        .unwrap();
    let create = ReceiptCreate::from_parsed(map).unwrap();
    repo::create_receipt(db, owner_id, &create).await.unwrap()
}
