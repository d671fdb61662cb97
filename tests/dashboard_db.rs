//! Needs a running Postgres reachable through `DATABASE_URL`:
//! `cargo test -- --ignored`.

mod common;

use rust_decimal::Decimal;
use sqlx::PgPool;
use time::macros::date;

use receiptwise::dashboard::{dto::DateRange, repo};

fn range(start: Option<time::Date>, end: Option<time::Date>) -> DateRange {
    DateRange {
        start_date: start,
        end_date: end,
    }
}

#[ignore = "needs postgres"]
#[sqlx::test(migrations = "./migrations")]
async fn kpis_are_zero_without_receipts(db: PgPool) {
    let alice = common::user(&db, "alice@example.com").await;
    common::receipt(&db, alice.id, "2023-12-31", "Groceries", &[("Milk", 2.0)]).await;

    let k = repo::kpis(
        &db,
        alice.id,
        range(Some(date!(2024 - 01 - 01)), Some(date!(2024 - 01 - 31))),
    )
    .await
    .unwrap();
    assert_eq!(k.total_spend, Decimal::ZERO);
    assert_eq!(k.total_tax, Decimal::ZERO);
    assert_eq!(k.total_bills, 0);
}

#[ignore = "needs postgres"]
#[sqlx::test(migrations = "./migrations")]
async fn range_bounds_are_inclusive(db: PgPool) {
    let alice = common::user(&db, "alice@example.com").await;
    common::receipt(&db, alice.id, "2024-01-01T00:00:00", "Groceries", &[("A", 10.0)]).await;
    common::receipt(&db, alice.id, "2024-01-31T23:30:00", "Groceries", &[("B", 20.0)]).await;
    common::receipt(&db, alice.id, "2024-02-01T00:00:00", "Groceries", &[("C", 40.0)]).await;

    let january = range(Some(date!(2024 - 01 - 01)), Some(date!(2024 - 01 - 31)));
    let k = repo::kpis(&db, alice.id, january).await.unwrap();
    assert_eq!(k.total_bills, 2);
    assert_eq!(k.total_spend, Decimal::from(30));
    assert_eq!(k.total_tax, Decimal::from(2));

    let open_start = range(None, Some(date!(2024 - 01 - 01)));
    let k = repo::kpis(&db, alice.id, open_start).await.unwrap();
    assert_eq!(k.total_bills, 1);

    let all = repo::kpis(&db, alice.id, DateRange::default()).await.unwrap();
    assert_eq!(all.total_bills, 3);
}

#[ignore = "needs postgres"]
#[sqlx::test(migrations = "./migrations")]
async fn monthly_and_category_totals(db: PgPool) {
    let alice = common::user(&db, "alice@example.com").await;
    let bob = common::user(&db, "bob@example.com").await;
    common::receipt(&db, alice.id, "2024-02-10", "Travel", &[("Bus", 3.0)]).await;
    common::receipt(&db, alice.id, "2024-01-05", "Groceries", &[("Milk", 5.0)]).await;
    common::receipt(&db, alice.id, "2024-01-20", "Groceries", &[("Bread", 7.0)]).await;
    common::receipt(&db, bob.id, "2024-01-20", "Utilities", &[("Power", 99.0)]).await;

    let months = repo::spending_over_time(&db, alice.id, DateRange::default())
        .await
        .unwrap();
    let labels: Vec<_> = months.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, ["2024-01", "2024-02"]);
    assert_eq!(months[0].value, Decimal::from(12));

    let categories = repo::spending_by_category(&db, alice.id, DateRange::default())
        .await
        .unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].label, "Groceries");
    assert_eq!(categories[0].value, Decimal::from(12));
    assert_eq!(categories[1].label, "Travel");
}

#[ignore = "needs postgres"]
#[sqlx::test(migrations = "./migrations")]
async fn top_items_are_limited_and_descending(db: PgPool) {
    let alice = common::user(&db, "alice@example.com").await;
    common::receipt(
        &db,
        alice.id,
        "2024-03-01",
        "Dining Out",
        &[("Coffee", 3.0), ("Cake", 6.0), ("Tea", 2.0)],
    )
    .await;
    common::receipt(&db, alice.id, "2024-03-02", "Dining Out", &[("Coffee", 4.0)]).await;

    let top = repo::top_items(&db, alice.id, DateRange::default(), 2)
        .await
        .unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].label, "Coffee");
    assert_eq!(top[0].value, Decimal::from(7));
    assert_eq!(top[1].label, "Cake");
    assert!(top.windows(2).all(|w| w[0].value >= w[1].value));
}
