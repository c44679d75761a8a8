//! DB-backed checks for `PgOrderStore`. Skips if SHOP_DATABASE_URL is not set.

use chrono::Utc;
use shop_db::{persist_reason_best_effort, NewOrder, OrderStore, PgOrderStore, REASON_SLOTS};
use shop_workflow::{FulfillmentType, OrderStatus};
use uuid::Uuid;

async fn store_or_skip() -> anyhow::Result<Option<PgOrderStore>> {
    let url = match std::env::var(shop_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: SHOP_DATABASE_URL not set");
            return Ok(None);
        }
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;
    shop_db::migrate(&pool).await?;
    Ok(Some(PgOrderStore::new(pool)))
}

fn new_order(ft: Option<FulfillmentType>) -> NewOrder {
    let id = Uuid::new_v4();
    NewOrder {
        id,
        code: format!("T-{}", id.simple()),
        fulfillment_type: ft,
        payment_method: Some("pix".to_string()),
        customer_name: Some("Test".to_string()),
        customer_phone: None,
        total_cents: 4_990,
    }
}

#[tokio::test]
async fn deny_path_sets_canceled_at_and_reason() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };
    let order = new_order(Some(FulfillmentType::Delivery));
    store.insert_order(&order).await?;

    let rec = store.fetch_order(order.id).await?.expect("row just inserted");
    assert_eq!(rec.status, OrderStatus::Pending);
    assert_eq!(rec.fulfillment(), FulfillmentType::Delivery);

    let moved = store
        .commit_status(order.id, OrderStatus::Pending, OrderStatus::Canceled, Some(Utc::now()))
        .await?;
    assert!(moved);

    let slot = persist_reason_best_effort(&store, order.id, "Item indisponível").await;
    assert_eq!(slot, Some(REASON_SLOTS[0]));

    let rec = store.fetch_order(order.id).await?.expect("row exists");
    assert_eq!(rec.status, OrderStatus::Canceled);
    assert!(rec.canceled_at.is_some());
    assert_eq!(
        store.fetch_cancellation_reason(order.id).await?.as_deref(),
        Some("Item indisponível")
    );
    Ok(())
}

#[tokio::test]
async fn stale_expected_status_does_not_write() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };
    let order = new_order(None);
    store.insert_order(&order).await?;

    let moved = store
        .commit_status(
            order.id,
            OrderStatus::InPreparation,
            OrderStatus::OutForDeliveryOrReady,
            None,
        )
        .await?;
    assert!(!moved);

    let rec = store.fetch_order(order.id).await?.expect("row exists");
    assert_eq!(rec.status, OrderStatus::Pending);
    assert_eq!(rec.fulfillment(), FulfillmentType::Pickup);
    Ok(())
}

#[tokio::test]
async fn unknown_order_reads_as_none() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };
    assert!(store.fetch_order(Uuid::new_v4()).await?.is_none());
    Ok(())
}
