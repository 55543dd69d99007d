//! Store behavior against an in-memory database.

use arara_markets::{BasketId, Side};
use arara_store::{
    Basket, BasketStatus, NewFill, NewOrder, OrderStatus, Store,
};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn basket_id(raw: &str) -> BasketId {
    BasketId::new(raw).unwrap()
}

fn sample_basket(id: &str) -> Basket {
    Basket {
        id: basket_id(id),
        pair: "SOLUSDC".to_string(),
        anchor_price: dec!(150.000),
        status: BasketStatus::Active,
        config_json: serde_json::json!({"pair": "SOLUSDC"}).to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        closed_at: None,
    }
}

fn buy_order(basket: &str, cid: &str, price: Decimal, qty: Decimal) -> NewOrder {
    NewOrder {
        basket_id: basket_id(basket),
        venue_order_id: None,
        client_order_id: cid.to_string(),
        side: Side::Buy,
        order_type: "LIMIT".to_string(),
        price,
        qty,
        status: OrderStatus::New,
    }
}

#[tokio::test]
async fn basket_round_trip_and_anchor_update() {
    let store = Store::in_memory().await.unwrap();
    let basket = sample_basket("b00000001");
    store.insert_basket(&basket).await.unwrap();

    let loaded = store.basket(&basket.id).await.unwrap().unwrap();
    assert_eq!(loaded, basket);
    assert_eq!(store.active_baskets().await.unwrap().len(), 1);

    store
        .update_basket_anchor(&basket.id, dec!(148.250))
        .await
        .unwrap();
    let reloaded = store.basket(&basket.id).await.unwrap().unwrap();
    assert_eq!(reloaded.anchor_price, dec!(148.250));

    store
        .update_basket_status(&basket.id, BasketStatus::Closed, Some(Utc::now()))
        .await
        .unwrap();
    assert!(store.active_baskets().await.unwrap().is_empty());
}

#[tokio::test]
async fn client_order_id_is_globally_unique() {
    let store = Store::in_memory().await.unwrap();
    store.insert_basket(&sample_basket("b00000001")).await.unwrap();

    let order = buy_order("b00000001", "SOLUSDC_b00000001_B_1", dec!(142.500), dec!(0.56));
    store.upsert_order(&order).await.unwrap();
    store
        .upsert_order(&NewOrder {
            price: dec!(142.600),
            venue_order_id: Some(9001),
            ..order.clone()
        })
        .await
        .unwrap();

    // Upsert replaced, not duplicated.
    let stored = store
        .order_by_client_id("SOLUSDC_b00000001_B_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.price, dec!(142.600));
    assert_eq!(stored.venue_order_id, Some(9001));
    assert_eq!(store.open_orders(&basket_id("b00000001")).await.unwrap().len(), 1);

    // Later upserts without a venue id keep the recorded one.
    store.upsert_order(&order).await.unwrap();
    let stored = store
        .order_by_client_id("SOLUSDC_b00000001_B_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.venue_order_id, Some(9001));
    assert_eq!(
        store
            .order_by_venue_id("SOLUSDC", 9001)
            .await
            .unwrap()
            .unwrap()
            .client_order_id,
        "SOLUSDC_b00000001_B_1"
    );
}

#[tokio::test]
async fn fills_are_idempotent_and_aggregate_into_position() {
    let store = Store::in_memory().await.unwrap();
    store.insert_basket(&sample_basket("b00000001")).await.unwrap();
    store
        .upsert_order(&buy_order(
            "b00000001",
            "SOLUSDC_b00000001_B_1",
            dec!(142.500),
            dec!(0.56),
        ))
        .await
        .unwrap();
    let order = store
        .order_by_client_id("SOLUSDC_b00000001_B_1")
        .await
        .unwrap()
        .unwrap();

    let fill = NewFill {
        order_id: order.id,
        basket_id: basket_id("b00000001"),
        venue_trade_id: 501,
        side: Side::Buy,
        price: dec!(142.500),
        qty: dec!(0.56),
        commission: dec!(0.0798),
        commission_asset: "USDC".to_string(),
        executed_at: Utc::now(),
    };
    assert!(store.insert_fill(&fill).await.unwrap());
    // Same venue trade id again: ignored.
    assert!(!store.insert_fill(&fill).await.unwrap());
    assert!(store
        .insert_fill(&NewFill {
            venue_trade_id: 502,
            side: Side::Sell,
            qty: dec!(0.20),
            ..fill.clone()
        })
        .await
        .unwrap());

    assert_eq!(store.position(&basket_id("b00000001")).await.unwrap(), dec!(0.36));
    assert_eq!(store.fills_for_basket(&basket_id("b00000001")).await.unwrap().len(), 2);
    assert_eq!(store.fills_for_order(order.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn order_status_transitions_record_fill_time() {
    let store = Store::in_memory().await.unwrap();
    store.insert_basket(&sample_basket("b00000001")).await.unwrap();
    store
        .upsert_order(&buy_order(
            "b00000001",
            "SOLUSDC_b00000001_B_1",
            dec!(142.500),
            dec!(0.56),
        ))
        .await
        .unwrap();

    let filled_at = Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap();
    store
        .set_order_fill_status(
            "SOLUSDC_b00000001_B_1",
            OrderStatus::Filled,
            Some(filled_at),
        )
        .await
        .unwrap();
    let stored = store
        .order_by_client_id("SOLUSDC_b00000001_B_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Filled);
    assert_eq!(stored.filled_at, Some(filled_at));
    assert!(store.open_orders(&basket_id("b00000001")).await.unwrap().is_empty());

    store
        .mark_order_canceled("SOLUSDC_b00000001_B_1")
        .await
        .unwrap();
    let stored = store
        .order_by_client_id("SOLUSDC_b00000001_B_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Canceled);
}

#[tokio::test]
async fn transaction_rolls_back_when_dropped() {
    let store = Store::in_memory().await.unwrap();
    store.insert_basket(&sample_basket("b00000001")).await.unwrap();
    store
        .upsert_order(&buy_order(
            "b00000001",
            "SOLUSDC_b00000001_B_1",
            dec!(142.500),
            dec!(0.56),
        ))
        .await
        .unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        tx.mark_order_canceled("SOLUSDC_b00000001_B_1").await.unwrap();
        // Dropped without commit.
    }
    let stored = store
        .order_by_client_id("SOLUSDC_b00000001_B_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::New);

    let mut tx = store.begin().await.unwrap();
    tx.mark_order_canceled("SOLUSDC_b00000001_B_1").await.unwrap();
    tx.commit().await.unwrap();
    let stored = store
        .order_by_client_id("SOLUSDC_b00000001_B_1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Canceled);
}

#[tokio::test]
async fn config_overlay_and_snapshots() {
    let store = Store::in_memory().await.unwrap();
    assert_eq!(store.config_get("system_status.status").await.unwrap(), None);
    store
        .config_set("system_status.status", "stopped")
        .await
        .unwrap();
    store
        .config_set("system_status.status", "running")
        .await
        .unwrap();
    assert_eq!(
        store.config_get("system_status.status").await.unwrap().as_deref(),
        Some("running")
    );

    assert!(store.latest_snapshot().await.unwrap().is_none());
    store
        .insert_snapshot(dec!(812.50), dec!(2.61), dec!(1159.55), Utc::now())
        .await
        .unwrap();
    store
        .insert_snapshot(dec!(700.00), dec!(3.01), dec!(1101.30), Utc::now())
        .await
        .unwrap();
    let latest = store.latest_snapshot().await.unwrap().unwrap();
    assert_eq!(latest.quote_free, dec!(700.00));
    assert_eq!(latest.base_free, dec!(3.01));
}
