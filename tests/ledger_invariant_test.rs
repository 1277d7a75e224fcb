//! The central ledger invariant: for every (variation, location) pair the
//! stored running balance always equals the sum of all signed entries.

mod common;

use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use storeflow_api::{entities::stock_ledger_entry, events::ActorContext};

fn seed_actor(fx: &common::Fixture) -> ActorContext {
    ActorContext {
        actor_id: fx.alice.id,
        ip_address: None,
        user_agent: None,
    }
}

#[tokio::test]
async fn running_balance_equals_signed_sum_after_each_append() {
    let app = TestApp::new().await;
    let fx = app.seed().await;
    let ledger = &app.state.services.stock_ledger;

    // A mixed sequence of credits and debits, applied on top of the seeded
    // opening balance of 10.
    let deltas: [i64; 8] = [7, -3, 12, -9, 1, -1, 20, -15];
    let mut expected = Decimal::from(10);

    for delta in deltas {
        let entry = ledger
            .record_adjustment(
                seed_actor(&fx),
                fx.business_id,
                fx.widget_product_id,
                fx.widget_variation_id,
                fx.warehouse_id,
                Decimal::from(delta),
            )
            .await
            .expect("adjustment");

        expected += Decimal::from(delta);
        assert_eq!(entry.balance, expected, "stored balance drifted");

        let live = ledger
            .balance(&*app.state.db, fx.widget_variation_id, fx.warehouse_id)
            .await
            .unwrap();
        assert_eq!(live, expected, "derived balance drifted");
    }

    // Cross-check against the raw table.
    let entries = stock_ledger_entry::Entity::find()
        .filter(stock_ledger_entry::Column::VariationId.eq(fx.widget_variation_id))
        .filter(stock_ledger_entry::Column::LocationId.eq(fx.warehouse_id))
        .order_by_asc(stock_ledger_entry::Column::CreatedAt)
        .all(&*app.state.db)
        .await
        .unwrap();

    let sum: Decimal = entries.iter().map(|e| e.quantity).sum();
    assert_eq!(sum, expected);
}

#[tokio::test]
async fn overdraw_is_rejected_and_appends_nothing() {
    let app = TestApp::new().await;
    let fx = app.seed().await;
    let ledger = &app.state.services.stock_ledger;

    let before = stock_ledger_entry::Entity::find()
        .filter(stock_ledger_entry::Column::VariationId.eq(fx.widget_variation_id))
        .all(&*app.state.db)
        .await
        .unwrap()
        .len();

    let result = ledger
        .record_adjustment(
            seed_actor(&fx),
            fx.business_id,
            fx.widget_product_id,
            fx.widget_variation_id,
            fx.warehouse_id,
            dec!(-11),
        )
        .await;
    assert_matches::assert_matches!(
        result,
        Err(storeflow_api::errors::ServiceError::InsufficientStock(_))
    );

    let after = stock_ledger_entry::Entity::find()
        .filter(stock_ledger_entry::Column::VariationId.eq(fx.widget_variation_id))
        .all(&*app.state.db)
        .await
        .unwrap()
        .len();
    assert_eq!(before, after);

    let balance = ledger
        .balance(&*app.state.db, fx.widget_variation_id, fx.warehouse_id)
        .await
        .unwrap();
    assert_eq!(balance, Decimal::from(10));
}

#[tokio::test]
async fn zero_adjustment_is_rejected() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    let result = app
        .state
        .services
        .stock_ledger
        .record_adjustment(
            seed_actor(&fx),
            fx.business_id,
            fx.widget_product_id,
            fx.widget_variation_id,
            fx.warehouse_id,
            Decimal::ZERO,
        )
        .await;
    assert_matches::assert_matches!(
        result,
        Err(storeflow_api::errors::ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn balances_are_isolated_per_location() {
    let app = TestApp::new().await;
    let fx = app.seed().await;
    let ledger = &app.state.services.stock_ledger;

    ledger
        .record_adjustment(
            seed_actor(&fx),
            fx.business_id,
            fx.widget_product_id,
            fx.widget_variation_id,
            fx.store_id,
            Decimal::from(4),
        )
        .await
        .unwrap();

    let warehouse = ledger
        .balance(&*app.state.db, fx.widget_variation_id, fx.warehouse_id)
        .await
        .unwrap();
    let store = ledger
        .balance(&*app.state.db, fx.widget_variation_id, fx.store_id)
        .await
        .unwrap();

    assert_eq!(warehouse, Decimal::from(10));
    assert_eq!(store, Decimal::from(4));
}
