//! Validation rejections: all of them fire before any write, leaving zero
//! persisted side effects.

mod common;

use axum::http::{Method, StatusCode};
use common::{balance_of, TestApp};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use storeflow_api::entities::{serial_number, serial_number::SerialStatus, stock_transfer};

async fn transfer_count(app: &TestApp, business_id: uuid::Uuid) -> u64 {
    stock_transfer::Entity::find()
        .filter(stock_transfer::Column::BusinessId.eq(business_id))
        .count(&*app.state.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn same_source_and_destination_is_rejected() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            &fx.alice,
            Some(json!({
                "source_location_id": fx.warehouse_id,
                "destination_location_id": fx.warehouse_id,
                "items": [{
                    "product_id": fx.widget_product_id,
                    "variation_id": fx.widget_variation_id,
                    "quantity": "5"
                }]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(transfer_count(&app, fx.business_id).await, 0);
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    for quantity in ["0", "-3"] {
        let (status, body) = app
            .request(
                Method::POST,
                "/api/v1/transfers",
                &fx.alice,
                Some(json!({
                    "source_location_id": fx.warehouse_id,
                    "destination_location_id": fx.store_id,
                    "items": [{
                        "product_id": fx.widget_product_id,
                        "variation_id": fx.widget_variation_id,
                        "quantity": quantity
                    }]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "qty {}: {}", quantity, body);
    }
    assert_eq!(transfer_count(&app, fx.business_id).await, 0);
}

#[tokio::test]
async fn empty_item_list_is_rejected() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            &fx.alice,
            Some(json!({
                "source_location_id": fx.warehouse_id,
                "destination_location_id": fx.store_id,
                "items": []
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(transfer_count(&app, fx.business_id).await, 0);
}

#[tokio::test]
async fn serial_count_mismatch_is_rejected() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    // Three serials attached for a quantity of two.
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            &fx.alice,
            Some(json!({
                "source_location_id": fx.warehouse_id,
                "destination_location_id": fx.store_id,
                "items": [{
                    "product_id": fx.gadget_product_id,
                    "variation_id": fx.gadget_variation_id,
                    "quantity": "2",
                    "serial_ids": fx.serial_ids
                }]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(transfer_count(&app, fx.business_id).await, 0);
}

#[tokio::test]
async fn sold_serial_is_rejected_with_no_side_effects() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    let mut serial_ids = fx.serial_ids[..2].to_vec();
    serial_ids.push(fx.sold_serial_id);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            &fx.alice,
            Some(json!({
                "source_location_id": fx.warehouse_id,
                "destination_location_id": fx.store_id,
                "items": [{
                    "product_id": fx.gadget_product_id,
                    "variation_id": fx.gadget_variation_id,
                    "quantity": "3",
                    "serial_ids": serial_ids
                }]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(transfer_count(&app, fx.business_id).await, 0);

    // The sold unit is untouched.
    let sold = serial_number::Entity::find_by_id(fx.sold_serial_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sold.status, SerialStatus::Sold);
}

#[tokio::test]
async fn serialized_variation_requires_serials() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            &fx.alice,
            Some(json!({
                "source_location_id": fx.warehouse_id,
                "destination_location_id": fx.store_id,
                "items": [{
                    "product_id": fx.gadget_product_id,
                    "variation_id": fx.gadget_variation_id,
                    "quantity": "2"
                }]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(transfer_count(&app, fx.business_id).await, 0);
}

#[tokio::test]
async fn unknown_location_is_not_found() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            &fx.alice,
            Some(json!({
                "source_location_id": uuid::Uuid::new_v4(),
                "destination_location_id": fx.store_id,
                "items": [{
                    "product_id": fx.widget_product_id,
                    "variation_id": fx.widget_variation_id,
                    "quantity": "1"
                }]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);
}

#[tokio::test]
async fn insufficient_stock_rejects_the_whole_dispatch() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    // Request 5 widgets when only 10 exist, plus a second line that
    // overdraws; the entire send must fail, including the healthy line.
    let (status, created) = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            &fx.alice,
            Some(json!({
                "source_location_id": fx.warehouse_id,
                "destination_location_id": fx.store_id,
                "items": [{
                    "product_id": fx.widget_product_id,
                    "variation_id": fx.widget_variation_id,
                    "quantity": "25"
                }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    let id = created["id"].as_str().unwrap();

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/check", id),
            &fx.bob,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/send", id),
            &fx.bob,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);

    // Ledger unchanged, header still awaiting dispatch.
    assert_eq!(
        balance_of(&app, &fx.bob, fx.widget_variation_id, fx.warehouse_id).await,
        Decimal::from(10)
    );
    let (status, fetched) = app
        .request(
            Method::GET,
            &format!("/api/v1/transfers/{}", id),
            &fx.bob,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "checked");
    assert_eq!(fetched["stock_deducted"], false);
}

#[tokio::test]
async fn verify_rejects_over_receipt() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    let (_, created) = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            &fx.alice,
            Some(json!({
                "source_location_id": fx.warehouse_id,
                "destination_location_id": fx.store_id,
                "items": [{
                    "product_id": fx.widget_product_id,
                    "variation_id": fx.widget_variation_id,
                    "quantity": "4"
                }]
            })),
        )
        .await;
    let id = created["id"].as_str().unwrap().to_string();
    let item_id = created["items"][0]["id"].as_str().unwrap().to_string();

    for step in ["check", "send"] {
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/v1/transfers/{}/{}", id, step),
                &fx.bob,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/arrive", id),
            &fx.carol,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // More than was sent.
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/verify", id),
            &fx.carol,
            Some(json!({
                "receipts": [{ "item_id": item_id, "received_quantity": "9" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
}
