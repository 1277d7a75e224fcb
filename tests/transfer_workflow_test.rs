//! End-to-end walk through the transfer workflow, asserting stock balances
//! at every step.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, Utc};
use common::{as_decimal, balance_of, TestApp};
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn bulk_transfer_moves_stock_exactly_once() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    // Create: Warehouse -> Store, 5 widgets, no serials.
    let (status, created) = app
        .request(
            Method::POST,
            "/api/v1/transfers",
            &fx.alice,
            Some(json!({
                "source_location_id": fx.warehouse_id,
                "destination_location_id": fx.store_id,
                "notes": "weekly replenishment",
                "items": [{
                    "product_id": fx.widget_product_id,
                    "variation_id": fx.widget_variation_id,
                    "quantity": "5"
                }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["status"], "draft");
    assert_eq!(created["stock_deducted"], false);
    assert_eq!(created["source_location_name"], "Warehouse");
    assert_eq!(created["destination_location_name"], "Store");

    let id = created["id"].as_str().unwrap().to_string();
    let number = created["transfer_number"].as_str().unwrap().to_string();
    let today = Utc::now();
    assert!(
        number.starts_with(&format!("TR-{:04}{:02}-", today.year(), today.month())),
        "unexpected number {}",
        number
    );
    assert!(number.ends_with("-0001"), "unexpected number {}", number);

    // Nothing moved yet.
    assert_eq!(
        balance_of(&app, &fx.bob, fx.widget_variation_id, fx.warehouse_id).await,
        Decimal::from(10)
    );
    assert_eq!(
        balance_of(&app, &fx.bob, fx.widget_variation_id, fx.store_id).await,
        Decimal::ZERO
    );

    // Check by bob.
    let (status, checked) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/check", id),
            &fx.bob,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", checked);
    assert_eq!(checked["status"], "checked");
    assert_eq!(checked["stock_deducted"], false);

    // Send by bob: source drops by 5, destination unchanged.
    let (status, sent) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/send", id),
            &fx.bob,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", sent);
    assert_eq!(sent["status"], "in_transit");
    assert_eq!(sent["stock_deducted"], true);
    assert_eq!(
        balance_of(&app, &fx.bob, fx.widget_variation_id, fx.warehouse_id).await,
        Decimal::from(5)
    );
    assert_eq!(
        balance_of(&app, &fx.bob, fx.widget_variation_id, fx.store_id).await,
        Decimal::ZERO
    );

    // Arrive and verify at the store by carol.
    let (status, arrived) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/arrive", id),
            &fx.carol,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", arrived);
    assert_eq!(arrived["status"], "arrived");

    let item_id = arrived["items"][0]["id"].as_str().unwrap();
    let (status, verified) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/verify", id),
            &fx.carol,
            Some(json!({
                "receipts": [{ "item_id": item_id, "received_quantity": "5" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", verified);
    assert_eq!(verified["status"], "verified");
    assert_eq!(as_decimal(&verified["items"][0]["received_quantity"]), Decimal::from(5));

    // Destination is still untouched until completion.
    assert_eq!(
        balance_of(&app, &fx.bob, fx.widget_variation_id, fx.store_id).await,
        Decimal::ZERO
    );

    // Complete: destination credited exactly once.
    let (status, completed) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/complete", id),
            &fx.carol,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", completed);
    assert_eq!(completed["status"], "completed");
    assert_eq!(
        balance_of(&app, &fx.bob, fx.widget_variation_id, fx.warehouse_id).await,
        Decimal::from(5)
    );
    assert_eq!(
        balance_of(&app, &fx.bob, fx.widget_variation_id, fx.store_id).await,
        Decimal::from(5)
    );

    // The workflow log shows every actor in order.
    let steps: Vec<&str> = completed["workflow"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["step"].as_str().unwrap())
        .collect();
    assert_eq!(steps, vec!["create", "check", "send", "arrive", "verify", "complete"]);
    assert_eq!(completed["workflow"][0]["actor_name"], "Alice");
    assert_eq!(completed["workflow"][5]["actor_name"], "Carol");

    // A completed transfer cannot move again.
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/send", id),
            &fx.bob,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
}

#[tokio::test]
async fn serialized_transfer_tracks_units_end_to_end() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    let (status, created) = app
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
                    "serial_ids": fx.serial_ids
                }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);

    // Attachment does not reserve: units stay in stock until dispatch.
    let serials = created["items"][0]["serial_numbers"].as_array().unwrap();
    assert_eq!(serials.len(), 3);
    for serial in serials {
        assert_eq!(serial["status"], "in_stock");
    }

    let id = created["id"].as_str().unwrap().to_string();
    let item_id = created["items"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/check", id),
            &fx.bob,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, sent) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/send", id),
            &fx.bob,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", sent);
    for serial in sent["items"][0]["serial_numbers"].as_array().unwrap() {
        assert_eq!(serial["status"], "in_transit");
    }
    assert_eq!(
        balance_of(&app, &fx.bob, fx.gadget_variation_id, fx.warehouse_id).await,
        Decimal::ZERO
    );

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/arrive", id),
            &fx.carol,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Serialized lines must arrive complete.
    let (status, short) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/verify", id),
            &fx.carol,
            Some(json!({
                "receipts": [{ "item_id": item_id, "received_quantity": "2" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", short);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/verify", id),
            &fx.carol,
            Some(json!({
                "receipts": [{ "item_id": item_id, "received_quantity": "3" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, completed) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/complete", id),
            &fx.carol,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", completed);

    // Units are back in stock at the destination.
    for serial in completed["items"][0]["serial_numbers"].as_array().unwrap() {
        assert_eq!(serial["status"], "in_stock");
    }
    assert_eq!(
        balance_of(&app, &fx.bob, fx.gadget_variation_id, fx.store_id).await,
        Decimal::from(3)
    );
}

#[tokio::test]
async fn transfer_numbers_increment_within_the_month() {
    let app = TestApp::new().await;
    let fx = app.seed().await;

    let mut numbers = Vec::new();
    for _ in 0..3 {
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
                        "quantity": "1"
                    }]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", created);
        numbers.push(created["transfer_number"].as_str().unwrap().to_string());
    }

    assert!(numbers[0].ends_with("-0001"));
    assert!(numbers[1].ends_with("-0002"));
    assert!(numbers[2].ends_with("-0003"));
}

#[tokio::test]
async fn draft_can_be_updated_but_not_after_check() {
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
                    "quantity": "2"
                }]
            })),
        )
        .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/v1/transfers/{}", id),
            &fx.alice,
            Some(json!({ "notes": "rush order" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["notes"], "rush order");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/transfers/{}/check", id),
            &fx.bob,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, rejected) = app
        .request(
            Method::PUT,
            &format!("/api/v1/transfers/{}", id),
            &fx.alice,
            Some(json!({ "notes": "too late" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", rejected);
}
