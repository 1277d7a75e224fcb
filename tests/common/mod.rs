//! Shared harness for integration tests: an in-process router backed by a
//! throwaway sqlite database, plus seeded reference data.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use storeflow_api::{
    self as api,
    entities::{
        business_location, product, product_variation, serial_number,
        serial_number::SerialStatus, sod_settings, user, user_location,
    },
    events::ActorContext,
};

/// All transfer and stock permissions, for operators who are not being
/// permission-tested.
pub fn full_permissions() -> String {
    [
        "transfers:read",
        "transfers:create",
        "transfers:update",
        "transfers:check",
        "transfers:send",
        "transfers:receive",
        "transfers:complete",
        "transfers:cancel",
        "stock:read",
        "stock:adjust",
    ]
    .join(",")
}

#[derive(Debug, Clone)]
pub struct TestActor {
    pub id: Uuid,
    pub business_id: Uuid,
    pub username: String,
    pub permissions: String,
}

impl TestActor {
    pub fn with_permissions(&self, permissions: &str) -> TestActor {
        TestActor {
            permissions: permissions.to_string(),
            ..self.clone()
        }
    }

    pub fn with_all_locations(&self) -> TestActor {
        TestActor {
            permissions: format!("{},locations:all", self.permissions),
            ..self.clone()
        }
    }
}

/// Seeded world: one business, three locations, a bulk and a serialized
/// variation, and operators with distinct assignments.
pub struct Fixture {
    pub business_id: Uuid,
    pub warehouse_id: Uuid,
    pub store_id: Uuid,
    pub annex_id: Uuid,
    pub widget_product_id: Uuid,
    pub widget_variation_id: Uuid,
    pub gadget_product_id: Uuid,
    pub gadget_variation_id: Uuid,
    /// Three units in stock at the warehouse.
    pub serial_ids: Vec<Uuid>,
    pub serial_codes: Vec<String>,
    /// A unit already sold, for negative tests.
    pub sold_serial_id: Uuid,
    /// Assigned to the warehouse.
    pub alice: TestActor,
    /// Assigned to both warehouse and store.
    pub bob: TestActor,
    /// Assigned to the store only.
    pub carol: TestActor,
    /// No assignments at all.
    pub dana: TestActor,
}

pub struct TestApp {
    pub router: Router,
    pub state: api::AppState,
    _tmp: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let db_path = tmp.path().join("storeflow_test.db");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let cfg = api::config::AppConfig::new(
            database_url,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );

        let pool = api::db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        api::db::run_migrations(&pool).await.expect("migrations");

        let db = Arc::new(pool);
        let (tx, rx) = mpsc::channel(256);
        let event_sender = api::events::EventSender::new(tx);
        let event_task = tokio::spawn(api::events::process_events(
            rx,
            Arc::new(api::services::audit::TracingAuditSink),
            Arc::new(api::services::notifications::LogNotificationSink),
        ));

        let state = api::AppState::new(db, cfg, event_sender);
        let router = api::build_router(state.clone());

        Self {
            router,
            state,
            _tmp: tmp,
            _event_task: event_task,
        }
    }

    pub async fn seed(&self) -> Fixture {
        let db = &*self.state.db;
        let business_id = Uuid::new_v4();
        let now = Utc::now();

        let location = |name: &str| business_location::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business_id),
            name: Set(name.to_string()),
            code: Set(None),
            is_active: Set(true),
            created_at: Set(now),
        };
        let warehouse = location("Warehouse");
        let store = location("Store");
        let annex = location("Annex");
        let warehouse_id = warehouse.id.clone().unwrap();
        let store_id = store.id.clone().unwrap();
        let annex_id = annex.id.clone().unwrap();
        for model in [warehouse, store, annex] {
            model.insert(db).await.expect("insert location");
        }

        let operator = |name: &str| user::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(business_id),
            username: Set(name.to_lowercase()),
            display_name: Set(name.to_string()),
            is_active: Set(true),
            created_at: Set(now),
        };
        let alice = operator("Alice");
        let bob = operator("Bob");
        let carol = operator("Carol");
        let dana = operator("Dana");
        let alice_id = alice.id.clone().unwrap();
        let bob_id = bob.id.clone().unwrap();
        let carol_id = carol.id.clone().unwrap();
        let dana_id = dana.id.clone().unwrap();
        for model in [alice, bob, carol, dana] {
            model.insert(db).await.expect("insert user");
        }

        for (user_id, location_id) in [
            (alice_id, warehouse_id),
            (bob_id, warehouse_id),
            (bob_id, store_id),
            (carol_id, store_id),
        ] {
            user_location::ActiveModel {
                user_id: Set(user_id),
                location_id: Set(location_id),
            }
            .insert(db)
            .await
            .expect("insert assignment");
        }

        let widget_product_id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(widget_product_id),
            business_id: Set(business_id),
            name: Set("Widget".to_string()),
            sku: Set("WID".to_string()),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .expect("insert product");

        let widget_variation_id = Uuid::new_v4();
        product_variation::ActiveModel {
            id: Set(widget_variation_id),
            product_id: Set(widget_product_id),
            name: Set("Widget Standard".to_string()),
            sku: Set("WID-STD".to_string()),
            is_serialized: Set(false),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .expect("insert variation");

        let gadget_product_id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(gadget_product_id),
            business_id: Set(business_id),
            name: Set("Gadget".to_string()),
            sku: Set("GAD".to_string()),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .expect("insert product");

        let gadget_variation_id = Uuid::new_v4();
        product_variation::ActiveModel {
            id: Set(gadget_variation_id),
            product_id: Set(gadget_product_id),
            name: Set("Gadget Pro".to_string()),
            sku: Set("GAD-PRO".to_string()),
            is_serialized: Set(true),
            created_at: Set(now),
        }
        .insert(db)
        .await
        .expect("insert variation");

        let mut serial_ids = Vec::new();
        let mut serial_codes = Vec::new();
        for n in 1..=3 {
            let id = Uuid::new_v4();
            let code = format!("SN-{:03}", n);
            serial_number::ActiveModel {
                id: Set(id),
                business_id: Set(business_id),
                product_id: Set(gadget_product_id),
                variation_id: Set(gadget_variation_id),
                code: Set(code.clone()),
                status: Set(SerialStatus::InStock),
                current_location_id: Set(Some(warehouse_id)),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(db)
            .await
            .expect("insert serial");
            serial_ids.push(id);
            serial_codes.push(code);
        }

        let sold_serial_id = Uuid::new_v4();
        serial_number::ActiveModel {
            id: Set(sold_serial_id),
            business_id: Set(business_id),
            product_id: Set(gadget_product_id),
            variation_id: Set(gadget_variation_id),
            code: Set("SN-004".to_string()),
            status: Set(SerialStatus::Sold),
            current_location_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("insert sold serial");

        // Opening stock: 10 widgets and 3 gadgets at the warehouse.
        let seed_actor = ActorContext {
            actor_id: alice_id,
            ip_address: None,
            user_agent: None,
        };
        self.state
            .services
            .stock_ledger
            .record_adjustment(
                seed_actor.clone(),
                business_id,
                widget_product_id,
                widget_variation_id,
                warehouse_id,
                Decimal::from(10),
            )
            .await
            .expect("seed widget stock");
        self.state
            .services
            .stock_ledger
            .record_adjustment(
                seed_actor,
                business_id,
                gadget_product_id,
                gadget_variation_id,
                warehouse_id,
                Decimal::from(3),
            )
            .await
            .expect("seed gadget stock");

        let actor = |id: Uuid, name: &str| TestActor {
            id,
            business_id,
            username: name.to_string(),
            permissions: full_permissions(),
        };

        Fixture {
            business_id,
            warehouse_id,
            store_id,
            annex_id,
            widget_product_id,
            widget_variation_id,
            gadget_product_id,
            gadget_variation_id,
            serial_ids,
            serial_codes,
            sold_serial_id,
            alice: actor(alice_id, "alice"),
            bob: actor(bob_id, "bob"),
            carol: actor(carol_id, "carol"),
            dana: actor(dana_id, "dana"),
        }
    }

    /// Writes (or replaces) the SOD settings row for a business.
    pub async fn set_sod_settings(&self, settings: sod_settings::Model) {
        use sea_orm::EntityTrait;
        let db = &*self.state.db;
        let _ = sod_settings::Entity::delete_by_id(settings.business_id)
            .exec(db)
            .await;
        sod_settings::ActiveModel {
            business_id: Set(settings.business_id),
            enforce_transfer_sod: Set(settings.enforce_transfer_sod),
            allow_creator_check: Set(settings.allow_creator_check),
            allow_creator_send: Set(settings.allow_creator_send),
            allow_checker_send: Set(settings.allow_checker_send),
            allow_creator_receive: Set(settings.allow_creator_receive),
            allow_sender_complete: Set(settings.allow_sender_complete),
            allow_creator_complete: Set(settings.allow_creator_complete),
            allow_receiver_complete: Set(settings.allow_receiver_complete),
            updated_at: Set(settings.updated_at),
        }
        .insert(db)
        .await
        .expect("insert sod settings");
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        actor: &TestActor,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-actor-id", actor.id.to_string())
            .header("x-business-id", actor.business_id.to_string())
            .header("x-actor-name", &actor.username)
            .header("x-actor-permissions", &actor.permissions);

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collect")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }
}

/// Parses a JSON value that may carry a decimal as string or number.
pub fn as_decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal value: {:?}", other),
    }
}

/// Balance of a variation at a location, read through the API.
pub async fn balance_of(
    app: &TestApp,
    actor: &TestActor,
    variation_id: Uuid,
    location_id: Uuid,
) -> Decimal {
    let (status, body) = app
        .request(
            Method::GET,
            &format!(
                "/api/v1/stock/balance?variation_id={}&location_id={}",
                variation_id, location_id
            ),
            actor,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "balance read failed: {}", body);
    as_decimal(&body["balance"])
}
