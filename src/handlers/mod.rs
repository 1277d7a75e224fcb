pub mod common;
pub mod health;
pub mod stock;
pub mod transfers;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};

use crate::{
    clock::BusinessClock,
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        locations::LocationAccessService, serial_registry::SerialRegistryService,
        stock_ledger::StockLedgerService, transfers::TransferService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub transfers: Arc<TransferService>,
    pub stock_ledger: Arc<StockLedgerService>,
    pub serials: Arc<SerialRegistryService>,
    pub locations: Arc<LocationAccessService>,
}

impl AppServices {
    /// Wires the service graph from shared infrastructure.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        let clock = BusinessClock::from_offset_minutes(config.business_utc_offset_minutes);
        let txn_timeout = Duration::from_secs(config.db_transaction_timeout_secs);

        let locations = Arc::new(LocationAccessService::new(db_pool.clone()));
        let stock_ledger = Arc::new(StockLedgerService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let serials = Arc::new(SerialRegistryService::new(db_pool.clone()));

        let transfers = Arc::new(TransferService::new(
            db_pool,
            Some(event_sender),
            (*stock_ledger).clone(),
            (*serials).clone(),
            (*locations).clone(),
            clock,
            txn_timeout,
        ));

        Self {
            transfers,
            stock_ledger,
            serials,
            locations,
        }
    }
}

/// Assembles the versioned API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1/transfers", transfers::transfers_router())
        .nest("/api/v1/stock", stock::stock_router())
        .route("/health", get(health::health))
}
