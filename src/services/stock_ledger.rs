use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::stock_ledger_entry::{self, Entity as StockLedgerEntry, LedgerEntryType},
    errors::ServiceError,
    events::{ActorContext, Event, EventSender},
};

/// Reference document types recorded on ledger entries.
pub const REF_STOCK_TRANSFER: &str = "stock_transfer";
pub const REF_ADJUSTMENT: &str = "adjustment";

/// A quantity change to post. `quantity` is signed: debits negative, credits
/// positive.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub business_id: Uuid,
    pub product_id: Uuid,
    pub variation_id: Uuid,
    pub location_id: Uuid,
    pub entry_type: LedgerEntryType,
    pub quantity: Decimal,
    pub reference_type: &'static str,
    pub reference_id: Uuid,
    pub created_by: Uuid,
}

/// Append-only quantity ledger per (product variation, location).
///
/// Entries are never mutated; corrections append. Each entry stores the
/// running balance after itself, so the current balance of a pair is the
/// latest entry's balance and always equals the sum of all signed
/// quantities before it.
#[derive(Clone)]
pub struct StockLedgerService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl StockLedgerService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Current balance for a variation at a location: the latest entry's
    /// running balance, zero when the pair has no history.
    pub async fn balance<C: ConnectionTrait>(
        &self,
        conn: &C,
        variation_id: Uuid,
        location_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let latest = self
            .latest_entry(conn, variation_id, location_id, false)
            .await?;
        Ok(latest.map(|e| e.balance).unwrap_or(Decimal::ZERO))
    }

    async fn latest_entry<C: ConnectionTrait>(
        &self,
        conn: &C,
        variation_id: Uuid,
        location_id: Uuid,
        for_update: bool,
    ) -> Result<Option<stock_ledger_entry::Model>, ServiceError> {
        let mut query = StockLedgerEntry::find()
            .filter(stock_ledger_entry::Column::VariationId.eq(variation_id))
            .filter(stock_ledger_entry::Column::LocationId.eq(location_id))
            .order_by_desc(stock_ledger_entry::Column::Id);

        // Serialize concurrent appends for the same pair. Sqlite has a single
        // writer and no row-lock syntax, so the hint is Postgres-only.
        if for_update && conn.get_database_backend() == sea_orm::DbBackend::Postgres {
            query = query.lock_exclusive();
        }

        query.one(conn).await.map_err(ServiceError::db_error)
    }

    /// Appends one entry inside the caller's transaction.
    ///
    /// A debit that would drive the balance negative rejects the append, and
    /// with it the caller's whole transition; no partial deduction is ever
    /// committed.
    pub async fn append<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: NewLedgerEntry,
    ) -> Result<stock_ledger_entry::Model, ServiceError> {
        let current = self
            .latest_entry(conn, entry.variation_id, entry.location_id, true)
            .await?
            .map(|e| e.balance)
            .unwrap_or(Decimal::ZERO);
        let new_balance = current + entry.quantity;

        if new_balance < Decimal::ZERO {
            return Err(ServiceError::InsufficientStock(format!(
                "variation {} at location {} holds {}, cannot move {}",
                entry.variation_id,
                entry.location_id,
                current,
                entry.quantity.abs()
            )));
        }

        let model = stock_ledger_entry::ActiveModel {
            business_id: Set(entry.business_id),
            product_id: Set(entry.product_id),
            variation_id: Set(entry.variation_id),
            location_id: Set(entry.location_id),
            entry_type: Set(entry.entry_type),
            quantity: Set(entry.quantity),
            balance: Set(new_balance),
            reference_type: Set(entry.reference_type.to_string()),
            reference_id: Set(entry.reference_id),
            created_by: Set(entry.created_by),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;

        Ok(model)
    }

    /// Ledger page for a variation at a location, newest first.
    pub async fn entries(
        &self,
        business_id: Uuid,
        variation_id: Uuid,
        location_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_ledger_entry::Model>, u64), ServiceError> {
        let db = &*self.db;

        let paginator = StockLedgerEntry::find()
            .filter(stock_ledger_entry::Column::BusinessId.eq(business_id))
            .filter(stock_ledger_entry::Column::VariationId.eq(variation_id))
            .filter(stock_ledger_entry::Column::LocationId.eq(location_id))
            .order_by_desc(stock_ledger_entry::Column::Id)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let entries = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((entries, total))
    }

    /// Manual correction or opening balance, outside any transfer.
    #[instrument(skip(self, actor), fields(actor_id = %actor.actor_id))]
    pub async fn record_adjustment(
        &self,
        actor: ActorContext,
        business_id: Uuid,
        product_id: Uuid,
        variation_id: Uuid,
        location_id: Uuid,
        quantity: Decimal,
    ) -> Result<stock_ledger_entry::Model, ServiceError> {
        if quantity.is_zero() {
            return Err(ServiceError::ValidationError(
                "adjustment quantity must be non-zero".to_string(),
            ));
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let reference_id = Uuid::new_v4();
        let entry = self
            .append(
                &txn,
                NewLedgerEntry {
                    business_id,
                    product_id,
                    variation_id,
                    location_id,
                    entry_type: LedgerEntryType::Adjustment,
                    quantity,
                    reference_type: REF_ADJUSTMENT,
                    reference_id,
                    created_by: actor.actor_id,
                },
            )
            .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            %business_id,
            %variation_id,
            %location_id,
            %quantity,
            new_balance = %entry.balance,
            "stock adjusted"
        );

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::StockAdjusted {
                    business_id,
                    variation_id,
                    location_id,
                    quantity,
                    actor,
                })
                .await
            {
                tracing::warn!(error = %e, "failed to publish stock adjustment event");
            }
        }

        Ok(entry)
    }
}
