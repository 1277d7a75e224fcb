use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    access::{perm, AccessScope, AuthenticatedActor},
    clock::BusinessClock,
    db::{with_transaction_timeout, DbPool},
    entities::{
        product::{self, Entity as Product},
        product_variation::{self, Entity as ProductVariation},
        serial_number::{self, SerialStatus},
        sod_settings::{self, Entity as SodSettings},
        stock_ledger_entry::LedgerEntryType,
        stock_transfer::{self, Entity as StockTransfer, TransferStatus},
        stock_transfer_item::{self, Entity as StockTransferItem},
        transfer_item_serial::{self, Entity as TransferItemSerial},
        transfer_step_event::{self, Entity as TransferStepEvent, TransferStep},
        user::{self, Entity as User},
    },
    errors::ServiceError,
    events::{ActorContext, Event, EventSender},
    services::{
        locations::LocationAccessService,
        serial_registry::SerialRegistryService,
        sod_policy::{self, ActorRoles},
        stock_ledger::{NewLedgerEntry, StockLedgerService, REF_STOCK_TRANSFER},
        transfer_number::TransferNumberAllocator,
    },
};

lazy_static! {
    static ref TRANSFERS_CREATED: IntCounter = IntCounter::new(
        "storeflow_transfers_created_total",
        "Total number of stock transfers created"
    )
    .expect("metric can be created");
    static ref TRANSFER_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "storeflow_transfer_transitions_total",
            "Total number of transfer workflow transitions"
        ),
        &["step"]
    )
    .expect("metric can be created");
    static ref TRANSFER_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "storeflow_transfer_failures_total",
            "Total number of rejected transfer operations"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
}

fn validate_positive_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if *quantity > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new("quantity_not_positive"))
    }
}

/// One line of a create request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TransferItemInput {
    pub product_id: Uuid,
    pub variation_id: Uuid,
    #[validate(custom = "validate_positive_quantity")]
    pub quantity: Decimal,
    /// Exact units to move; required for serialized variations. When present,
    /// the count must equal `quantity`.
    #[serde(default)]
    pub serial_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTransferInput {
    pub source_location_id: Uuid,
    pub destination_location_id: Uuid,
    /// Defaults to today's business date.
    pub transfer_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "a transfer needs at least one item"))]
    pub items: Vec<TransferItemInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTransferInput {
    pub transfer_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceiptInput {
    pub item_id: Uuid,
    pub received_quantity: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct VerifyTransferInput {
    #[validate(length(min = 1, message = "verification needs at least one receipt"))]
    pub receipts: Vec<ReceiptInput>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TransferFilters {
    pub status: Option<TransferStatus>,
    pub source_location_id: Option<Uuid>,
    pub destination_location_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SerialNumberSummary {
    pub id: Uuid,
    pub code: String,
    pub status: SerialStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub variation_id: Uuid,
    pub variation_name: String,
    pub variation_sku: String,
    pub quantity: Decimal,
    pub received_quantity: Decimal,
    pub serial_numbers: Vec<SerialNumberSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkflowStepDetail {
    pub step: TransferStep,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub occurred_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferDetail {
    pub id: Uuid,
    pub transfer_number: String,
    pub status: TransferStatus,
    pub stock_deducted: bool,
    pub source_location_id: Uuid,
    pub source_location_name: String,
    pub destination_location_id: Uuid,
    pub destination_location_name: String,
    pub transfer_date: NaiveDate,
    pub notes: Option<String>,
    pub cancelled_at: Option<chrono::DateTime<Utc>>,
    pub items: Vec<TransferItemDetail>,
    pub workflow: Vec<WorkflowStepDetail>,
    pub sod_settings: sod_settings::Model,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferSummary {
    pub id: Uuid,
    pub transfer_number: String,
    pub status: TransferStatus,
    pub source_location_id: Uuid,
    pub source_location_name: Option<String>,
    pub destination_location_id: Uuid,
    pub destination_location_name: Option<String>,
    pub transfer_date: NaiveDate,
    pub created_at: chrono::DateTime<Utc>,
}

/// Owns the stock transfer aggregate and its workflow.
///
/// Every mutating operation checks permissions, location access, and the SOD
/// policy before writing, and performs its stock side effects inside one
/// transaction with the status change. Events publish after commit.
#[derive(Clone)]
pub struct TransferService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
    ledger: StockLedgerService,
    serials: SerialRegistryService,
    locations: LocationAccessService,
    numbers: TransferNumberAllocator,
    clock: BusinessClock,
    txn_timeout: Duration,
}

impl TransferService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<EventSender>,
        ledger: StockLedgerService,
        serials: SerialRegistryService,
        locations: LocationAccessService,
        clock: BusinessClock,
        txn_timeout: Duration,
    ) -> Self {
        Self {
            db,
            event_sender,
            ledger,
            serials,
            locations,
            numbers: TransferNumberAllocator::new(),
            clock,
            txn_timeout,
        }
    }

    // ---------------------------------------------------------------- create

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn create_transfer(
        &self,
        actor: &AuthenticatedActor,
        input: CreateTransferInput,
    ) -> Result<TransferDetail, ServiceError> {
        actor.require(perm::TRANSFERS_CREATE)?;
        input.validate().map_err(|e| {
            TRANSFER_FAILURES.with_label_values(&["validation"]).inc();
            ServiceError::ValidationError(e.to_string())
        })?;
        for item in &input.items {
            item.validate().map_err(|e| {
                TRANSFER_FAILURES.with_label_values(&["validation"]).inc();
                ServiceError::ValidationError(e.to_string())
            })?;
        }

        if input.source_location_id == input.destination_location_id {
            TRANSFER_FAILURES.with_label_values(&["validation"]).inc();
            return Err(ServiceError::ValidationError(
                "source and destination locations must differ".to_string(),
            ));
        }

        // Both locations must resolve inside the caller's business.
        self.locations
            .resolve(actor.business_id, input.source_location_id)
            .await?;
        self.locations
            .resolve(actor.business_id, input.destination_location_id)
            .await?;

        self.locations
            .require_source_access(actor, input.source_location_id)
            .await?;

        let variations = self.load_variations_checked(actor.business_id, &input.items).await?;

        for item in &input.items {
            let variation = &variations[&item.variation_id];
            if item.serial_ids.is_empty() {
                if variation.is_serialized {
                    TRANSFER_FAILURES.with_label_values(&["validation"]).inc();
                    return Err(ServiceError::ValidationError(format!(
                        "variation {} is serialized; serial numbers are required",
                        variation.sku
                    )));
                }
            } else if Decimal::from(item.serial_ids.len()) != item.quantity {
                TRANSFER_FAILURES.with_label_values(&["validation"]).inc();
                return Err(ServiceError::ValidationError(format!(
                    "variation {}: {} serial numbers attached for quantity {}",
                    variation.sku,
                    item.serial_ids.len(),
                    item.quantity
                )));
            }
        }

        let transfer_date = input
            .transfer_date
            .unwrap_or_else(|| self.clock.business_date());
        let period = BusinessClock::period_for(transfer_date);

        let db = self.db.clone();
        let transfer_id = Uuid::new_v4();

        with_transaction_timeout(self.txn_timeout, "create_transfer", async {
            let txn = db.begin().await.map_err(ServiceError::db_error)?;

            // Attachment-time validation only; statuses stay untouched until
            // the send step actually reserves the units.
            for item in &input.items {
                if !item.serial_ids.is_empty() {
                    self.serials
                        .validate_for_transfer(
                            &txn,
                            actor.business_id,
                            input.source_location_id,
                            item.variation_id,
                            &item.serial_ids,
                        )
                        .await?;
                }
            }

            let transfer_number = self
                .numbers
                .next(&txn, actor.business_id, &period)
                .await?;

            let now = Utc::now();
            stock_transfer::ActiveModel {
                id: Set(transfer_id),
                business_id: Set(actor.business_id),
                transfer_number: Set(transfer_number),
                source_location_id: Set(input.source_location_id),
                destination_location_id: Set(input.destination_location_id),
                transfer_date: Set(transfer_date),
                notes: Set(input.notes.clone()),
                status: Set(TransferStatus::Draft),
                cancelled_at: Set(None),
                created_by: Set(actor.id),
                created_at: Set(now),
                updated_at: Set(now),
                version: Set(1),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;

            for item in &input.items {
                let item_id = Uuid::new_v4();
                stock_transfer_item::ActiveModel {
                    id: Set(item_id),
                    transfer_id: Set(transfer_id),
                    product_id: Set(item.product_id),
                    variation_id: Set(item.variation_id),
                    quantity: Set(item.quantity),
                    received_quantity: Set(Decimal::ZERO),
                }
                .insert(&txn)
                .await
                .map_err(ServiceError::db_error)?;

                for serial_id in &item.serial_ids {
                    transfer_item_serial::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        transfer_id: Set(transfer_id),
                        item_id: Set(item_id),
                        serial_number_id: Set(*serial_id),
                    }
                    .insert(&txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                }
            }

            self.record_step(&txn, transfer_id, TransferStep::Create, actor.id)
                .await?;

            txn.commit().await.map_err(ServiceError::db_error)
        })
        .await?;

        TRANSFERS_CREATED.inc();

        let detail = self.load_detail(actor.business_id, transfer_id).await?;
        info!(
            transfer_number = %detail.transfer_number,
            source = %detail.source_location_id,
            destination = %detail.destination_location_id,
            items = detail.items.len(),
            "stock transfer created"
        );

        self.publish(Event::TransferCreated {
            transfer_id,
            business_id: actor.business_id,
            transfer_number: detail.transfer_number.clone(),
            source_location_id: detail.source_location_id,
            destination_location_id: detail.destination_location_id,
            actor: ActorContext::from_actor(actor),
        })
        .await;

        Ok(detail)
    }

    // ----------------------------------------------------------- transitions

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn check_transfer(
        &self,
        actor: &AuthenticatedActor,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        actor.require(perm::TRANSFERS_CHECK)?;
        let transfer = self.load_header(actor.business_id, transfer_id).await?;
        self.require_status(&transfer, TransferStatus::Draft, TransferStep::Check)?;
        self.locations
            .require_source_access(actor, transfer.source_location_id)
            .await?;
        self.enforce_sod(actor, &transfer, TransferStep::Check).await?;

        let db = self.db.clone();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;
        self.transition_header(&txn, &transfer, TransferStatus::Checked, None)
            .await?;
        self.record_step(&txn, transfer.id, TransferStep::Check, actor.id)
            .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        TRANSFER_TRANSITIONS.with_label_values(&["check"]).inc();
        self.publish(Event::TransferChecked {
            transfer_id: transfer.id,
            business_id: transfer.business_id,
            transfer_number: transfer.transfer_number.clone(),
            actor: ActorContext::from_actor(actor),
        })
        .await;

        self.load_detail(actor.business_id, transfer_id).await
    }

    /// The only step that takes stock out of the source location.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn send_transfer(
        &self,
        actor: &AuthenticatedActor,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        actor.require(perm::TRANSFERS_SEND)?;
        let transfer = self.load_header(actor.business_id, transfer_id).await?;
        self.require_status(&transfer, TransferStatus::Checked, TransferStep::Send)?;
        self.locations
            .require_source_access(actor, transfer.source_location_id)
            .await?;
        self.enforce_sod(actor, &transfer, TransferStep::Send).await?;

        let db = self.db.clone();
        with_transaction_timeout(self.txn_timeout, "send_transfer", async {
            let txn = db.begin().await.map_err(ServiceError::db_error)?;

            let items = self.load_items(&txn, transfer.id).await?;
            let serial_links = self.load_serial_links(&txn, transfer.id).await?;

            for item in &items {
                // Stock was not locked at create time; the balance check here
                // decides, and a shortfall rejects the whole dispatch.
                self.ledger
                    .append(
                        &txn,
                        NewLedgerEntry {
                            business_id: transfer.business_id,
                            product_id: item.product_id,
                            variation_id: item.variation_id,
                            location_id: transfer.source_location_id,
                            entry_type: LedgerEntryType::TransferOut,
                            quantity: -item.quantity,
                            reference_type: REF_STOCK_TRANSFER,
                            reference_id: transfer.id,
                            created_by: actor.id,
                        },
                    )
                    .await
                    .map_err(|e| {
                        if matches!(e, ServiceError::InsufficientStock(_)) {
                            TRANSFER_FAILURES
                                .with_label_values(&["insufficient_stock"])
                                .inc();
                        }
                        e
                    })?;

                let item_serial_ids: Vec<Uuid> = serial_links
                    .iter()
                    .filter(|link| link.item_id == item.id)
                    .map(|link| link.serial_number_id)
                    .collect();

                if !item_serial_ids.is_empty() {
                    // Units may have been sold or moved since attachment;
                    // re-validate before reserving them.
                    let serials = self
                        .serials
                        .validate_for_transfer(
                            &txn,
                            transfer.business_id,
                            transfer.source_location_id,
                            item.variation_id,
                            &item_serial_ids,
                        )
                        .await
                        .map_err(|e| match e {
                            ServiceError::ValidationError(msg) => {
                                ServiceError::StateConflict(msg)
                            }
                            other => other,
                        })?;

                    for serial in &serials {
                        self.serials
                            .mark_in_transit(&txn, serial, &transfer, actor.id)
                            .await?;
                    }
                }
            }

            self.transition_header(&txn, &transfer, TransferStatus::InTransit, None)
                .await?;
            self.record_step(&txn, transfer.id, TransferStep::Send, actor.id)
                .await?;

            txn.commit().await.map_err(ServiceError::db_error)
        })
        .await?;

        TRANSFER_TRANSITIONS.with_label_values(&["send"]).inc();
        info!(
            transfer_number = %transfer.transfer_number,
            "stock transfer dispatched, source stock deducted"
        );
        self.publish(Event::TransferDispatched {
            transfer_id: transfer.id,
            business_id: transfer.business_id,
            transfer_number: transfer.transfer_number.clone(),
            actor: ActorContext::from_actor(actor),
        })
        .await;

        self.load_detail(actor.business_id, transfer_id).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn mark_arrived(
        &self,
        actor: &AuthenticatedActor,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        actor.require(perm::TRANSFERS_RECEIVE)?;
        let transfer = self.load_header(actor.business_id, transfer_id).await?;
        self.require_status(&transfer, TransferStatus::InTransit, TransferStep::Arrive)?;
        self.require_destination_access(actor, &transfer).await?;
        self.enforce_sod(actor, &transfer, TransferStep::Arrive).await?;

        let db = self.db.clone();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;
        self.transition_header(&txn, &transfer, TransferStatus::Arrived, None)
            .await?;
        self.record_step(&txn, transfer.id, TransferStep::Arrive, actor.id)
            .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        TRANSFER_TRANSITIONS.with_label_values(&["arrive"]).inc();
        self.publish(Event::TransferArrived {
            transfer_id: transfer.id,
            business_id: transfer.business_id,
            transfer_number: transfer.transfer_number.clone(),
            actor: ActorContext::from_actor(actor),
        })
        .await;

        self.load_detail(actor.business_id, transfer_id).await
    }

    /// Records counted quantities. Receiving less than requested is allowed
    /// for bulk lines (shrinkage is investigated separately); serialized
    /// lines move unit-by-unit and must arrive complete.
    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn verify_transfer(
        &self,
        actor: &AuthenticatedActor,
        transfer_id: Uuid,
        input: VerifyTransferInput,
    ) -> Result<TransferDetail, ServiceError> {
        actor.require(perm::TRANSFERS_RECEIVE)?;
        input.validate().map_err(ServiceError::from)?;

        let transfer = self.load_header(actor.business_id, transfer_id).await?;
        self.require_status(&transfer, TransferStatus::Arrived, TransferStep::Verify)?;
        self.require_destination_access(actor, &transfer).await?;
        self.enforce_sod(actor, &transfer, TransferStep::Verify).await?;

        let db = self.db.clone();
        let txn = db.begin().await.map_err(ServiceError::db_error)?;

        let items = self.load_items(&txn, transfer.id).await?;
        let serial_links = self.load_serial_links(&txn, transfer.id).await?;

        let mut receipts: HashMap<Uuid, Decimal> = HashMap::new();
        for receipt in &input.receipts {
            if receipts.insert(receipt.item_id, receipt.received_quantity).is_some() {
                return Err(ServiceError::ValidationError(format!(
                    "item {} appears more than once in the receipts",
                    receipt.item_id
                )));
            }
        }

        for item in &items {
            let received = receipts.remove(&item.id).ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "missing receipt for item {}",
                    item.id
                ))
            })?;

            if received < Decimal::ZERO || received > item.quantity {
                return Err(ServiceError::ValidationError(format!(
                    "received quantity {} for item {} must be between 0 and {}",
                    received, item.id, item.quantity
                )));
            }

            let has_serials = serial_links.iter().any(|link| link.item_id == item.id);
            if has_serials && received != item.quantity {
                return Err(ServiceError::ValidationError(format!(
                    "serialized item {} must be received in full ({} of {})",
                    item.id, received, item.quantity
                )));
            }

            let mut active: stock_transfer_item::ActiveModel = item.clone().into();
            active.received_quantity = Set(received);
            active.update(&txn).await.map_err(ServiceError::db_error)?;
        }

        if let Some(unknown) = receipts.keys().next() {
            return Err(ServiceError::ValidationError(format!(
                "receipt references unknown item {}",
                unknown
            )));
        }

        self.transition_header(&txn, &transfer, TransferStatus::Verified, None)
            .await?;
        self.record_step(&txn, transfer.id, TransferStep::Verify, actor.id)
            .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        TRANSFER_TRANSITIONS.with_label_values(&["verify"]).inc();
        self.publish(Event::TransferVerified {
            transfer_id: transfer.id,
            business_id: transfer.business_id,
            transfer_number: transfer.transfer_number.clone(),
            actor: ActorContext::from_actor(actor),
        })
        .await;

        self.load_detail(actor.business_id, transfer_id).await
    }

    /// The only step that credits the destination location.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn complete_transfer(
        &self,
        actor: &AuthenticatedActor,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        actor.require(perm::TRANSFERS_COMPLETE)?;
        let transfer = self.load_header(actor.business_id, transfer_id).await?;
        self.require_status(&transfer, TransferStatus::Verified, TransferStep::Complete)?;
        self.require_destination_access(actor, &transfer).await?;
        self.enforce_sod(actor, &transfer, TransferStep::Complete)
            .await?;

        let db = self.db.clone();
        with_transaction_timeout(self.txn_timeout, "complete_transfer", async {
            let txn = db.begin().await.map_err(ServiceError::db_error)?;

            let items = self.load_items(&txn, transfer.id).await?;
            let serial_links = self.load_serial_links(&txn, transfer.id).await?;
            let serial_ids: Vec<Uuid> =
                serial_links.iter().map(|link| link.serial_number_id).collect();
            let serials = self
                .serials
                .find_by_ids(&txn, transfer.business_id, &serial_ids)
                .await?;

            for item in &items {
                if item.received_quantity > Decimal::ZERO {
                    self.ledger
                        .append(
                            &txn,
                            NewLedgerEntry {
                                business_id: transfer.business_id,
                                product_id: item.product_id,
                                variation_id: item.variation_id,
                                location_id: transfer.destination_location_id,
                                entry_type: LedgerEntryType::TransferIn,
                                quantity: item.received_quantity,
                                reference_type: REF_STOCK_TRANSFER,
                                reference_id: transfer.id,
                                created_by: actor.id,
                            },
                        )
                        .await?;
                }
            }

            for serial in &serials {
                self.serials
                    .mark_received(&txn, serial, &transfer, actor.id)
                    .await?;
            }

            self.transition_header(&txn, &transfer, TransferStatus::Completed, None)
                .await?;
            self.record_step(&txn, transfer.id, TransferStep::Complete, actor.id)
                .await?;

            txn.commit().await.map_err(ServiceError::db_error)
        })
        .await?;

        TRANSFER_TRANSITIONS.with_label_values(&["complete"]).inc();
        info!(
            transfer_number = %transfer.transfer_number,
            "stock transfer completed, destination stock credited"
        );
        self.publish(Event::TransferCompleted {
            transfer_id: transfer.id,
            business_id: transfer.business_id,
            transfer_number: transfer.transfer_number.clone(),
            actor: ActorContext::from_actor(actor),
        })
        .await;

        self.load_detail(actor.business_id, transfer_id).await
    }

    /// Aborts a transfer. Once dispatched, cancellation compensates: every
    /// deducted quantity is credited back to the source and every travelling
    /// unit returns to stock there, all in the same transaction as the
    /// status change.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn cancel_transfer(
        &self,
        actor: &AuthenticatedActor,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        actor.require(perm::TRANSFERS_CANCEL)?;
        let transfer = self.load_header(actor.business_id, transfer_id).await?;

        if transfer.status == TransferStatus::Cancelled {
            TRANSFER_FAILURES.with_label_values(&["state_conflict"]).inc();
            return Err(ServiceError::StateConflict(format!(
                "transfer {} is already cancelled",
                transfer.transfer_number
            )));
        }
        if !transfer.status.can_cancel() {
            TRANSFER_FAILURES.with_label_values(&["state_conflict"]).inc();
            return Err(ServiceError::StateConflict(format!(
                "transfer {} cannot be cancelled from status '{}'",
                transfer.transfer_number,
                transfer.status.as_str()
            )));
        }

        self.locations
            .require_source_access(actor, transfer.source_location_id)
            .await?;
        self.enforce_sod(actor, &transfer, TransferStep::Cancel).await?;

        let restore_stock = transfer.status.stock_deducted();
        let db = self.db.clone();

        with_transaction_timeout(self.txn_timeout, "cancel_transfer", async {
            let txn = db.begin().await.map_err(ServiceError::db_error)?;

            if restore_stock {
                let items = self.load_items(&txn, transfer.id).await?;
                for item in &items {
                    self.ledger
                        .append(
                            &txn,
                            NewLedgerEntry {
                                business_id: transfer.business_id,
                                product_id: item.product_id,
                                variation_id: item.variation_id,
                                location_id: transfer.source_location_id,
                                entry_type: LedgerEntryType::Adjustment,
                                quantity: item.quantity,
                                reference_type: REF_STOCK_TRANSFER,
                                reference_id: transfer.id,
                                created_by: actor.id,
                            },
                        )
                        .await?;
                }

                let serial_links = self.load_serial_links(&txn, transfer.id).await?;
                let serial_ids: Vec<Uuid> =
                    serial_links.iter().map(|link| link.serial_number_id).collect();
                let serials = self
                    .serials
                    .find_by_ids(&txn, transfer.business_id, &serial_ids)
                    .await?;
                for serial in &serials {
                    self.serials
                        .restore_to_stock(&txn, serial, &transfer, actor.id)
                        .await?;
                }
            }

            self.transition_header(&txn, &transfer, TransferStatus::Cancelled, Some(Utc::now()))
                .await?;
            self.record_step(&txn, transfer.id, TransferStep::Cancel, actor.id)
                .await?;

            txn.commit().await.map_err(ServiceError::db_error)
        })
        .await?;

        TRANSFER_TRANSITIONS.with_label_values(&["cancel"]).inc();
        info!(
            transfer_number = %transfer.transfer_number,
            restored = restore_stock,
            "stock transfer cancelled"
        );
        self.publish(Event::TransferCancelled {
            transfer_id: transfer.id,
            business_id: transfer.business_id,
            transfer_number: transfer.transfer_number.clone(),
            stock_restored: restore_stock,
            actor: ActorContext::from_actor(actor),
        })
        .await;

        self.load_detail(actor.business_id, transfer_id).await
    }

    /// Edits the header while it is still a draft; items and locations are
    /// immutable once created.
    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn update_transfer(
        &self,
        actor: &AuthenticatedActor,
        transfer_id: Uuid,
        input: UpdateTransferInput,
    ) -> Result<TransferDetail, ServiceError> {
        actor.require(perm::TRANSFERS_UPDATE)?;
        input.validate().map_err(ServiceError::from)?;

        let transfer = self.load_header(actor.business_id, transfer_id).await?;
        if transfer.status != TransferStatus::Draft {
            TRANSFER_FAILURES.with_label_values(&["validation"]).inc();
            return Err(ServiceError::ValidationError(format!(
                "transfer {} is '{}' and can no longer be edited",
                transfer.transfer_number,
                transfer.status.as_str()
            )));
        }
        self.locations
            .require_source_access(actor, transfer.source_location_id)
            .await?;

        let db = &*self.db;
        let guarded = StockTransfer::update_many()
            .set(stock_transfer::ActiveModel {
                transfer_date: Set(input.transfer_date.unwrap_or(transfer.transfer_date)),
                notes: Set(input.notes.clone().or_else(|| transfer.notes.clone())),
                updated_at: Set(Utc::now()),
                version: Set(transfer.version + 1),
                ..Default::default()
            })
            .filter(stock_transfer::Column::Id.eq(transfer.id))
            .filter(stock_transfer::Column::Version.eq(transfer.version))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;

        if guarded.rows_affected == 0 {
            return Err(ServiceError::StateConflict(format!(
                "transfer {} was modified concurrently",
                transfer.transfer_number
            )));
        }

        self.publish(Event::TransferUpdated {
            transfer_id: transfer.id,
            business_id: transfer.business_id,
            transfer_number: transfer.transfer_number.clone(),
            actor: ActorContext::from_actor(actor),
        })
        .await;

        self.load_detail(actor.business_id, transfer_id).await
    }

    // ----------------------------------------------------------------- reads

    /// Full document view. Visibility requires an explicit assignment to one
    /// of the two endpoints; deliberately, the all-locations capability does
    /// not bypass this.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn get_transfer(
        &self,
        actor: &AuthenticatedActor,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        actor.require(perm::TRANSFERS_READ)?;
        let transfer = self.load_header(actor.business_id, transfer_id).await?;

        let assigned = self.locations.assigned_location_ids(actor).await?;
        if !assigned.contains(&transfer.source_location_id)
            && !assigned.contains(&transfer.destination_location_id)
        {
            return Err(ServiceError::Forbidden(format!(
                "user {} is not assigned to either endpoint of transfer {}",
                actor.username, transfer.transfer_number
            )));
        }

        self.load_detail(actor.business_id, transfer_id).await
    }

    /// Paged listing. Non-privileged callers only see transfers touching an
    /// assigned location; an empty assignment set yields an empty page.
    #[instrument(skip(self, actor, filters), fields(actor_id = %actor.id))]
    pub async fn list_transfers(
        &self,
        actor: &AuthenticatedActor,
        filters: TransferFilters,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<TransferSummary>, u64), ServiceError> {
        actor.require(perm::TRANSFERS_READ)?;

        let scope = self.locations.accessible_location_ids(actor).await?;
        if scope.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let mut query = StockTransfer::find()
            .filter(stock_transfer::Column::BusinessId.eq(actor.business_id));

        if let AccessScope::Locations(ids) = &scope {
            let ids: Vec<Uuid> = ids.iter().copied().collect();
            query = query.filter(
                Condition::any()
                    .add(stock_transfer::Column::SourceLocationId.is_in(ids.clone()))
                    .add(stock_transfer::Column::DestinationLocationId.is_in(ids)),
            );
        }

        if let Some(status) = filters.status {
            query = query.filter(stock_transfer::Column::Status.eq(status));
        }
        if let Some(source) = filters.source_location_id {
            query = query.filter(stock_transfer::Column::SourceLocationId.eq(source));
        }
        if let Some(destination) = filters.destination_location_id {
            query = query.filter(stock_transfer::Column::DestinationLocationId.eq(destination));
        }
        if let Some(from) = filters.date_from {
            query = query.filter(stock_transfer::Column::TransferDate.gte(from));
        }
        if let Some(to) = filters.date_to {
            query = query.filter(stock_transfer::Column::TransferDate.lte(to));
        }

        let db = &*self.db;
        let paginator = query
            .order_by_desc(stock_transfer::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        let location_ids: Vec<Uuid> = rows
            .iter()
            .flat_map(|t| [t.source_location_id, t.destination_location_id])
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let location_names = self
            .locations
            .names_by_id(actor.business_id, &location_ids)
            .await?;

        let summaries = rows
            .into_iter()
            .map(|t| TransferSummary {
                id: t.id,
                transfer_number: t.transfer_number,
                status: t.status,
                source_location_name: location_names.get(&t.source_location_id).cloned(),
                source_location_id: t.source_location_id,
                destination_location_name: location_names
                    .get(&t.destination_location_id)
                    .cloned(),
                destination_location_id: t.destination_location_id,
                transfer_date: t.transfer_date,
                created_at: t.created_at,
            })
            .collect();

        Ok((summaries, total))
    }

    /// Effective SOD settings for a business (stored row or defaults).
    pub async fn sod_settings_for(
        &self,
        business_id: Uuid,
    ) -> Result<sod_settings::Model, ServiceError> {
        let db = &*self.db;
        Ok(SodSettings::find_by_id(business_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .unwrap_or_else(|| sod_settings::Model::defaults(business_id)))
    }

    // --------------------------------------------------------------- helpers

    async fn load_header(
        &self,
        business_id: Uuid,
        transfer_id: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        let db = &*self.db;
        StockTransfer::find_by_id(transfer_id)
            .filter(stock_transfer::Column::BusinessId.eq(business_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transfer {} not found", transfer_id))
            })
    }

    fn require_status(
        &self,
        transfer: &stock_transfer::Model,
        expected: TransferStatus,
        step: TransferStep,
    ) -> Result<(), ServiceError> {
        if transfer.status != expected {
            TRANSFER_FAILURES.with_label_values(&["state_conflict"]).inc();
            return Err(ServiceError::StateConflict(format!(
                "cannot {} transfer {} from status '{}'",
                step,
                transfer.transfer_number,
                transfer.status.as_str()
            )));
        }
        Ok(())
    }

    /// Receiving-side steps require visibility of the destination; the
    /// all-locations capability suffices here, unlike for reads.
    async fn require_destination_access(
        &self,
        actor: &AuthenticatedActor,
        transfer: &stock_transfer::Model,
    ) -> Result<(), ServiceError> {
        let scope = self.locations.accessible_location_ids(actor).await?;
        if scope.contains(transfer.destination_location_id) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "user {} is not assigned to the destination of transfer {}",
                actor.username, transfer.transfer_number
            )))
        }
    }

    async fn enforce_sod(
        &self,
        actor: &AuthenticatedActor,
        transfer: &stock_transfer::Model,
        step: TransferStep,
    ) -> Result<(), ServiceError> {
        let settings = self.sod_settings_for(transfer.business_id).await?;
        let db = &*self.db;
        let events = TransferStepEvent::find()
            .filter(transfer_step_event::Column::TransferId.eq(transfer.id))
            .order_by_asc(transfer_step_event::Column::OccurredAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let roles = ActorRoles::from_events(actor.id, &events);
        sod_policy::may_perform(step, &roles, &settings).map_err(|violation| {
            TRANSFER_FAILURES.with_label_values(&["sod"]).inc();
            ServiceError::Forbidden(violation.to_string())
        })
    }

    async fn transition_header<C: ConnectionTrait>(
        &self,
        conn: &C,
        transfer: &stock_transfer::Model,
        next: TransferStatus,
        cancelled_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<(), ServiceError> {
        if next != TransferStatus::Cancelled && !transfer.status.can_transition_to(next) {
            return Err(ServiceError::StateConflict(format!(
                "transfer {} cannot move from '{}' to '{}'",
                transfer.transfer_number,
                transfer.status.as_str(),
                next.as_str()
            )));
        }

        // Version-guarded write: two racing operators get one winner and one
        // state-conflict instead of a double transition.
        let guarded = StockTransfer::update_many()
            .set(stock_transfer::ActiveModel {
                status: Set(next),
                cancelled_at: Set(cancelled_at),
                updated_at: Set(Utc::now()),
                version: Set(transfer.version + 1),
                ..Default::default()
            })
            .filter(stock_transfer::Column::Id.eq(transfer.id))
            .filter(stock_transfer::Column::Version.eq(transfer.version))
            .exec(conn)
            .await
            .map_err(ServiceError::db_error)?;

        if guarded.rows_affected == 0 {
            TRANSFER_FAILURES.with_label_values(&["state_conflict"]).inc();
            return Err(ServiceError::StateConflict(format!(
                "transfer {} was modified concurrently",
                transfer.transfer_number
            )));
        }

        Ok(())
    }

    async fn record_step<C: ConnectionTrait>(
        &self,
        conn: &C,
        transfer_id: Uuid,
        step: TransferStep,
        actor_id: Uuid,
    ) -> Result<(), ServiceError> {
        transfer_step_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            transfer_id: Set(transfer_id),
            step: Set(step),
            actor_id: Set(actor_id),
            occurred_at: Set(Utc::now()),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
        Ok(())
    }

    async fn load_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        transfer_id: Uuid,
    ) -> Result<Vec<stock_transfer_item::Model>, ServiceError> {
        StockTransferItem::find()
            .filter(stock_transfer_item::Column::TransferId.eq(transfer_id))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    async fn load_serial_links<C: ConnectionTrait>(
        &self,
        conn: &C,
        transfer_id: Uuid,
    ) -> Result<Vec<transfer_item_serial::Model>, ServiceError> {
        TransferItemSerial::find()
            .filter(transfer_item_serial::Column::TransferId.eq(transfer_id))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Validates the catalog references of a create request and returns the
    /// variations keyed by id, in two set-based queries.
    async fn load_variations_checked(
        &self,
        business_id: Uuid,
        items: &[TransferItemInput],
    ) -> Result<HashMap<Uuid, product_variation::Model>, ServiceError> {
        let db = &*self.db;

        let product_ids: Vec<Uuid> = items
            .iter()
            .map(|i| i.product_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let products: HashMap<Uuid, product::Model> = Product::find()
            .filter(product::Column::BusinessId.eq(business_id))
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let variation_ids: Vec<Uuid> = items
            .iter()
            .map(|i| i.variation_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let variations: HashMap<Uuid, product_variation::Model> = ProductVariation::find()
            .filter(product_variation::Column::Id.is_in(variation_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        for item in items {
            let product = products.get(&item.product_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", item.product_id))
            })?;
            let variation = variations.get(&item.variation_id).ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Product variation {} not found",
                    item.variation_id
                ))
            })?;
            if variation.product_id != product.id {
                return Err(ServiceError::ValidationError(format!(
                    "variation {} does not belong to product {}",
                    variation.sku, product.sku
                )));
            }
        }

        Ok(variations)
    }

    /// Assembles the full document view with set-based lookups: one query per
    /// entity kind regardless of how many rows the transfer has.
    async fn load_detail(
        &self,
        business_id: Uuid,
        transfer_id: Uuid,
    ) -> Result<TransferDetail, ServiceError> {
        let db = &*self.db;
        let transfer = self.load_header(business_id, transfer_id).await?;

        let items = self.load_items(db, transfer.id).await?;
        let serial_links = self.load_serial_links(db, transfer.id).await?;
        let events = TransferStepEvent::find()
            .filter(transfer_step_event::Column::TransferId.eq(transfer.id))
            .order_by_asc(transfer_step_event::Column::OccurredAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let product_ids: Vec<Uuid> = items
            .iter()
            .map(|i| i.product_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let products: HashMap<Uuid, product::Model> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let variation_ids: Vec<Uuid> = items
            .iter()
            .map(|i| i.variation_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let variations: HashMap<Uuid, product_variation::Model> = ProductVariation::find()
            .filter(product_variation::Column::Id.is_in(variation_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let serial_ids: Vec<Uuid> = serial_links.iter().map(|l| l.serial_number_id).collect();
        let serials: HashMap<Uuid, serial_number::Model> = self
            .serials
            .find_by_ids(db, business_id, &serial_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let actor_ids: Vec<Uuid> = events
            .iter()
            .map(|e| e.actor_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let users: HashMap<Uuid, user::Model> = User::find()
            .filter(user::Column::Id.is_in(actor_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let location_names = self
            .locations
            .names_by_id(
                business_id,
                &[transfer.source_location_id, transfer.destination_location_id],
            )
            .await?;

        let item_details = items
            .into_iter()
            .map(|item| {
                let serial_numbers = serial_links
                    .iter()
                    .filter(|link| link.item_id == item.id)
                    .filter_map(|link| serials.get(&link.serial_number_id))
                    .map(|s| SerialNumberSummary {
                        id: s.id,
                        code: s.code.clone(),
                        status: s.status,
                    })
                    .collect();

                TransferItemDetail {
                    id: item.id,
                    product_name: products
                        .get(&item.product_id)
                        .map(|p| p.name.clone())
                        .unwrap_or_default(),
                    product_id: item.product_id,
                    variation_name: variations
                        .get(&item.variation_id)
                        .map(|v| v.name.clone())
                        .unwrap_or_default(),
                    variation_sku: variations
                        .get(&item.variation_id)
                        .map(|v| v.sku.clone())
                        .unwrap_or_default(),
                    variation_id: item.variation_id,
                    quantity: item.quantity,
                    received_quantity: item.received_quantity,
                    serial_numbers,
                }
            })
            .collect();

        let workflow = events
            .into_iter()
            .map(|event| WorkflowStepDetail {
                step: event.step,
                actor_name: users
                    .get(&event.actor_id)
                    .map(|u| u.display_name.clone())
                    .unwrap_or_default(),
                actor_id: event.actor_id,
                occurred_at: event.occurred_at,
            })
            .collect();

        let sod = self.sod_settings_for(business_id).await?;

        Ok(TransferDetail {
            id: transfer.id,
            transfer_number: transfer.transfer_number,
            stock_deducted: transfer.status.stock_deducted(),
            status: transfer.status,
            source_location_name: location_names
                .get(&transfer.source_location_id)
                .cloned()
                .unwrap_or_default(),
            source_location_id: transfer.source_location_id,
            destination_location_name: location_names
                .get(&transfer.destination_location_id)
                .cloned()
                .unwrap_or_default(),
            destination_location_id: transfer.destination_location_id,
            transfer_date: transfer.transfer_date,
            notes: transfer.notes,
            cancelled_at: transfer.cancelled_at,
            items: item_details,
            workflow,
            sod_settings: sod,
            created_at: transfer.created_at,
            updated_at: transfer.updated_at,
        })
    }

    /// Post-commit event publication; a full channel or stopped consumer is
    /// logged and otherwise ignored.
    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                tracing::warn!(error = %e, "failed to publish transfer event");
            }
        }
    }
}
