use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        serial_movement::{self, SerialMovementType},
        serial_number::{self, Entity as SerialNumber, SerialStatus},
        stock_transfer,
    },
    errors::ServiceError,
    services::stock_ledger::REF_STOCK_TRANSFER,
};

/// Single source of truth for a trackable unit's status and location.
///
/// Nothing else mutates `serial_numbers`; the transfer engine asks this
/// registry, and every status change writes exactly one paired movement row
/// in the same transaction.
#[derive(Clone)]
#[allow(dead_code)]
pub struct SerialRegistryService {
    db: Arc<DbPool>,
}

impl SerialRegistryService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Validates that every requested unit may be attached to a transfer:
    /// it exists in the business, belongs to the item's variation, is
    /// `in_stock`, and currently sits at the source location.
    ///
    /// Run at create time (attachment) and again at send time, because stock
    /// is not locked between the two.
    pub async fn validate_for_transfer<C: ConnectionTrait>(
        &self,
        conn: &C,
        business_id: Uuid,
        source_location_id: Uuid,
        variation_id: Uuid,
        serial_ids: &[Uuid],
    ) -> Result<Vec<serial_number::Model>, ServiceError> {
        let unique: HashSet<Uuid> = serial_ids.iter().copied().collect();
        if unique.len() != serial_ids.len() {
            return Err(ServiceError::ValidationError(
                "duplicate serial numbers in request".to_string(),
            ));
        }

        let serials = SerialNumber::find()
            .filter(serial_number::Column::BusinessId.eq(business_id))
            .filter(serial_number::Column::Id.is_in(serial_ids.to_vec()))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;

        if serials.len() != serial_ids.len() {
            return Err(ServiceError::ValidationError(
                "one or more serial numbers do not exist in this business".to_string(),
            ));
        }

        for serial in &serials {
            if serial.variation_id != variation_id {
                return Err(ServiceError::ValidationError(format!(
                    "serial number {} belongs to a different product variation",
                    serial.code
                )));
            }
            if serial.status != SerialStatus::InStock {
                return Err(ServiceError::ValidationError(format!(
                    "serial number {} is {}, not in stock",
                    serial.code,
                    serial.status.as_str()
                )));
            }
            if serial.current_location_id != Some(source_location_id) {
                return Err(ServiceError::ValidationError(format!(
                    "serial number {} is not at the source location",
                    serial.code
                )));
            }
        }

        Ok(serials)
    }

    /// Dispatch: unit leaves source stock and travels with the transfer.
    pub async fn mark_in_transit<C: ConnectionTrait>(
        &self,
        conn: &C,
        serial: &serial_number::Model,
        transfer: &stock_transfer::Model,
        actor_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.set_status(
            conn,
            serial,
            SerialStatus::InTransit,
            Some(transfer.source_location_id),
            SerialMovementType::TransferOut,
            Some(transfer.source_location_id),
            Some(transfer.destination_location_id),
            transfer,
            actor_id,
        )
        .await
    }

    /// Delivery: unit becomes stock at the destination.
    pub async fn mark_received<C: ConnectionTrait>(
        &self,
        conn: &C,
        serial: &serial_number::Model,
        transfer: &stock_transfer::Model,
        actor_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.set_status(
            conn,
            serial,
            SerialStatus::InStock,
            Some(transfer.destination_location_id),
            SerialMovementType::TransferIn,
            Some(transfer.source_location_id),
            Some(transfer.destination_location_id),
            transfer,
            actor_id,
        )
        .await
    }

    /// Compensation for a cancelled dispatch: unit returns to source stock,
    /// recorded as an adjustment movement.
    pub async fn restore_to_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        serial: &serial_number::Model,
        transfer: &stock_transfer::Model,
        actor_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.set_status(
            conn,
            serial,
            SerialStatus::InStock,
            Some(transfer.source_location_id),
            SerialMovementType::Adjustment,
            Some(transfer.destination_location_id),
            Some(transfer.source_location_id),
            transfer,
            actor_id,
        )
        .await
    }

    /// Loads the units attached to a transfer, in one query.
    pub async fn find_by_ids<C: ConnectionTrait>(
        &self,
        conn: &C,
        business_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<serial_number::Model>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        SerialNumber::find()
            .filter(serial_number::Column::BusinessId.eq(business_id))
            .filter(serial_number::Column::Id.is_in(ids.to_vec()))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)
    }

    #[allow(clippy::too_many_arguments)]
    async fn set_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        serial: &serial_number::Model,
        status: SerialStatus,
        location_id: Option<Uuid>,
        movement_type: SerialMovementType,
        from_location_id: Option<Uuid>,
        to_location_id: Option<Uuid>,
        transfer: &stock_transfer::Model,
        actor_id: Uuid,
    ) -> Result<(), ServiceError> {
        let mut active: serial_number::ActiveModel = serial.clone().into();
        active.status = Set(status);
        active.current_location_id = Set(location_id);
        active.updated_at = Set(Utc::now());
        active.update(conn).await.map_err(ServiceError::db_error)?;

        serial_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(transfer.business_id),
            serial_number_id: Set(serial.id),
            movement_type: Set(movement_type),
            from_location_id: Set(from_location_id),
            to_location_id: Set(to_location_id),
            reference_type: Set(REF_STOCK_TRANSFER.to_string()),
            reference_id: Set(transfer.id),
            moved_by: Set(actor_id),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;

        Ok(())
    }
}
