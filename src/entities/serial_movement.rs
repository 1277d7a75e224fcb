use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SerialMovementType {
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "sale")]
    Sale,
    #[sea_orm(string_value = "receipt")]
    Receipt,
}

/// Append-only movement log for serialized units. Rows are never updated or
/// deleted; corrections append an `adjustment` entry. Every serial status
/// change writes exactly one row here in the same transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "serial_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub business_id: Uuid,
    pub serial_number_id: Uuid,
    pub movement_type: SerialMovementType,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    /// The causing business document ("stock_transfer", "sale", ...).
    pub reference_type: String,
    pub reference_id: Uuid,
    pub moved_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::serial_number::Entity",
        from = "Column::SerialNumberId",
        to = "super::serial_number::Column::Id"
    )]
    SerialNumber,
}

impl Related<super::serial_number::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SerialNumber.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
