use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Current state of an individually tracked unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SerialStatus {
    #[sea_orm(string_value = "in_stock")]
    InStock,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "sold")]
    Sold,
    #[sea_orm(string_value = "retired")]
    Retired,
}

impl SerialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SerialStatus::InStock => "in_stock",
            SerialStatus::InTransit => "in_transit",
            SerialStatus::Sold => "sold",
            SerialStatus::Retired => "retired",
        }
    }
}

/// One trackable unit. The serial registry service is the sole mutator of
/// `status` and `current_location_id`; everything else requests changes
/// through it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "serial_numbers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub business_id: Uuid,
    pub product_id: Uuid,
    pub variation_id: Uuid,
    /// Unique per business.
    pub code: String,
    pub status: SerialStatus,
    pub current_location_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::serial_movement::Entity")]
    Movements,
}

impl Related<super::serial_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
