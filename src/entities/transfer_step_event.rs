use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Workflow steps an actor can perform on a transfer.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferStep {
    #[sea_orm(string_value = "create")]
    Create,
    #[sea_orm(string_value = "check")]
    Check,
    #[sea_orm(string_value = "send")]
    Send,
    #[sea_orm(string_value = "arrive")]
    Arrive,
    #[sea_orm(string_value = "verify")]
    Verify,
    #[sea_orm(string_value = "complete")]
    Complete,
    #[sea_orm(string_value = "cancel")]
    Cancel,
}

/// Append-only workflow log: one row per performed step, in order.
///
/// Replaces per-step actor columns on the header; who did what (and when) is
/// read back from here for SOD decisions and display.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_step_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub step: TransferStep,
    pub actor_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_transfer::Entity",
        from = "Column::TransferId",
        to = "super::stock_transfer::Column::Id"
    )]
    Transfer,
}

impl Related<super::stock_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transfer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
