use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a stock transfer.
///
/// `Draft` is the single "awaiting dispatch" state; the workflow moves
/// strictly forward except for cancellation, which is only reachable before
/// the destination has taken delivery.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "checked")]
    Checked,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "arrived")]
    Arrived,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Draft => "draft",
            TransferStatus::Checked => "checked",
            TransferStatus::InTransit => "in_transit",
            TransferStatus::Arrived => "arrived",
            TransferStatus::Verified => "verified",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TransferStatus::Draft),
            "checked" => Some(TransferStatus::Checked),
            "in_transit" => Some(TransferStatus::InTransit),
            "arrived" => Some(TransferStatus::Arrived),
            "verified" => Some(TransferStatus::Verified),
            "completed" => Some(TransferStatus::Completed),
            "cancelled" => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    /// Source stock has been debited once this returns true. Derived from
    /// status instead of stored, so it can never drift from the lifecycle.
    pub fn stock_deducted(&self) -> bool {
        matches!(
            self,
            TransferStatus::InTransit
                | TransferStatus::Arrived
                | TransferStatus::Verified
                | TransferStatus::Completed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Cancelled)
    }

    /// Forward transitions of the workflow. Cancellation is handled
    /// separately via [`TransferStatus::can_cancel`].
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Draft, TransferStatus::Checked)
                | (TransferStatus::Checked, TransferStatus::InTransit)
                | (TransferStatus::InTransit, TransferStatus::Arrived)
                | (TransferStatus::Arrived, TransferStatus::Verified)
                | (TransferStatus::Verified, TransferStatus::Completed)
        )
    }

    /// A transfer may be cancelled until the destination has taken delivery.
    /// Cancelling an `in_transit` transfer requires stock restoration.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            TransferStatus::Draft | TransferStatus::Checked | TransferStatus::InTransit
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub business_id: Uuid,
    /// Human-readable document number, unique per business
    /// (`TR-YYYYMM-NNNN`, monotonic per business and calendar month).
    pub transfer_number: String,
    pub source_location_id: Uuid,
    pub destination_location_id: Uuid,
    pub transfer_date: NaiveDate,
    pub notes: Option<String>,
    pub status: TransferStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

impl Model {
    pub fn stock_deducted(&self) -> bool {
        self.status.stock_deducted()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_transfer_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::transfer_step_event::Entity")]
    StepEvents,
}

impl Related<super::stock_transfer_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::transfer_step_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StepEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
