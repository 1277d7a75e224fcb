use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

/// One immutable quantity change for a (product variation, location) pair.
///
/// `quantity` is signed; `balance` is the running balance of the pair after
/// this entry. The latest entry's balance always equals the sum of all signed
/// quantities for the pair.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "stock_ledger_entries")]
pub struct Model {
    /// Monotonic append order; the highest id for a pair carries its
    /// current balance.
    #[sea_orm(primary_key)]
    pub id: i64,
    pub business_id: Uuid,
    pub product_id: Uuid,
    pub variation_id: Uuid,
    pub location_id: Uuid,
    pub entry_type: LedgerEntryType,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub balance: Decimal,
    /// The causing business document ("stock_transfer", "adjustment", ...).
    pub reference_type: String,
    pub reference_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_debit(&self) -> bool {
        self.quantity.is_sign_negative()
    }

    pub fn is_credit(&self) -> bool {
        self.quantity.is_sign_positive()
    }
}
