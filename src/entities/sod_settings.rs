use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-business segregation-of-duties configuration for the transfer
/// workflow. Mutated only through business configuration; the transfer
/// engine reads it before every transition.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "sod_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub business_id: Uuid,
    /// Master switch; when off, every step is permitted regardless of actor.
    pub enforce_transfer_sod: bool,
    pub allow_creator_check: bool,
    pub allow_creator_send: bool,
    pub allow_checker_send: bool,
    pub allow_creator_receive: bool,
    pub allow_sender_complete: bool,
    pub allow_creator_complete: bool,
    pub allow_receiver_complete: bool,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Settings used when a business has not configured SOD yet:
    /// enforcement off, so nothing is restricted.
    pub fn defaults(business_id: Uuid) -> Self {
        Self {
            business_id,
            enforce_transfer_sod: false,
            allow_creator_check: true,
            allow_creator_send: true,
            allow_checker_send: true,
            allow_creator_receive: true,
            allow_sender_complete: true,
            allow_creator_complete: true,
            allow_receiver_complete: true,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
