use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserves a specific serialized unit for a transfer item. When links exist
/// for an item, their count equals the item's requested quantity.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfer_item_serials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transfer_id: Uuid,
    pub item_id: Uuid,
    pub serial_number_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_transfer_item::Entity",
        from = "Column::ItemId",
        to = "super::stock_transfer_item::Column::Id"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::serial_number::Entity",
        from = "Column::SerialNumberId",
        to = "super::serial_number::Column::Id"
    )]
    SerialNumber,
}

impl Related<super::stock_transfer_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::serial_number::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SerialNumber.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
