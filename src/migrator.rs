use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_business_locations_table::Migration),
            Box::new(m20240101_000002_create_users_tables::Migration),
            Box::new(m20240101_000003_create_catalog_tables::Migration),
            Box::new(m20240101_000004_create_stock_transfers_table::Migration),
            Box::new(m20240101_000005_create_transfer_items_tables::Migration),
            Box::new(m20240101_000006_create_transfer_step_events_table::Migration),
            Box::new(m20240101_000007_create_serial_numbers_table::Migration),
            Box::new(m20240101_000008_create_serial_movements_table::Migration),
            Box::new(m20240101_000009_create_stock_ledger_entries_table::Migration),
            Box::new(m20240101_000010_create_sod_settings_table::Migration),
            Box::new(m20240101_000011_create_transfer_sequences_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_business_locations_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_business_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BusinessLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BusinessLocations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BusinessLocations::BusinessId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BusinessLocations::Name).string().not_null())
                        .col(ColumnDef::new(BusinessLocations::Code).string().null())
                        .col(
                            ColumnDef::new(BusinessLocations::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(BusinessLocations::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_business_locations_business_id")
                        .table(BusinessLocations::Table)
                        .col(BusinessLocations::BusinessId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BusinessLocations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum BusinessLocations {
        Table,
        Id,
        BusinessId,
        Name,
        Code,
        IsActive,
        CreatedAt,
    }
}

mod m20240101_000002_create_users_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_users_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::BusinessId).uuid().not_null())
                        .col(ColumnDef::new(Users::Username).string().not_null())
                        .col(ColumnDef::new(Users::DisplayName).string().not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_business_id")
                        .table(Users::Table)
                        .col(Users::BusinessId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserLocations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(UserLocations::UserId).uuid().not_null())
                        .col(ColumnDef::new(UserLocations::LocationId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(UserLocations::UserId)
                                .col(UserLocations::LocationId),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UserLocations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        BusinessId,
        Username,
        DisplayName,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum UserLocations {
        Table,
        UserId,
        LocationId,
    }
}

mod m20240101_000003_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::BusinessId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_business_id")
                        .table(Products::Table)
                        .col(Products::BusinessId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductVariations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariations::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariations::Name).string().not_null())
                        .col(ColumnDef::new(ProductVariations::Sku).string().not_null())
                        .col(
                            ColumnDef::new(ProductVariations::IsSerialized)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProductVariations::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_variations_product_id")
                        .table(ProductVariations::Table)
                        .col(ProductVariations::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductVariations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        BusinessId,
        Name,
        Sku,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductVariations {
        Table,
        Id,
        ProductId,
        Name,
        Sku,
        IsSerialized,
        CreatedAt,
    }
}

mod m20240101_000004_create_stock_transfers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_stock_transfers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransfers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::BusinessId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::TransferNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::SourceLocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::DestinationLocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::TransferDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::Notes).string().null())
                        .col(ColumnDef::new(StockTransfers::Status).string().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::CancelledAt)
                                .timestamp()
                                .null(),
                        )
                        .col(ColumnDef::new(StockTransfers::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            // Transfer numbers repeat across tenants but never within one.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfers_business_number")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::BusinessId)
                        .col(StockTransfers::TransferNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfers_status")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfers_source_location")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::SourceLocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfers_destination_location")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::DestinationLocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfers_transfer_date")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::TransferDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockTransfers {
        Table,
        Id,
        BusinessId,
        TransferNumber,
        SourceLocationId,
        DestinationLocationId,
        TransferDate,
        Notes,
        Status,
        CancelledAt,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20240101_000005_create_transfer_items_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_transfer_items_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTransferItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransferItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferItems::TransferId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferItems::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferItems::VariationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferItems::Quantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferItems::ReceivedQuantity)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfer_items_transfer_id")
                        .table(StockTransferItems::Table)
                        .col(StockTransferItems::TransferId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransferItemSerials::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferItemSerials::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItemSerials::TransferId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItemSerials::ItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferItemSerials::SerialNumberId)
                                .uuid()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_item_serials_transfer_id")
                        .table(TransferItemSerials::Table)
                        .col(TransferItemSerials::TransferId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_item_serials_unique_unit")
                        .table(TransferItemSerials::Table)
                        .col(TransferItemSerials::TransferId)
                        .col(TransferItemSerials::SerialNumberId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferItemSerials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockTransferItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockTransferItems {
        Table,
        Id,
        TransferId,
        ProductId,
        VariationId,
        Quantity,
        ReceivedQuantity,
    }

    #[derive(DeriveIden)]
    pub(super) enum TransferItemSerials {
        Table,
        Id,
        TransferId,
        ItemId,
        SerialNumberId,
    }
}

mod m20240101_000006_create_transfer_step_events_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_transfer_step_events_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TransferStepEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferStepEvents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferStepEvents::TransferId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferStepEvents::Step).string().not_null())
                        .col(
                            ColumnDef::new(TransferStepEvents::ActorId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferStepEvents::OccurredAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_step_events_transfer_id")
                        .table(TransferStepEvents::Table)
                        .col(TransferStepEvents::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferStepEvents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum TransferStepEvents {
        Table,
        Id,
        TransferId,
        Step,
        ActorId,
        OccurredAt,
    }
}

mod m20240101_000007_create_serial_numbers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_serial_numbers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SerialNumbers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SerialNumbers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SerialNumbers::BusinessId).uuid().not_null())
                        .col(ColumnDef::new(SerialNumbers::ProductId).uuid().not_null())
                        .col(ColumnDef::new(SerialNumbers::VariationId).uuid().not_null())
                        .col(ColumnDef::new(SerialNumbers::Code).string().not_null())
                        .col(ColumnDef::new(SerialNumbers::Status).string().not_null())
                        .col(
                            ColumnDef::new(SerialNumbers::CurrentLocationId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(SerialNumbers::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerialNumbers::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_serial_numbers_business_code")
                        .table(SerialNumbers::Table)
                        .col(SerialNumbers::BusinessId)
                        .col(SerialNumbers::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_serial_numbers_variation_status")
                        .table(SerialNumbers::Table)
                        .col(SerialNumbers::VariationId)
                        .col(SerialNumbers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_serial_numbers_current_location")
                        .table(SerialNumbers::Table)
                        .col(SerialNumbers::CurrentLocationId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SerialNumbers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SerialNumbers {
        Table,
        Id,
        BusinessId,
        ProductId,
        VariationId,
        Code,
        Status,
        CurrentLocationId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000008_create_serial_movements_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000008_create_serial_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SerialMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SerialMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerialMovements::BusinessId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerialMovements::SerialNumberId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerialMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerialMovements::FromLocationId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(SerialMovements::ToLocationId).uuid().null())
                        .col(
                            ColumnDef::new(SerialMovements::ReferenceType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SerialMovements::ReferenceId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SerialMovements::MovedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(SerialMovements::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_serial_movements_serial_number_id")
                        .table(SerialMovements::Table)
                        .col(SerialMovements::SerialNumberId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_serial_movements_reference")
                        .table(SerialMovements::Table)
                        .col(SerialMovements::ReferenceType)
                        .col(SerialMovements::ReferenceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SerialMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SerialMovements {
        Table,
        Id,
        BusinessId,
        SerialNumberId,
        MovementType,
        FromLocationId,
        ToLocationId,
        ReferenceType,
        ReferenceId,
        MovedBy,
        CreatedAt,
    }
}

mod m20240101_000009_create_stock_ledger_entries_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000009_create_stock_ledger_entries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockLedgerEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLedgerEntries::Id)
                                .big_integer()
                                .auto_increment()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::BusinessId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::VariationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::LocationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::EntryType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::Quantity)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::Balance)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ReferenceType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::ReferenceId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::CreatedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedgerEntries::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Balance lookups always scope to one variation at one location,
            // newest entry first.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_pair_created_at")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::VariationId)
                        .col(StockLedgerEntries::LocationId)
                        .col(StockLedgerEntries::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_reference")
                        .table(StockLedgerEntries::Table)
                        .col(StockLedgerEntries::ReferenceType)
                        .col(StockLedgerEntries::ReferenceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLedgerEntries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockLedgerEntries {
        Table,
        Id,
        BusinessId,
        ProductId,
        VariationId,
        LocationId,
        EntryType,
        Quantity,
        Balance,
        ReferenceType,
        ReferenceId,
        CreatedBy,
        CreatedAt,
    }
}

mod m20240101_000010_create_sod_settings_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000010_create_sod_settings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SodSettings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SodSettings::BusinessId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SodSettings::EnforceTransferSod)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(SodSettings::AllowCreatorCheck)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SodSettings::AllowCreatorSend)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SodSettings::AllowCheckerSend)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SodSettings::AllowCreatorReceive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SodSettings::AllowSenderComplete)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SodSettings::AllowCreatorComplete)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SodSettings::AllowReceiverComplete)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(SodSettings::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SodSettings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum SodSettings {
        Table,
        BusinessId,
        EnforceTransferSod,
        AllowCreatorCheck,
        AllowCreatorSend,
        AllowCheckerSend,
        AllowCreatorReceive,
        AllowSenderComplete,
        AllowCreatorComplete,
        AllowReceiverComplete,
        UpdatedAt,
    }
}

mod m20240101_000011_create_transfer_sequences_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000011_create_transfer_sequences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TransferSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferSequences::BusinessId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferSequences::Period)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransferSequences::LastValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .primary_key(
                            Index::create()
                                .col(TransferSequences::BusinessId)
                                .col(TransferSequences::Period),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferSequences::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum TransferSequences {
        Table,
        BusinessId,
        Period,
        LastValue,
    }
}
