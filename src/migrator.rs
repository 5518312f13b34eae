use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m20240115_000001_create_pending_payments_table::Migration,
        )]
    }
}

mod m20240115_000001_create_pending_payments_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240115_000001_create_pending_payments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // One row per checkout attempt; customer fields are a snapshot
            // captured at order time, never joined to a live profile.
            manager
                .create_table(
                    Table::create()
                        .table(PendingPayments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PendingPayments::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::CustomerName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PendingPayments::Mobile).string().not_null())
                        .col(ColumnDef::new(PendingPayments::Email).string().not_null())
                        .col(
                            ColumnDef::new(PendingPayments::HouseNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::Landmark)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::Pincode)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PendingPayments::City).string().not_null())
                        .col(ColumnDef::new(PendingPayments::State).string().not_null())
                        .col(
                            ColumnDef::new(PendingPayments::Country)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::TotalAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::PurchasePrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::ProductQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::OrderDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::OrderTime)
                                .time()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::ShippingOrderId)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(PendingPayments::Status).string().not_null())
                        .col(
                            ColumnDef::new(PendingPayments::IsPaid)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::ProviderPaymentId)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::PaymentSnapshot)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PendingPayments::CartSnapshot)
                                .text()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_pending_payments_provider_payment_id")
                        .table(PendingPayments::Table)
                        .col(PendingPayments::ProviderPaymentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_pending_payments_status")
                        .table(PendingPayments::Table)
                        .col(PendingPayments::Status)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PendingPayments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PendingPayments {
        Table,
        Id,
        CustomerName,
        Mobile,
        Email,
        HouseNumber,
        Landmark,
        Pincode,
        City,
        State,
        Country,
        TotalAmount,
        PurchasePrice,
        ProductQuantity,
        OrderDate,
        OrderTime,
        ShippingOrderId,
        Status,
        IsPaid,
        ProviderPaymentId,
        PaymentSnapshot,
        CartSnapshot,
    }
}
