//! Migration to create the document_types table.
//!
//! Document types describe one kind of compliance paperwork (insurance
//! certificate, tax clearance, work permit) together with its expiry policy.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DocumentTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DocumentTypes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DocumentTypes::Slug)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(DocumentTypes::DisplayName).text().not_null())
                    .col(
                        ColumnDef::new(DocumentTypes::DoesNotExpire)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(DocumentTypes::MonthlyRefresh)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(DocumentTypes::ExpiryLeadDays)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(DocumentTypes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DocumentTypes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DocumentTypes {
    Table,
    Id,
    Slug,
    DisplayName,
    DoesNotExpire,
    MonthlyRefresh,
    ExpiryLeadDays,
    CreatedAt,
}
