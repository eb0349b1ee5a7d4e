//! Migration to create the subcontractors table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subcontractors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subcontractors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subcontractors::Name).text().not_null())
                    .col(
                        ColumnDef::new(Subcontractors::ContactEmail)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subcontractors::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Subcontractors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Subcontractors::UpdatedAt)
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
            .drop_table(Table::drop().table(Subcontractors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Subcontractors {
    Table,
    Id,
    Name,
    ContactEmail,
    Status,
    CreatedAt,
    UpdatedAt,
}
