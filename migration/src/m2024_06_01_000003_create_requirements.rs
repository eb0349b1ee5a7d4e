//! Migration to create the requirements table.
//!
//! A requirement is one (subcontractor, document type) obligation moving
//! through the missing/submitted/in_review/valid/expiring/expired/rejected
//! lifecycle. Requirements are never hard-deleted; withdrawn ones are hidden.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{DatabaseBackend, Statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Requirements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Requirements::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Requirements::SubcontractorId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Requirements::DocumentTypeId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Requirements::Status)
                            .text()
                            .not_null()
                            .default("missing"),
                    )
                    .col(ColumnDef::new(Requirements::RejectionReason).text().null())
                    .col(ColumnDef::new(Requirements::DueDate).date().null())
                    .col(
                        ColumnDef::new(Requirements::Escalated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Requirements::ValidFrom).date().null())
                    .col(ColumnDef::new(Requirements::ValidTo).date().null())
                    .col(
                        ColumnDef::new(Requirements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Requirements::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requirements_subcontractor_id")
                            .from(Requirements::Table, Requirements::SubcontractorId)
                            .to(Subcontractors::Table, Subcontractors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_requirements_document_type_id")
                            .from(Requirements::Table, Requirements::DocumentTypeId)
                            .to(DocumentTypes::Table, DocumentTypes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One live obligation per (subcontractor, document type); hidden rows
        // stay behind as history.
        let backend = manager.get_database_backend();
        match backend {
            DatabaseBackend::Postgres => manager
                .get_connection()
                .execute(Statement::from_string(
                    backend,
                    "DO $$\nBEGIN\n    IF NOT EXISTS (\n        SELECT 1 FROM pg_indexes\n        WHERE schemaname = current_schema()\n          AND indexname = 'idx_requirements_live_obligation'\n    ) THEN\n        CREATE UNIQUE INDEX idx_requirements_live_obligation\n            ON requirements (subcontractor_id, document_type_id)\n            WHERE status <> 'hidden';\n    END IF;\nEND\n$$;"
                        .to_string(),
                ))
                .await
                .map(|_| ())?,
            _ => manager
                .get_connection()
                .execute(Statement::from_string(
                    backend,
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_requirements_live_obligation \
                     ON requirements (subcontractor_id, document_type_id) \
                     WHERE status <> 'hidden'"
                        .to_string(),
                ))
                .await
                .map(|_| ())?,
        }

        manager
            .get_connection()
            .execute(Statement::from_string(
                backend,
                "CREATE INDEX IF NOT EXISTS idx_requirements_status ON requirements (status)"
                    .to_string(),
            ))
            .await
            .map(|_| ())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Requirements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Requirements {
    Table,
    Id,
    SubcontractorId,
    DocumentTypeId,
    Status,
    RejectionReason,
    DueDate,
    Escalated,
    ValidFrom,
    ValidTo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Subcontractors {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum DocumentTypes {
    Table,
    Id,
}
