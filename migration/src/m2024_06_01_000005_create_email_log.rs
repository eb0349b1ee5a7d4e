//! Migration to create the append-only email_log table.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EmailLog::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EmailLog::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(EmailLog::RequirementId).uuid().not_null())
                    .col(ColumnDef::new(EmailLog::SubcontractorId).uuid().not_null())
                    .col(ColumnDef::new(EmailLog::ToEmail).text().not_null())
                    .col(ColumnDef::new(EmailLog::TemplateKey).text().not_null())
                    .col(
                        ColumnDef::new(EmailLog::Status)
                            .text()
                            .not_null()
                            .default("queued"),
                    )
                    .col(
                        ColumnDef::new(EmailLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(EmailLog::SentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_email_log_requirement_id")
                            .from(EmailLog::Table, EmailLog::RequirementId)
                            .to(Requirements::Table, Requirements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Same-day coalescing and per-requirement audit listing both read
        // through this index.
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_email_log_requirement_created \
                 ON email_log (requirement_id, created_at)"
                    .to_string(),
            ))
            .await
            .map(|_| ())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EmailLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EmailLog {
    Table,
    Id,
    RequirementId,
    SubcontractorId,
    ToEmail,
    TemplateKey,
    Status,
    CreatedAt,
    SentAt,
}

#[derive(DeriveIden)]
enum Requirements {
    Table,
    Id,
}
