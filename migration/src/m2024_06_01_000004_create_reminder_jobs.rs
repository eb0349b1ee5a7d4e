//! Migration to create the reminder_jobs table.
//!
//! One scheduling record per requirement driving the reminder cadence,
//! attempt counting, and escalation bookkeeping.

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
                    .table(ReminderJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReminderJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReminderJobs::RequirementId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReminderJobs::State)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(ReminderJobs::NextRunAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ReminderJobs::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReminderJobs::MaxAttempts)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    .col(
                        ColumnDef::new(ReminderJobs::Failures)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReminderJobs::Escalated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ReminderJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ReminderJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reminder_jobs_requirement_id")
                            .from(ReminderJobs::Table, ReminderJobs::RequirementId)
                            .to(Requirements::Table, Requirements::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one live (active or paused) job per requirement.
        let backend = manager.get_database_backend();
        match backend {
            DatabaseBackend::Postgres => manager
                .get_connection()
                .execute(Statement::from_string(
                    backend,
                    "DO $$\nBEGIN\n    IF NOT EXISTS (\n        SELECT 1 FROM pg_indexes\n        WHERE schemaname = current_schema()\n          AND indexname = 'idx_reminder_jobs_live_per_requirement'\n    ) THEN\n        CREATE UNIQUE INDEX idx_reminder_jobs_live_per_requirement\n            ON reminder_jobs (requirement_id)\n            WHERE state IN ('active','paused');\n    END IF;\nEND\n$$;"
                        .to_string(),
                ))
                .await
                .map(|_| ())?,
            _ => manager
                .get_connection()
                .execute(Statement::from_string(
                    backend,
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_reminder_jobs_live_per_requirement \
                     ON reminder_jobs (requirement_id) \
                     WHERE state IN ('active','paused')"
                        .to_string(),
                ))
                .await
                .map(|_| ())?,
        }

        // Sweep query: due active jobs ordered by next_run_at.
        manager
            .get_connection()
            .execute(Statement::from_string(
                backend,
                "CREATE INDEX IF NOT EXISTS idx_reminder_jobs_state_next_run \
                 ON reminder_jobs (state, next_run_at)"
                    .to_string(),
            ))
            .await
            .map(|_| ())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReminderJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReminderJobs {
    Table,
    Id,
    RequirementId,
    State,
    NextRunAt,
    Attempts,
    MaxAttempts,
    Failures,
    Escalated,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Requirements {
    Table,
    Id,
}
