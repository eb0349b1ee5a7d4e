//! Database migrations for the doctrack service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2024_06_01_000001_create_subcontractors;
mod m2024_06_01_000002_create_document_types;
mod m2024_06_01_000003_create_requirements;
mod m2024_06_01_000004_create_reminder_jobs;
mod m2024_06_01_000005_create_email_log;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_06_01_000001_create_subcontractors::Migration),
            Box::new(m2024_06_01_000002_create_document_types::Migration),
            Box::new(m2024_06_01_000003_create_requirements::Migration),
            Box::new(m2024_06_01_000004_create_reminder_jobs::Migration),
            Box::new(m2024_06_01_000005_create_email_log::Migration),
        ]
    }
}
