//! ReminderJob entity model
//!
//! This module contains the SeaORM entity model for the reminder_jobs table,
//! the scheduling record that decides when and how often to nag about one
//! requirement. At most one active-or-paused job exists per requirement.

use super::requirement::Entity as Requirement;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

/// ReminderJob entity driving the fixed reminder cadence for a requirement
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reminder_jobs")]
pub struct Model {
    /// Unique identifier for the reminder job (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Requirement this job nags about (1:1 while live)
    pub requirement_id: Uuid,

    /// Current state of the job (active|paused|completed|escalated)
    pub state: String,

    /// When the job next becomes due; meaningful only while active
    pub next_run_at: DateTimeWithTimeZone,

    /// Number of reminders sent so far; never decreases
    pub attempts: i32,

    /// Attempt ceiling after which dispatch escalates to internal staff
    pub max_attempts: i32,

    /// Consecutive notifier failures since the last successful send
    pub failures: i32,

    /// Sticky escalation marker; stays true even if state later changes
    pub escalated: bool,

    /// Timestamp when the reminder job was created; anchors the cadence
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the reminder job was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Requirement",
        from = "Column::RequirementId",
        to = "super::requirement::Column::Id"
    )]
    Requirement,
}

impl Related<Requirement> for Entity {
    fn to() -> RelationDef {
        Relation::Requirement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
