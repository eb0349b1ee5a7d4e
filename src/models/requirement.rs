//! Requirement entity model
//!
//! This module contains the SeaORM entity model for the requirements table,
//! one row per (subcontractor, document type) compliance obligation.
//! Requirements are never hard-deleted; superseded or withdrawn rows are
//! hidden instead.

use super::document_type::Entity as DocumentType;
use super::subcontractor::Entity as Subcontractor;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

/// Requirement entity tracking one document obligation's lifecycle
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "requirements")]
pub struct Model {
    /// Unique identifier for the requirement (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Subcontractor this obligation belongs to
    pub subcontractor_id: Uuid,

    /// Document type being requested
    pub document_type_id: Uuid,

    /// Lifecycle status (missing|submitted|in_review|valid|expiring|expired|rejected|hidden)
    pub status: String,

    /// Reviewer-supplied reason, set only while status is rejected
    pub rejection_reason: Option<String>,

    /// Optional staff-facing due date for dashboards
    pub due_date: Option<Date>,

    /// Whether the reminder flow for this requirement has escalated to staff
    pub escalated: bool,

    /// Start of the approved validity window
    pub valid_from: Option<Date>,

    /// End of the approved validity window; null for does_not_expire types
    pub valid_to: Option<Date>,

    /// Timestamp when the requirement was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the requirement was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Subcontractor",
        from = "Column::SubcontractorId",
        to = "super::subcontractor::Column::Id"
    )]
    Subcontractor,
    #[sea_orm(
        belongs_to = "DocumentType",
        from = "Column::DocumentTypeId",
        to = "super::document_type::Column::Id"
    )]
    DocumentType,
    #[sea_orm(has_many = "super::reminder_job::Entity")]
    ReminderJobs,
}

impl Related<Subcontractor> for Entity {
    fn to() -> RelationDef {
        Relation::Subcontractor.def()
    }
}

impl Related<DocumentType> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentType.def()
    }
}

impl Related<super::reminder_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReminderJobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
