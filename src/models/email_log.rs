//! EmailLogEntry entity model
//!
//! Append-only audit record of one notification attempt. The core writes
//! exactly one row per dispatch attempt and otherwise reads the table only
//! for same-day coalescing and the audit listing.

use super::requirement::Entity as Requirement;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "email_log")]
pub struct Model {
    /// Unique identifier for the log entry (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Requirement this notification concerns
    pub requirement_id: Uuid,

    /// Subcontractor the notification is about
    pub subcontractor_id: Uuid,

    /// Recipient address the notifier was invoked with
    pub to_email: String,

    /// Template key selected for this attempt
    pub template_key: String,

    /// Delivery status (queued|sent|failed)
    pub status: String,

    /// Timestamp when the attempt was recorded
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the notifier confirmed the send
    pub sent_at: Option<DateTimeWithTimeZone>,
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
