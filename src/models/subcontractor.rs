//! Subcontractor entity model
//!
//! This module contains the SeaORM entity model for the subcontractors table.
//! Archived subcontractors are excluded from reminder dispatch.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

/// Subcontractor entity representing one company owing compliance paperwork
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subcontractors")]
pub struct Model {
    /// Unique identifier for the subcontractor (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Company display name
    pub name: String,

    /// Address reminder emails are delivered to
    pub contact_email: String,

    /// Status of the subcontractor (active|archived)
    pub status: String,

    /// Timestamp when the subcontractor was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the subcontractor was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::requirement::Entity")]
    Requirements,
}

impl Related<super::requirement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requirements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
