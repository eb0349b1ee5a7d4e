//! DocumentType entity model
//!
//! One kind of compliance paperwork (insurance certificate, tax clearance,
//! work permit) together with its expiry and refresh policy.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveModelBehavior;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "document_types")]
pub struct Model {
    /// Unique identifier for the document type (primary key)
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// Stable slug (unique), e.g. "liability-insurance"
    #[sea_orm(unique)]
    pub slug: String,

    /// Human-readable name shown in notifications
    pub display_name: String,

    /// Documents of this type never expire; approval needs no valid_to
    pub does_not_expire: bool,

    /// Requirement participates in the monthly re-confirmation cadence
    pub monthly_refresh: bool,

    /// Days before valid_to at which a valid requirement becomes expiring
    pub expiry_lead_days: i32,

    /// Timestamp when the document type was created
    pub created_at: DateTimeWithTimeZone,
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
