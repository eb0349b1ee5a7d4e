//! Requirement repository
//!
//! Persistence and lifecycle transitions for requirement rows. Every
//! transition loads the current row, applies the pure state-machine rule,
//! and writes back, publishing a domain event once the write commits. The
//! partial unique index on live obligations turns duplicate creation into
//! `AlreadyExists` instead of a second row.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::error::{is_unique_violation, SchedulerError};
use crate::events::{DomainEvent, EventBus};
use crate::lifecycle::{self, RequirementStatus};
use crate::models::{document_type, requirement, subcontractor};

/// Repository for requirement rows and their lifecycle transitions.
#[derive(Clone)]
pub struct RequirementRepository {
    db: DatabaseConnection,
    events: EventBus,
}

/// A requirement together with the rows its behavior depends on.
pub struct RequirementDetail {
    pub requirement: requirement::Model,
    pub subcontractor: subcontractor::Model,
    pub document_type: document_type::Model,
}

impl RequirementRepository {
    pub fn new(db: DatabaseConnection, events: EventBus) -> Self {
        Self { db, events }
    }

    /// Create a new obligation in `missing` status.
    ///
    /// Fails with `AlreadyExists` when a live (non-hidden) requirement for
    /// the same (subcontractor, document type) pair is already present.
    pub async fn create(
        &self,
        subcontractor_id: Uuid,
        document_type_id: Uuid,
        due_date: Option<NaiveDate>,
    ) -> Result<requirement::Model, SchedulerError> {
        if subcontractor::Entity::find_by_id(subcontractor_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(SchedulerError::NotFound("subcontractor"));
        }
        if document_type::Entity::find_by_id(document_type_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(SchedulerError::NotFound("document type"));
        }

        let now = Utc::now().fixed_offset();
        let id = Uuid::new_v4();
        let model = requirement::ActiveModel {
            id: Set(id),
            subcontractor_id: Set(subcontractor_id),
            document_type_id: Set(document_type_id),
            status: Set(RequirementStatus::Missing.as_str().to_string()),
            rejection_reason: Set(None),
            due_date: Set(due_date),
            escalated: Set(false),
            valid_from: Set(None),
            valid_to: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // SQLite cannot hand a uuid primary key back through last_insert_id,
        // so a successful insert may still surface as UnpackInsertId.
        let created = match model.insert(&self.db).await {
            Ok(created) => created,
            Err(DbErr::UnpackInsertId) => self.get(id).await?,
            Err(err) if is_unique_violation(&err) => {
                return Err(SchedulerError::AlreadyExists(
                    "a live requirement for this subcontractor and document type already exists",
                ));
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to create requirement");
                return Err(SchedulerError::from(err));
            }
        };

        self.events.publish(DomainEvent::RequirementChanged {
            requirement_id: created.id,
            status: RequirementStatus::Missing,
        });
        Ok(created)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<requirement::Model>, SchedulerError> {
        Ok(requirement::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Load a requirement or fail with `NotFound`.
    pub async fn get(&self, id: Uuid) -> Result<requirement::Model, SchedulerError> {
        self.find(id)
            .await?
            .ok_or(SchedulerError::NotFound("requirement"))
    }

    /// Load a requirement together with its subcontractor and document type.
    pub async fn get_detail(&self, id: Uuid) -> Result<RequirementDetail, SchedulerError> {
        let requirement = self.get(id).await?;
        self.detail_for(requirement).await
    }

    /// Resolve the related rows for an already-loaded requirement.
    pub async fn detail_for(
        &self,
        requirement: requirement::Model,
    ) -> Result<RequirementDetail, SchedulerError> {
        let subcontractor = subcontractor::Entity::find_by_id(requirement.subcontractor_id)
            .one(&self.db)
            .await?
            .ok_or(SchedulerError::NotFound("subcontractor"))?;
        let document_type = document_type::Entity::find_by_id(requirement.document_type_id)
            .one(&self.db)
            .await?
            .ok_or(SchedulerError::NotFound("document type"))?;
        Ok(RequirementDetail {
            requirement,
            subcontractor,
            document_type,
        })
    }

    /// Tracked requirements whose document type participates in the
    /// monthly re-confirmation cadence, with that document type.
    pub async fn list_monthly_refresh_targets(
        &self,
    ) -> Result<Vec<(requirement::Model, document_type::Model)>, SchedulerError> {
        let rows = requirement::Entity::find()
            .find_also_related(document_type::Entity)
            .filter(document_type::Column::MonthlyRefresh.eq(true))
            .filter(requirement::Column::Status.ne(RequirementStatus::Hidden.as_str()))
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(req, doc)| doc.map(|doc| (req, doc)))
            .collect())
    }

    /// A new document was uploaded. Clears any stored rejection reason.
    pub async fn record_upload(&self, id: Uuid) -> Result<requirement::Model, SchedulerError> {
        let current = self.get(id).await?;
        let next = lifecycle::upload(RequirementStatus::parse(&current.status)?)?;
        let mut active: requirement::ActiveModel = current.into();
        active.rejection_reason = Set(None);
        self.write_status(active, id, next).await
    }

    /// A reviewer picked the submission up.
    pub async fn start_review(&self, id: Uuid) -> Result<requirement::Model, SchedulerError> {
        let current = self.get(id).await?;
        let next = lifecycle::start_review(RequirementStatus::parse(&current.status)?)?;
        self.write_status(current.into(), id, next).await
    }

    /// Reviewer approval sets the validity window and moves to `valid`.
    pub async fn approve(
        &self,
        id: Uuid,
        valid_from: Option<NaiveDate>,
        valid_to: Option<NaiveDate>,
    ) -> Result<requirement::Model, SchedulerError> {
        let detail = self.get_detail(id).await?;
        let next = lifecycle::approve(
            RequirementStatus::parse(&detail.requirement.status)?,
            valid_to,
            detail.document_type.does_not_expire,
        )?;
        let mut active: requirement::ActiveModel = detail.requirement.into();
        active.valid_from = Set(valid_from.or_else(|| Some(Utc::now().date_naive())));
        active.valid_to = Set(valid_to);
        active.rejection_reason = Set(None);
        self.write_status(active, id, next).await
    }

    /// Reviewer rejection with a mandatory reason.
    pub async fn reject(
        &self,
        id: Uuid,
        reason: String,
    ) -> Result<requirement::Model, SchedulerError> {
        let current = self.get(id).await?;
        let next = lifecycle::reject(RequirementStatus::parse(&current.status)?)?;
        let mut active: requirement::ActiveModel = current.into();
        active.rejection_reason = Set(Some(reason));
        self.write_status(active, id, next).await
    }

    /// Staff withdrew the obligation; the row is hidden, never deleted.
    pub async fn withdraw(&self, id: Uuid) -> Result<requirement::Model, SchedulerError> {
        let current = self.get(id).await?;
        let next = lifecycle::withdraw(RequirementStatus::parse(&current.status)?)?;
        self.write_status(current.into(), id, next).await
    }

    /// Mark the requirement as escalated to internal staff. Sticky.
    pub async fn mark_escalated(&self, id: Uuid) -> Result<(), SchedulerError> {
        let current = self.get(id).await?;
        if current.escalated {
            return Ok(());
        }
        let mut active: requirement::ActiveModel = current.into();
        active.escalated = Set(true);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&self.db).await?;
        Ok(())
    }

    /// Lazily recompute the time-driven status of an approved requirement.
    ///
    /// Runs on every read and at the start of every dispatch so nothing is
    /// ever served a stale `valid` after its window has run out. Writes back
    /// only when the status actually moves.
    pub async fn refresh_validity(
        &self,
        requirement: requirement::Model,
        document_type: &document_type::Model,
        today: NaiveDate,
    ) -> Result<requirement::Model, SchedulerError> {
        let status = RequirementStatus::parse(&requirement.status)?;
        let Some(next) = lifecycle::recompute_validity(
            status,
            requirement.valid_to,
            document_type.does_not_expire,
            i64::from(document_type.expiry_lead_days),
            today,
        ) else {
            return Ok(requirement);
        };

        let id = requirement.id;
        self.write_status(requirement.into(), id, next).await
    }

    async fn write_status(
        &self,
        mut active: requirement::ActiveModel,
        id: Uuid,
        next: RequirementStatus,
    ) -> Result<requirement::Model, SchedulerError> {
        active.status = Set(next.as_str().to_string());
        active.updated_at = Set(Utc::now().fixed_offset());
        let updated = active.update(&self.db).await.map_err(|err| {
            tracing::error!(requirement_id = %id, error = %err, "failed to update requirement");
            SchedulerError::from(err)
        })?;

        self.events.publish(DomainEvent::RequirementChanged {
            requirement_id: id,
            status: next,
        });
        Ok(updated)
    }
}
