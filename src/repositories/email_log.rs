//! Email log repository
//!
//! Append-only audit trail of notification attempts. One row is written
//! per dispatch attempt, successful or not; the only non-audit read is the
//! same-day lookup that keeps the monthly refresh from stacking on top of
//! an ordinary reminder.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::models::email_log;
use crate::schedule::TemplateKey;

/// Delivery status recorded for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// Repository for the append-only email log.
#[derive(Clone)]
pub struct EmailLogRepository {
    db: DatabaseConnection,
}

impl EmailLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record one notification attempt.
    pub async fn append(
        &self,
        requirement_id: Uuid,
        subcontractor_id: Uuid,
        to_email: &str,
        template: TemplateKey,
        status: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<email_log::Model, SchedulerError> {
        let sent_at = match status {
            DeliveryStatus::Sent => Some(now.fixed_offset()),
            DeliveryStatus::Failed => None,
        };
        let id = Uuid::new_v4();
        let model = email_log::ActiveModel {
            id: Set(id),
            requirement_id: Set(requirement_id),
            subcontractor_id: Set(subcontractor_id),
            to_email: Set(to_email.to_string()),
            template_key: Set(template.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            created_at: Set(now.fixed_offset()),
            sent_at: Set(sent_at),
        };
        // SQLite surfaces a successful uuid-keyed insert as UnpackInsertId.
        match model.insert(&self.db).await {
            Ok(entry) => Ok(entry),
            Err(DbErr::UnpackInsertId) => email_log::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .ok_or(SchedulerError::NotFound("email log entry")),
            Err(err) => {
                tracing::error!(%requirement_id, error = %err, "failed to append email log entry");
                Err(SchedulerError::from(err))
            }
        }
    }

    /// Whether anything was successfully sent for this requirement on the
    /// given UTC day. Used to coalesce the monthly refresh with reminders
    /// that already went out.
    pub async fn any_sent_on(
        &self,
        requirement_id: Uuid,
        day: NaiveDate,
    ) -> Result<bool, SchedulerError> {
        let start = day
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
            .fixed_offset();
        let end = start + chrono::Duration::days(1);

        let count = email_log::Entity::find()
            .filter(email_log::Column::RequirementId.eq(requirement_id))
            .filter(email_log::Column::Status.eq(DeliveryStatus::Sent.as_str()))
            .filter(email_log::Column::CreatedAt.gte(start))
            .filter(email_log::Column::CreatedAt.lt(end))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Full audit trail for a requirement, newest first.
    pub async fn list_for_requirement(
        &self,
        requirement_id: Uuid,
    ) -> Result<Vec<email_log::Model>, SchedulerError> {
        Ok(email_log::Entity::find()
            .filter(email_log::Column::RequirementId.eq(requirement_id))
            .order_by_desc(email_log::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }
}
