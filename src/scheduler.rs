//! # Reminder Scheduler
//!
//! Manual control surface for reminder jobs, keyed by requirement so
//! callers never juggle job IDs. Creation enforces the one-live-job rule;
//! pause, resume, and stop ride the repository's conditional updates so a
//! concurrent sweep can never be half-applied over a manual action.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::config::SweepConfig;
use crate::error::SchedulerError;
use crate::lifecycle::RequirementStatus;
use crate::models::reminder_job;
use crate::repositories::{ReminderJobRepository, RequirementRepository};
use crate::schedule;

/// Scheduling operations for one requirement's reminder flow.
#[derive(Clone)]
pub struct ReminderScheduler {
    requirements: RequirementRepository,
    jobs: ReminderJobRepository,
    resume_grace: Duration,
}

impl ReminderScheduler {
    pub fn new(
        requirements: RequirementRepository,
        jobs: ReminderJobRepository,
        sweep: &SweepConfig,
    ) -> Self {
        Self {
            requirements,
            jobs,
            resume_grace: Duration::seconds(sweep.resume_grace_seconds as i64),
        }
    }

    /// Start the reminder flow for a requirement. The first send is due
    /// immediately; the fixed ladder unfolds from the job's creation time.
    pub async fn create(
        &self,
        requirement_id: Uuid,
    ) -> Result<reminder_job::Model, SchedulerError> {
        let requirement = self.requirements.get(requirement_id).await?;
        let status = RequirementStatus::parse(&requirement.status)?;
        if !status.is_tracked() {
            return Err(SchedulerError::invalid_transition(
                "cannot schedule reminders for a withdrawn requirement",
            ));
        }

        self.jobs
            .create(requirement_id, schedule::DEFAULT_MAX_ATTEMPTS, Utc::now())
            .await
    }

    /// Pause the live job. Attempts and cadence position are preserved.
    pub async fn pause(
        &self,
        requirement_id: Uuid,
    ) -> Result<reminder_job::Model, SchedulerError> {
        let job = self.jobs.get_live(requirement_id).await?;
        self.jobs.pause(job.id).await
    }

    /// Resume the live job. The next run lands after the grace interval so
    /// resuming never fires a reminder in the same instant.
    pub async fn resume(
        &self,
        requirement_id: Uuid,
    ) -> Result<reminder_job::Model, SchedulerError> {
        let job = self.jobs.get_live(requirement_id).await?;
        self.jobs.resume(job.id, Utc::now() + self.resume_grace).await
    }

    /// Stop the reminder flow for good. Idempotent on already-stopped jobs.
    pub async fn stop(
        &self,
        requirement_id: Uuid,
    ) -> Result<reminder_job::Model, SchedulerError> {
        let job = self
            .jobs
            .find_latest(requirement_id)
            .await?
            .ok_or(SchedulerError::NotFound("reminder job"))?;
        self.jobs.stop(job.id).await
    }

    /// Complete the live job because its requirement no longer needs
    /// nagging (approved, withdrawn, or subcontractor archived).
    pub async fn complete_for(&self, requirement_id: Uuid) -> Result<bool, SchedulerError> {
        self.jobs.complete_live(requirement_id).await
    }

    /// Current job for a requirement, live or latest-terminal.
    pub async fn status(
        &self,
        requirement_id: Uuid,
    ) -> Result<reminder_job::Model, SchedulerError> {
        self.requirements.get(requirement_id).await?;
        self.jobs
            .find_latest(requirement_id)
            .await?
            .ok_or(SchedulerError::NotFound("reminder job"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::schedule::JobState;
    use migration::Migrator;
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Set};
    use sea_orm_migration::MigratorTrait;

    async fn setup() -> (DatabaseConnection, ReminderScheduler, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let now = Utc::now().fixed_offset();
        let sub_id = Uuid::new_v4();
        // SQLite has no insert-id to return for uuid keys.
        match (crate::models::subcontractor::ActiveModel {
            id: Set(sub_id),
            name: Set("Nordbau GmbH".to_string()),
            contact_email: Set("office@nordbau.example".to_string()),
            status: Set("active".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await)
        {
            Ok(_) | Err(DbErr::UnpackInsertId) => {}
            Err(err) => panic!("insert subcontractor: {err}"),
        }
        let doc_id = Uuid::new_v4();
        match (crate::models::document_type::ActiveModel {
            id: Set(doc_id),
            slug: Set("liability-insurance".to_string()),
            display_name: Set("Liability insurance".to_string()),
            does_not_expire: Set(false),
            monthly_refresh: Set(false),
            expiry_lead_days: Set(30),
            created_at: Set(now),
        }
        .insert(&db)
        .await)
        {
            Ok(_) | Err(DbErr::UnpackInsertId) => {}
            Err(err) => panic!("insert document type: {err}"),
        }

        let bus = EventBus::default();
        let requirements = RequirementRepository::new(db.clone(), bus.clone());
        let requirement = requirements.create(sub_id, doc_id, None).await.unwrap();

        let jobs = ReminderJobRepository::new(db.clone(), bus);
        let sweep = SweepConfig::default();
        let scheduler = ReminderScheduler::new(requirements, jobs, &sweep);
        (db, scheduler, requirement.id)
    }

    #[tokio::test]
    async fn create_is_due_immediately_and_unique() {
        let (_db, scheduler, requirement_id) = setup().await;

        let job = scheduler.create(requirement_id).await.unwrap();
        assert_eq!(job.state, JobState::Active.as_str());
        assert_eq!(job.attempts, 0);
        assert!(job.next_run_at <= Utc::now().fixed_offset());

        let err = scheduler.create(requirement_id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn pause_resume_round_trip_pushes_next_run_out() {
        let (_db, scheduler, requirement_id) = setup().await;
        scheduler.create(requirement_id).await.unwrap();

        let paused = scheduler.pause(requirement_id).await.unwrap();
        assert_eq!(paused.state, JobState::Paused.as_str());

        // Pausing twice is refused, not silently absorbed.
        let err = scheduler.pause(requirement_id).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidTransition { .. }));

        let resumed = scheduler.resume(requirement_id).await.unwrap();
        assert_eq!(resumed.state, JobState::Active.as_str());
        let in_half_an_hour = Utc::now().fixed_offset() + Duration::minutes(30);
        assert!(resumed.next_run_at > in_half_an_hour);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_allows_recreation() {
        let (_db, scheduler, requirement_id) = setup().await;
        scheduler.create(requirement_id).await.unwrap();

        let stopped = scheduler.stop(requirement_id).await.unwrap();
        assert_eq!(stopped.state, JobState::Completed.as_str());

        let again = scheduler.stop(requirement_id).await.unwrap();
        assert_eq!(again.state, JobState::Completed.as_str());

        // The unique index only covers live jobs, so a fresh flow can start.
        let fresh = scheduler.create(requirement_id).await.unwrap();
        assert_eq!(fresh.attempts, 0);
    }

    #[tokio::test]
    async fn missing_requirement_is_not_found() {
        let (_db, scheduler, _requirement_id) = setup().await;
        let err = scheduler.create(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::NotFound("requirement")));
    }
}
