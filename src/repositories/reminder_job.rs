//! Reminder job repository
//!
//! Persistence for reminder jobs. All state changes are conditional
//! updates keyed on the state (and, for dispatch, the attempt counter) the
//! caller observed, so a concurrent sweep or manual action loses cleanly
//! instead of double-applying. `rows_affected == 0` means somebody else got
//! there first.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::{is_unique_violation, SchedulerError};
use crate::events::{DomainEvent, EventBus};
use crate::models::{reminder_job, requirement};
use crate::schedule::{self, JobState};

/// Outcome of recording a notifier failure against a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Failure counted; the job stays active and will be retried next sweep.
    Recorded,
    /// The consecutive-failure ceiling was reached; the job is now paused.
    Quarantined,
    /// A concurrent writer changed the job first; nothing was written.
    Lost,
}

/// Repository for reminder job rows.
#[derive(Clone)]
pub struct ReminderJobRepository {
    db: DatabaseConnection,
    events: EventBus,
}

impl ReminderJobRepository {
    pub fn new(db: DatabaseConnection, events: EventBus) -> Self {
        Self { db, events }
    }

    /// Create an active job for a requirement, due immediately.
    ///
    /// The partial unique index on live jobs makes a second create for the
    /// same requirement fail with `AlreadyExists` rather than race.
    pub async fn create(
        &self,
        requirement_id: Uuid,
        max_attempts: i32,
        now: DateTime<Utc>,
    ) -> Result<reminder_job::Model, SchedulerError> {
        let stamp = now.fixed_offset();
        let id = Uuid::new_v4();
        let model = reminder_job::ActiveModel {
            id: Set(id),
            requirement_id: Set(requirement_id),
            state: Set(JobState::Active.as_str().to_string()),
            next_run_at: Set(schedule::next_run_at(now, 0).fixed_offset()),
            attempts: Set(0),
            max_attempts: Set(max_attempts),
            failures: Set(0),
            escalated: Set(false),
            created_at: Set(stamp),
            updated_at: Set(stamp),
        };

        // SQLite surfaces a successful uuid-keyed insert as UnpackInsertId.
        let created = match model.insert(&self.db).await {
            Ok(created) => created,
            Err(DbErr::UnpackInsertId) => self
                .find(id)
                .await?
                .ok_or(SchedulerError::NotFound("reminder job"))?,
            Err(err) if is_unique_violation(&err) => {
                return Err(SchedulerError::AlreadyExists(
                    "a live reminder job already exists for this requirement",
                ));
            }
            Err(err) => {
                tracing::error!(%requirement_id, error = %err, "failed to create reminder job");
                return Err(SchedulerError::from(err));
            }
        };

        self.publish(&created, JobState::Active);
        Ok(created)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<reminder_job::Model>, SchedulerError> {
        Ok(reminder_job::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// The live (active or paused) job for a requirement, if any.
    pub async fn find_live(
        &self,
        requirement_id: Uuid,
    ) -> Result<Option<reminder_job::Model>, SchedulerError> {
        Ok(reminder_job::Entity::find()
            .filter(reminder_job::Column::RequirementId.eq(requirement_id))
            .filter(
                reminder_job::Column::State
                    .is_in([JobState::Active.as_str(), JobState::Paused.as_str()]),
            )
            .one(&self.db)
            .await?)
    }

    pub async fn get_live(
        &self,
        requirement_id: Uuid,
    ) -> Result<reminder_job::Model, SchedulerError> {
        self.find_live(requirement_id)
            .await?
            .ok_or(SchedulerError::NotFound("reminder job"))
    }

    /// The most recent job for a requirement regardless of state.
    pub async fn find_latest(
        &self,
        requirement_id: Uuid,
    ) -> Result<Option<reminder_job::Model>, SchedulerError> {
        Ok(reminder_job::Entity::find()
            .filter(reminder_job::Column::RequirementId.eq(requirement_id))
            .order_by_desc(reminder_job::Column::CreatedAt)
            .one(&self.db)
            .await?)
    }

    /// Active jobs whose `next_run_at` has passed, oldest first, with the
    /// requirement each one belongs to.
    pub async fn due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<(reminder_job::Model, Option<requirement::Model>)>, SchedulerError> {
        Ok(reminder_job::Entity::find()
            .find_also_related(requirement::Entity)
            .filter(reminder_job::Column::State.eq(JobState::Active.as_str()))
            .filter(reminder_job::Column::NextRunAt.lte(now.fixed_offset()))
            .order_by_asc(reminder_job::Column::NextRunAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Pause an active job. Fails with `InvalidTransition` from any other
    /// state.
    pub async fn pause(&self, job_id: Uuid) -> Result<reminder_job::Model, SchedulerError> {
        let rows = reminder_job::Entity::update_many()
            .col_expr(
                reminder_job::Column::State,
                Expr::value(JobState::Paused.as_str()),
            )
            .col_expr(
                reminder_job::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(reminder_job::Column::Id.eq(job_id))
            .filter(reminder_job::Column::State.eq(JobState::Active.as_str()))
            .exec(&self.db)
            .await?
            .rows_affected;

        if rows == 0 {
            return Err(self.transition_refusal(job_id, "pause").await?);
        }
        self.reload_and_publish(job_id, JobState::Paused).await
    }

    /// Resume a paused job. The next run is pushed out to `resume_at` so a
    /// long-paused job does not fire the moment it wakes.
    pub async fn resume(
        &self,
        job_id: Uuid,
        resume_at: DateTime<Utc>,
    ) -> Result<reminder_job::Model, SchedulerError> {
        let rows = reminder_job::Entity::update_many()
            .col_expr(
                reminder_job::Column::State,
                Expr::value(JobState::Active.as_str()),
            )
            .col_expr(
                reminder_job::Column::NextRunAt,
                Expr::value(resume_at.fixed_offset()),
            )
            .col_expr(reminder_job::Column::Failures, Expr::value(0))
            .col_expr(
                reminder_job::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(reminder_job::Column::Id.eq(job_id))
            .filter(reminder_job::Column::State.eq(JobState::Paused.as_str()))
            .exec(&self.db)
            .await?
            .rows_affected;

        if rows == 0 {
            return Err(self.transition_refusal(job_id, "resume").await?);
        }
        self.reload_and_publish(job_id, JobState::Active).await
    }

    /// Stop a job for good. Idempotent: stopping an already-completed job
    /// succeeds without touching the row. Escalated jobs can be stopped too;
    /// the sticky `escalated` flag survives.
    pub async fn stop(&self, job_id: Uuid) -> Result<reminder_job::Model, SchedulerError> {
        let rows = reminder_job::Entity::update_many()
            .col_expr(
                reminder_job::Column::State,
                Expr::value(JobState::Completed.as_str()),
            )
            .col_expr(
                reminder_job::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(reminder_job::Column::Id.eq(job_id))
            .filter(reminder_job::Column::State.ne(JobState::Completed.as_str()))
            .exec(&self.db)
            .await?
            .rows_affected;

        let job = self
            .find(job_id)
            .await?
            .ok_or(SchedulerError::NotFound("reminder job"))?;
        if rows > 0 {
            self.publish(&job, JobState::Completed);
        }
        Ok(job)
    }

    /// Claim one dispatch attempt before anything is sent: bump the attempt
    /// counter, clear the consecutive-failure count, and schedule the next
    /// run. Returns `false` when a concurrent sweep claimed this attempt
    /// first, in which case the caller must not send or log anything.
    pub async fn claim_dispatch(
        &self,
        job: &reminder_job::Model,
        next_run: DateTime<Utc>,
    ) -> Result<bool, SchedulerError> {
        let rows = reminder_job::Entity::update_many()
            .col_expr(reminder_job::Column::Attempts, Expr::value(job.attempts + 1))
            .col_expr(reminder_job::Column::Failures, Expr::value(0))
            .col_expr(
                reminder_job::Column::NextRunAt,
                Expr::value(next_run.fixed_offset()),
            )
            .col_expr(
                reminder_job::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(reminder_job::Column::Id.eq(job.id))
            .filter(reminder_job::Column::State.eq(JobState::Active.as_str()))
            .filter(reminder_job::Column::Attempts.eq(job.attempts))
            .exec(&self.db)
            .await?
            .rows_affected;
        Ok(rows > 0)
    }

    /// Roll a claimed attempt back after the notifier refused the send:
    /// restore the attempt counter and schedule so the same rung is retried
    /// next sweep, count the consecutive failure, and pause the job once
    /// `quarantine_after` failures pile up.
    pub async fn release_claim(
        &self,
        job: &reminder_job::Model,
        quarantine_after: i32,
    ) -> Result<FailureOutcome, SchedulerError> {
        let failures = job.failures + 1;
        let quarantine = failures >= quarantine_after;

        let mut update = reminder_job::Entity::update_many()
            .col_expr(reminder_job::Column::Attempts, Expr::value(job.attempts))
            .col_expr(
                reminder_job::Column::NextRunAt,
                Expr::value(job.next_run_at),
            )
            .col_expr(reminder_job::Column::Failures, Expr::value(failures))
            .col_expr(
                reminder_job::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            );
        if quarantine {
            update = update.col_expr(
                reminder_job::Column::State,
                Expr::value(JobState::Paused.as_str()),
            );
        }
        let rows = update
            .filter(reminder_job::Column::Id.eq(job.id))
            .filter(reminder_job::Column::State.eq(JobState::Active.as_str()))
            .filter(reminder_job::Column::Attempts.eq(job.attempts + 1))
            .exec(&self.db)
            .await?
            .rows_affected;

        if rows == 0 {
            return Ok(FailureOutcome::Lost);
        }
        if quarantine {
            tracing::warn!(
                job_id = %job.id,
                requirement_id = %job.requirement_id,
                failures,
                "reminder job quarantined after consecutive notifier failures"
            );
            self.publish(job, JobState::Paused);
            return Ok(FailureOutcome::Quarantined);
        }
        Ok(FailureOutcome::Recorded)
    }

    /// Terminal escalation hand-off: the ladder is exhausted and staff take
    /// over. Returns `false` when a concurrent writer changed the job first.
    pub async fn escalate(&self, job: &reminder_job::Model) -> Result<bool, SchedulerError> {
        let rows = reminder_job::Entity::update_many()
            .col_expr(
                reminder_job::Column::State,
                Expr::value(JobState::Escalated.as_str()),
            )
            .col_expr(reminder_job::Column::Escalated, Expr::value(true))
            .col_expr(
                reminder_job::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(reminder_job::Column::Id.eq(job.id))
            .filter(reminder_job::Column::State.eq(JobState::Active.as_str()))
            .filter(reminder_job::Column::Attempts.eq(job.attempts))
            .exec(&self.db)
            .await?
            .rows_affected;

        if rows > 0 {
            self.publish(job, JobState::Escalated);
        }
        Ok(rows > 0)
    }

    /// Count a notifier failure. The attempt counter and `next_run_at` stay
    /// put so the next sweep retries the same rung; after
    /// `quarantine_after` consecutive failures the job is paused instead of
    /// burning a notifier call every sweep.
    pub async fn record_failure(
        &self,
        job: &reminder_job::Model,
        quarantine_after: i32,
    ) -> Result<FailureOutcome, SchedulerError> {
        let failures = job.failures + 1;
        let quarantine = failures >= quarantine_after;

        let mut update = reminder_job::Entity::update_many()
            .col_expr(reminder_job::Column::Failures, Expr::value(failures))
            .col_expr(
                reminder_job::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            );
        if quarantine {
            update = update.col_expr(
                reminder_job::Column::State,
                Expr::value(JobState::Paused.as_str()),
            );
        }
        let rows = update
            .filter(reminder_job::Column::Id.eq(job.id))
            .filter(reminder_job::Column::State.eq(JobState::Active.as_str()))
            .filter(reminder_job::Column::Attempts.eq(job.attempts))
            .filter(reminder_job::Column::Failures.eq(job.failures))
            .exec(&self.db)
            .await?
            .rows_affected;

        if rows == 0 {
            return Ok(FailureOutcome::Lost);
        }
        if quarantine {
            tracing::warn!(
                job_id = %job.id,
                requirement_id = %job.requirement_id,
                failures,
                "reminder job quarantined after consecutive notifier failures"
            );
            self.publish(job, JobState::Paused);
            return Ok(FailureOutcome::Quarantined);
        }
        Ok(FailureOutcome::Recorded)
    }

    /// Self-heal: complete a live job whose requirement no longer needs
    /// reminders. Returns `true` when this call did the completing.
    pub async fn complete_live(&self, requirement_id: Uuid) -> Result<bool, SchedulerError> {
        let live = self.find_live(requirement_id).await?;
        let Some(job) = live else {
            return Ok(false);
        };
        let rows = reminder_job::Entity::update_many()
            .col_expr(
                reminder_job::Column::State,
                Expr::value(JobState::Completed.as_str()),
            )
            .col_expr(
                reminder_job::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(reminder_job::Column::Id.eq(job.id))
            .filter(
                reminder_job::Column::State
                    .is_in([JobState::Active.as_str(), JobState::Paused.as_str()]),
            )
            .exec(&self.db)
            .await?
            .rows_affected;

        if rows > 0 {
            self.publish(&job, JobState::Completed);
        }
        Ok(rows > 0)
    }

    /// Build the caller-facing error after a conditional update matched
    /// nothing.
    async fn transition_refusal(
        &self,
        job_id: Uuid,
        action: &str,
    ) -> Result<SchedulerError, SchedulerError> {
        match self.find(job_id).await? {
            None => Ok(SchedulerError::NotFound("reminder job")),
            Some(job) => Ok(SchedulerError::invalid_transition(format!(
                "cannot {} a {} reminder job",
                action, job.state
            ))),
        }
    }

    async fn reload_and_publish(
        &self,
        job_id: Uuid,
        state: JobState,
    ) -> Result<reminder_job::Model, SchedulerError> {
        let job = self
            .find(job_id)
            .await?
            .ok_or(SchedulerError::NotFound("reminder job"))?;
        self.publish(&job, state);
        Ok(job)
    }

    fn publish(&self, job: &reminder_job::Model, state: JobState) {
        self.events.publish(DomainEvent::ReminderJobChanged {
            job_id: job.id,
            requirement_id: job.requirement_id,
            state,
        });
    }
}
