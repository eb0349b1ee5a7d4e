//! # Reminder Dispatcher
//!
//! Periodic sweep that turns due reminder jobs into notifications. Each
//! sweep re-validates that the target still needs nagging (self-healing
//! jobs whose requirement was approved, withdrawn, or whose subcontractor
//! was archived; deferring jobs whose submission sits with a reviewer),
//! claims the attempt with a conditional update, picks the template tier,
//! and only then invokes the notifier, so two overlapping sweeps can never
//! double-send or double-log an attempt.
//!
//! Per-job errors are contained; a storage failure aborts the sweep and
//! surfaces to the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SweepConfig;
use crate::error::SchedulerError;
use crate::lifecycle::RequirementStatus;
use crate::models::reminder_job;
use crate::notify::{Notifier, NotifyContext};
use crate::repositories::email_log::DeliveryStatus;
use crate::repositories::reminder_job::FailureOutcome;
use crate::repositories::requirement::RequirementDetail;
use crate::repositories::{EmailLogRepository, ReminderJobRepository, RequirementRepository};
use crate::schedule::{self, TemplateKey};

/// Counters for one sweep, logged at the end of each pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepStats {
    pub examined: usize,
    pub sent: usize,
    pub escalated: usize,
    pub healed: usize,
    pub deferred: usize,
    pub failed: usize,
    pub refreshed: usize,
}

/// What one dispatch did to its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Escalated,
    /// The requirement no longer needs reminders; the job was completed.
    Healed,
    /// The submission is with a reviewer; the job stays active untouched.
    Deferred,
    /// A concurrent sweep claimed this attempt first.
    Lost,
}

/// Whether a due job's target still warrants a reminder.
enum Eligibility {
    Ready(RequirementDetail),
    /// Out of the nag set but only transiently (submitted, in review, or
    /// inside a validity window); nothing is sent and the job survives.
    Deferred,
    /// Valid, hidden, or archived target; the job was completed.
    Retired,
}

pub struct Dispatcher {
    requirements: RequirementRepository,
    jobs: ReminderJobRepository,
    email_log: EmailLogRepository,
    notifier: Arc<dyn Notifier>,
    sweep: SweepConfig,
    escalation_recipients: Vec<String>,
}

impl Dispatcher {
    pub fn new(
        requirements: RequirementRepository,
        jobs: ReminderJobRepository,
        email_log: EmailLogRepository,
        notifier: Arc<dyn Notifier>,
        sweep: SweepConfig,
        escalation_recipients: Vec<String>,
    ) -> Self {
        Self {
            requirements,
            jobs,
            email_log,
            notifier,
            sweep,
            escalation_recipients,
        }
    }

    /// Run the sweep loop until the token is cancelled. The first sweep
    /// fires immediately so a restart does not sit idle for a full tick.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let tick = std::time::Duration::from_secs(self.sweep.tick_interval_seconds);
        tracing::info!(
            tick_seconds = self.sweep.tick_interval_seconds,
            batch_size = self.sweep.batch_size,
            "reminder dispatcher started"
        );

        loop {
            match self.sweep(Utc::now()).await {
                Ok(stats) => {
                    if stats.examined > 0 || stats.refreshed > 0 {
                        tracing::info!(
                            examined = stats.examined,
                            sent = stats.sent,
                            escalated = stats.escalated,
                            healed = stats.healed,
                            deferred = stats.deferred,
                            failed = stats.failed,
                            refreshed = stats.refreshed,
                            "sweep finished"
                        );
                    }
                }
                Err(err) => {
                    metrics::counter!("doctrack_sweep_failures_total").increment(1);
                    tracing::error!(error = %err, "sweep aborted");
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("reminder dispatcher stopping");
                    break;
                }
                _ = tokio::time::sleep(tick) => {}
            }
        }
    }

    /// One pass over the due jobs plus the calendar-driven monthly refresh.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepStats, SchedulerError> {
        let mut stats = SweepStats::default();

        let due = self.jobs.due(now, self.sweep.batch_size).await?;
        stats.examined = due.len();

        for (job, requirement) in due {
            match self.dispatch_due(job, requirement, now).await {
                Ok(DispatchOutcome::Sent) => stats.sent += 1,
                Ok(DispatchOutcome::Escalated) => stats.escalated += 1,
                Ok(DispatchOutcome::Healed) => stats.healed += 1,
                Ok(DispatchOutcome::Deferred) => stats.deferred += 1,
                Ok(DispatchOutcome::Lost) => {}
                Err(SchedulerError::Infrastructure(err)) => {
                    return Err(SchedulerError::Infrastructure(err));
                }
                Err(err) => {
                    stats.failed += 1;
                    tracing::warn!(error = %err, "dispatch failed; job left for next sweep");
                }
            }
        }

        stats.refreshed = self.monthly_refresh(now).await?;

        metrics::counter!("doctrack_reminders_sent_total").increment(stats.sent as u64);
        metrics::counter!("doctrack_reminders_escalated_total").increment(stats.escalated as u64);
        Ok(stats)
    }

    /// Dispatch one reminder right now, bypassing `next_run_at`.
    ///
    /// Shares the atomic commit path with the sweep, so a racing sweep and
    /// a manual send still produce a single attempts increment. At the
    /// attempt ceiling this escalates, exactly as a sweep would.
    pub async fn send_immediate(
        &self,
        requirement_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, SchedulerError> {
        let job = self.jobs.get_live(requirement_id).await?;
        if job.state != schedule::JobState::Active.as_str() {
            return Err(SchedulerError::invalid_transition(
                "cannot send on a paused reminder job",
            ));
        }

        match self.eligible_detail(&job, now).await? {
            Eligibility::Ready(detail) => self.try_send(&job, &detail, now).await,
            Eligibility::Deferred => Err(SchedulerError::invalid_transition(
                "requirement is awaiting review; nothing to send",
            )),
            Eligibility::Retired => Err(SchedulerError::invalid_transition(
                "requirement no longer needs reminders; job completed",
            )),
        }
    }

    async fn dispatch_due(
        &self,
        job: reminder_job::Model,
        requirement: Option<crate::models::requirement::Model>,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, SchedulerError> {
        if requirement.is_none() {
            // Orphaned job; nothing left to nag about.
            self.jobs.complete_live(job.requirement_id).await?;
            return Ok(DispatchOutcome::Healed);
        }

        match self.eligible_detail(&job, now).await? {
            Eligibility::Ready(detail) => self.try_send(&job, &detail, now).await,
            Eligibility::Deferred => Ok(DispatchOutcome::Deferred),
            Eligibility::Retired => Ok(DispatchOutcome::Healed),
        }
    }

    /// Load the requirement detail, lazily recompute validity, and sort the
    /// target into the nag set, the defer set, or retirement.
    ///
    /// Only `valid`/`hidden` requirements and archived subcontractors retire
    /// the job; a submission sitting in review is deferred so a later
    /// rejection picks the same job back up.
    async fn eligible_detail(
        &self,
        job: &reminder_job::Model,
        now: DateTime<Utc>,
    ) -> Result<Eligibility, SchedulerError> {
        let mut detail = self.requirements.get_detail(job.requirement_id).await?;
        detail.requirement = self
            .requirements
            .refresh_validity(detail.requirement, &detail.document_type, now.date_naive())
            .await?;

        let status = RequirementStatus::parse(&detail.requirement.status)?;
        if detail.subcontractor.status != "active" {
            tracing::info!(
                job_id = %job.id,
                requirement_id = %job.requirement_id,
                "auto-completing reminder job for archived subcontractor"
            );
            self.jobs.complete_live(job.requirement_id).await?;
            return Ok(Eligibility::Retired);
        }
        if status.reminder_eligible() {
            return Ok(Eligibility::Ready(detail));
        }

        match status {
            RequirementStatus::Valid | RequirementStatus::Hidden => {
                tracing::info!(
                    job_id = %job.id,
                    requirement_id = %job.requirement_id,
                    status = %status,
                    "auto-completing reminder job for satisfied requirement"
                );
                self.jobs.complete_live(job.requirement_id).await?;
                Ok(Eligibility::Retired)
            }
            _ => {
                tracing::debug!(
                    job_id = %job.id,
                    requirement_id = %job.requirement_id,
                    status = %status,
                    "deferring reminder job while the requirement is out of the nag set"
                );
                Ok(Eligibility::Deferred)
            }
        }
    }

    /// Claim, send, and log one attempt. The claim precedes the notifier
    /// call, so a sweep that loses the claim sends nothing and logs
    /// nothing. A notifier failure releases the claim, is logged, counted
    /// toward quarantine, and returned as `Notifier` so the sweep can
    /// isolate it while the manual path surfaces it.
    async fn try_send(
        &self,
        job: &reminder_job::Model,
        detail: &RequirementDetail,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, SchedulerError> {
        let template = schedule::template_for_attempts(job.attempts, job.max_attempts);
        let context = NotifyContext {
            requirement_id: detail.requirement.id,
            subcontractor_id: detail.subcontractor.id,
            subcontractor_name: detail.subcontractor.name.clone(),
            document_type: detail.document_type.display_name.clone(),
            attempts: job.attempts,
        };

        if template == TemplateKey::Escalation {
            return self.escalate(job, detail, &context, now).await;
        }

        let next = schedule::next_run_at(job.created_at.with_timezone(&Utc), job.attempts + 1);
        if !self.jobs.claim_dispatch(job, next).await? {
            tracing::debug!(job_id = %job.id, "dispatch claim lost to concurrent sweep");
            return Ok(DispatchOutcome::Lost);
        }

        let to = detail.subcontractor.contact_email.as_str();
        match self.notifier.send(to, template, &context).await {
            Ok(_) => {
                self.email_log
                    .append(
                        detail.requirement.id,
                        detail.subcontractor.id,
                        to,
                        template,
                        DeliveryStatus::Sent,
                        now,
                    )
                    .await?;
                Ok(DispatchOutcome::Sent)
            }
            Err(err) => {
                self.email_log
                    .append(
                        detail.requirement.id,
                        detail.subcontractor.id,
                        to,
                        template,
                        DeliveryStatus::Failed,
                        now,
                    )
                    .await?;
                let outcome = self
                    .jobs
                    .release_claim(job, self.sweep.max_consecutive_failures)
                    .await?;
                if outcome == FailureOutcome::Quarantined {
                    metrics::counter!("doctrack_jobs_quarantined_total").increment(1);
                }
                Err(err)
            }
        }
    }

    /// The ladder is exhausted: notify internal staff and park the job in
    /// the escalated state. The subcontractor hears nothing further.
    async fn escalate(
        &self,
        job: &reminder_job::Model,
        detail: &RequirementDetail,
        context: &NotifyContext,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, SchedulerError> {
        for recipient in &self.escalation_recipients {
            match self
                .notifier
                .send(recipient, TemplateKey::Escalation, context)
                .await
            {
                Ok(_) => {
                    self.email_log
                        .append(
                            detail.requirement.id,
                            detail.subcontractor.id,
                            recipient,
                            TemplateKey::Escalation,
                            DeliveryStatus::Sent,
                            now,
                        )
                        .await?;
                }
                Err(err) => {
                    self.email_log
                        .append(
                            detail.requirement.id,
                            detail.subcontractor.id,
                            recipient,
                            TemplateKey::Escalation,
                            DeliveryStatus::Failed,
                            now,
                        )
                        .await?;
                    self.jobs
                        .record_failure(job, self.sweep.max_consecutive_failures)
                        .await?;
                    return Err(err);
                }
            }
        }

        if self.escalation_recipients.is_empty() {
            tracing::warn!(
                requirement_id = %detail.requirement.id,
                "no escalation recipients configured; escalating without notification"
            );
        }

        if self.jobs.escalate(job).await? {
            self.requirements.mark_escalated(detail.requirement.id).await?;
            Ok(DispatchOutcome::Escalated)
        } else {
            Ok(DispatchOutcome::Lost)
        }
    }

    /// Calendar-driven refresh nudge, independent of the attempt ladder.
    ///
    /// Fires only on the configured days of the month; a requirement that
    /// already received any successful send today is skipped so the refresh
    /// never stacks on top of a regular reminder.
    async fn monthly_refresh(&self, now: DateTime<Utc>) -> Result<usize, SchedulerError> {
        let today = now.date_naive();
        if !schedule::is_monthly_refresh_day(today) {
            return Ok(0);
        }

        let mut sent = 0;
        for (requirement, document_type) in
            self.requirements.list_monthly_refresh_targets().await?
        {
            if self.email_log.any_sent_on(requirement.id, today).await? {
                continue;
            }

            let detail = match self.requirements.detail_for(requirement).await {
                Ok(detail) => detail,
                Err(SchedulerError::Infrastructure(err)) => {
                    return Err(SchedulerError::Infrastructure(err));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "skipping monthly refresh target");
                    continue;
                }
            };
            if detail.subcontractor.status != "active" {
                continue;
            }

            let context = NotifyContext {
                requirement_id: detail.requirement.id,
                subcontractor_id: detail.subcontractor.id,
                subcontractor_name: detail.subcontractor.name.clone(),
                document_type: document_type.display_name.clone(),
                attempts: 0,
            };
            let to = detail.subcontractor.contact_email.as_str();
            let status = match self
                .notifier
                .send(to, TemplateKey::MonthlyRefresh, &context)
                .await
            {
                Ok(_) => {
                    sent += 1;
                    DeliveryStatus::Sent
                }
                Err(err) => {
                    tracing::warn!(
                        requirement_id = %detail.requirement.id,
                        error = %err,
                        "monthly refresh send failed"
                    );
                    DeliveryStatus::Failed
                }
            };
            self.email_log
                .append(
                    detail.requirement.id,
                    detail.subcontractor.id,
                    to,
                    TemplateKey::MonthlyRefresh,
                    status,
                    now,
                )
                .await?;
        }
        Ok(sent)
    }
}
