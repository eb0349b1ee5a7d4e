//! # Reminder Schedule
//!
//! The fixed reminder cadence, template tier selection, and the monthly
//! re-confirmation calendar. The cadence is an escalating ladder anchored
//! on job creation, not exponential backoff: sends land on days
//! 0, 3, 7, 14, 18 and 25 after the job was created.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SchedulerError;

/// Cumulative day offsets from job creation for each attempt.
pub const REMINDER_OFFSET_DAYS: [i64; 6] = [0, 3, 7, 14, 18, 25];

/// Calendar days of the month on which the monthly refresh trigger fires.
pub const MONTHLY_REFRESH_DAYS: [u32; 4] = [3, 10, 17, 24];

/// Reminders sent before the ladder escalates to internal staff.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// State of a reminder job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Active,
    Paused,
    Completed,
    Escalated,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Active => "active",
            JobState::Paused => "paused",
            JobState::Completed => "completed",
            JobState::Escalated => "escalated",
        }
    }

    pub fn parse(value: &str) -> Result<Self, SchedulerError> {
        match value {
            "active" => Ok(JobState::Active),
            "paused" => Ok(JobState::Paused),
            "completed" => Ok(JobState::Completed),
            "escalated" => Ok(JobState::Escalated),
            other => Err(SchedulerError::invalid_transition(format!(
                "unknown job state {:?}",
                other
            ))),
        }
    }

    /// Terminal states are never picked up by the dispatcher sweep.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Escalated)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Email template selected for one notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKey {
    InviteInitial,
    ReminderSoft,
    ReminderHard,
    Escalation,
    MonthlyRefresh,
}

impl TemplateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKey::InviteInitial => "invite_initial",
            TemplateKey::ReminderSoft => "reminder_soft",
            TemplateKey::ReminderHard => "reminder_hard",
            TemplateKey::Escalation => "escalation",
            TemplateKey::MonthlyRefresh => "monthly_refresh",
        }
    }
}

impl std::fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template tier for a dispatch, as a pure function of the attempt count
/// at send time.
pub fn template_for_attempts(attempts: i32, max_attempts: i32) -> TemplateKey {
    if attempts >= max_attempts {
        TemplateKey::Escalation
    } else if attempts == 0 {
        TemplateKey::InviteInitial
    } else if attempts <= 2 {
        TemplateKey::ReminderSoft
    } else {
        TemplateKey::ReminderHard
    }
}

/// Next due time for a job whose attempt counter just advanced to
/// `attempts`, anchored on the job's creation time so dispatch delays do
/// not drift the cadence.
///
/// Attempts beyond the fixed ladder continue at weekly steps; in practice
/// the escalation ceiling is reached well before that.
pub fn next_run_at(created_at: DateTime<Utc>, attempts: i32) -> DateTime<Utc> {
    let index = attempts.max(0) as usize;
    match REMINDER_OFFSET_DAYS.get(index) {
        Some(offset) => created_at + Duration::days(*offset),
        None => {
            let last = REMINDER_OFFSET_DAYS[REMINDER_OFFSET_DAYS.len() - 1];
            let extra = (index - (REMINDER_OFFSET_DAYS.len() - 1)) as i64;
            created_at + Duration::days(last + extra * 7)
        }
    }
}

/// Whether the monthly refresh trigger fires on this calendar day.
pub fn is_monthly_refresh_day(today: NaiveDate) -> bool {
    MONTHLY_REFRESH_DAYS.contains(&today.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn cadence_lands_on_literal_days() {
        let created = t0();
        let expected_days = [0, 3, 7, 14, 18, 25];
        for (attempts, days) in expected_days.iter().enumerate() {
            assert_eq!(
                next_run_at(created, attempts as i32),
                created + Duration::days(*days),
                "attempt {} should land on day {}",
                attempts,
                days
            );
        }
    }

    #[test]
    fn cadence_extends_weekly_past_the_ladder() {
        let created = t0();
        assert_eq!(next_run_at(created, 6), created + Duration::days(32));
        assert_eq!(next_run_at(created, 7), created + Duration::days(39));
    }

    #[test]
    fn template_tiers_follow_attempt_count() {
        assert_eq!(template_for_attempts(0, 5), TemplateKey::InviteInitial);
        assert_eq!(template_for_attempts(1, 5), TemplateKey::ReminderSoft);
        assert_eq!(template_for_attempts(2, 5), TemplateKey::ReminderSoft);
        assert_eq!(template_for_attempts(3, 5), TemplateKey::ReminderHard);
        assert_eq!(template_for_attempts(4, 5), TemplateKey::ReminderHard);
        assert_eq!(template_for_attempts(5, 5), TemplateKey::Escalation);
        assert_eq!(template_for_attempts(9, 5), TemplateKey::Escalation);
    }

    #[test]
    fn monthly_refresh_days_are_fixed() {
        let hits = [3u32, 10, 17, 24];
        for day in 1..=28u32 {
            let date = NaiveDate::from_ymd_opt(2025, 4, day).unwrap();
            assert_eq!(is_monthly_refresh_day(date), hits.contains(&day));
        }
    }

    #[test]
    fn job_state_round_trips() {
        for state in [
            JobState::Active,
            JobState::Paused,
            JobState::Completed,
            JobState::Escalated,
        ] {
            assert_eq!(JobState::parse(state.as_str()).unwrap(), state);
        }
        assert!(JobState::parse("stalled").is_err());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Escalated.is_terminal());
        assert!(!JobState::Paused.is_terminal());
    }
}
