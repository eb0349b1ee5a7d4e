//! # Requirement Lifecycle
//!
//! The state machine governing one (subcontractor, document type)
//! obligation, plus the pure validity recomputation that demotes approved
//! documents as their validity window runs out.
//!
//! Rejection is a first-class `rejected` state rather than a reason-string
//! overlay on `missing`; a fresh upload clears it explicitly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SchedulerError;

/// Lifecycle status of a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Missing,
    Submitted,
    InReview,
    Valid,
    Expiring,
    Expired,
    Rejected,
    Hidden,
}

impl RequirementStatus {
    /// Stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementStatus::Missing => "missing",
            RequirementStatus::Submitted => "submitted",
            RequirementStatus::InReview => "in_review",
            RequirementStatus::Valid => "valid",
            RequirementStatus::Expiring => "expiring",
            RequirementStatus::Expired => "expired",
            RequirementStatus::Rejected => "rejected",
            RequirementStatus::Hidden => "hidden",
        }
    }

    /// Parse the stored string representation.
    pub fn parse(value: &str) -> Result<Self, SchedulerError> {
        match value {
            "missing" => Ok(RequirementStatus::Missing),
            "submitted" => Ok(RequirementStatus::Submitted),
            "in_review" => Ok(RequirementStatus::InReview),
            "valid" => Ok(RequirementStatus::Valid),
            "expiring" => Ok(RequirementStatus::Expiring),
            "expired" => Ok(RequirementStatus::Expired),
            "rejected" => Ok(RequirementStatus::Rejected),
            "hidden" => Ok(RequirementStatus::Hidden),
            other => Err(SchedulerError::invalid_transition(format!(
                "unknown requirement status {:?}",
                other
            ))),
        }
    }

    /// Whether reminder jobs may fire for a requirement in this status.
    pub fn reminder_eligible(&self) -> bool {
        matches!(self, RequirementStatus::Missing | RequirementStatus::Rejected)
    }

    /// Whether the requirement counts toward compliance aggregates.
    pub fn is_tracked(&self) -> bool {
        !matches!(self, RequirementStatus::Hidden)
    }
}

impl std::fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload of a new document. Permitted from every tracked state; a new
/// document supersedes whatever was there before and clears any rejection.
pub fn upload(current: RequirementStatus) -> Result<RequirementStatus, SchedulerError> {
    match current {
        RequirementStatus::Hidden => Err(SchedulerError::invalid_transition(
            "requirement has been withdrawn",
        )),
        _ => Ok(RequirementStatus::Submitted),
    }
}

/// A reviewer picked the submission up.
pub fn start_review(current: RequirementStatus) -> Result<RequirementStatus, SchedulerError> {
    match current {
        RequirementStatus::Submitted => Ok(RequirementStatus::InReview),
        other => Err(SchedulerError::invalid_transition(format!(
            "cannot start review from status {}",
            other
        ))),
    }
}

/// Reviewer approval. An expiry date is mandatory unless the document type
/// never expires; the component rejects a missing date instead of
/// defaulting one.
pub fn approve(
    current: RequirementStatus,
    valid_to: Option<NaiveDate>,
    does_not_expire: bool,
) -> Result<RequirementStatus, SchedulerError> {
    match current {
        RequirementStatus::Submitted | RequirementStatus::InReview => {
            if valid_to.is_none() && !does_not_expire {
                return Err(SchedulerError::invalid_transition(
                    "approval requires an expiry date for this document type",
                ));
            }
            Ok(RequirementStatus::Valid)
        }
        other => Err(SchedulerError::invalid_transition(format!(
            "cannot approve from status {}",
            other
        ))),
    }
}

/// Reviewer rejection.
pub fn reject(current: RequirementStatus) -> Result<RequirementStatus, SchedulerError> {
    match current {
        RequirementStatus::Submitted | RequirementStatus::InReview => {
            Ok(RequirementStatus::Rejected)
        }
        other => Err(SchedulerError::invalid_transition(format!(
            "cannot reject from status {}",
            other
        ))),
    }
}

/// Staff withdrew the requirement. Hidden requirements stop generating
/// reminders and drop out of compliance aggregates.
pub fn withdraw(current: RequirementStatus) -> Result<RequirementStatus, SchedulerError> {
    match current {
        RequirementStatus::Hidden => Err(SchedulerError::invalid_transition(
            "requirement already withdrawn",
        )),
        _ => Ok(RequirementStatus::Hidden),
    }
}

/// Recompute the time-driven status of an approved requirement.
///
/// Returns `Some(new_status)` only when the stored status must change, so
/// callers write back if and only if something moved. Idempotent; never
/// touches requirements without a validity window or whose document type
/// never expires.
pub fn recompute_validity(
    status: RequirementStatus,
    valid_to: Option<NaiveDate>,
    does_not_expire: bool,
    expiry_lead_days: i64,
    today: NaiveDate,
) -> Option<RequirementStatus> {
    if does_not_expire {
        return None;
    }
    if !matches!(status, RequirementStatus::Valid | RequirementStatus::Expiring) {
        return None;
    }
    let valid_to = valid_to?;

    let next = if today >= valid_to {
        RequirementStatus::Expired
    } else if today + chrono::Duration::days(expiry_lead_days) >= valid_to {
        RequirementStatus::Expiring
    } else {
        RequirementStatus::Valid
    };

    if next == status {
        None
    } else {
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn upload_clears_rejection_path() {
        assert_eq!(
            upload(RequirementStatus::Rejected).unwrap(),
            RequirementStatus::Submitted
        );
        assert_eq!(
            upload(RequirementStatus::Expired).unwrap(),
            RequirementStatus::Submitted
        );
        assert!(upload(RequirementStatus::Hidden).is_err());
    }

    #[test]
    fn approve_requires_expiry_date() {
        let err = approve(RequirementStatus::Submitted, None, false).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidTransition { .. }));

        // Non-expiring document types approve without a date.
        assert_eq!(
            approve(RequirementStatus::InReview, None, true).unwrap(),
            RequirementStatus::Valid
        );

        assert_eq!(
            approve(RequirementStatus::Submitted, Some(date(2026, 1, 1)), false).unwrap(),
            RequirementStatus::Valid
        );
    }

    #[test]
    fn approve_only_from_review_states() {
        assert!(approve(RequirementStatus::Missing, Some(date(2026, 1, 1)), false).is_err());
        assert!(approve(RequirementStatus::Valid, Some(date(2026, 1, 1)), false).is_err());
    }

    #[test]
    fn reject_only_from_review_states() {
        assert_eq!(
            reject(RequirementStatus::InReview).unwrap(),
            RequirementStatus::Rejected
        );
        assert!(reject(RequirementStatus::Missing).is_err());
    }

    #[test]
    fn withdraw_from_any_tracked_state() {
        for status in [
            RequirementStatus::Missing,
            RequirementStatus::Submitted,
            RequirementStatus::Valid,
            RequirementStatus::Expired,
        ] {
            assert_eq!(withdraw(status).unwrap(), RequirementStatus::Hidden);
        }
        assert!(withdraw(RequirementStatus::Hidden).is_err());
    }

    #[test]
    fn recompute_demotes_valid_to_expiring_within_lead_window() {
        let valid_to = date(2025, 7, 15);
        // 30 days out exactly: inside the lead window.
        assert_eq!(
            recompute_validity(
                RequirementStatus::Valid,
                Some(valid_to),
                false,
                30,
                date(2025, 6, 15)
            ),
            Some(RequirementStatus::Expiring)
        );
        // 31 days out: still comfortably valid.
        assert_eq!(
            recompute_validity(
                RequirementStatus::Valid,
                Some(valid_to),
                false,
                30,
                date(2025, 6, 14)
            ),
            None
        );
    }

    #[test]
    fn recompute_expires_at_valid_to() {
        let valid_to = date(2025, 7, 15);
        assert_eq!(
            recompute_validity(
                RequirementStatus::Expiring,
                Some(valid_to),
                false,
                30,
                valid_to
            ),
            Some(RequirementStatus::Expired)
        );
        assert_eq!(
            recompute_validity(
                RequirementStatus::Valid,
                Some(valid_to),
                false,
                30,
                date(2025, 8, 1)
            ),
            Some(RequirementStatus::Expired)
        );
    }

    #[test]
    fn recompute_is_idempotent() {
        let valid_to = date(2025, 7, 15);
        let today = date(2025, 6, 20);
        let first = recompute_validity(
            RequirementStatus::Valid,
            Some(valid_to),
            false,
            30,
            today,
        )
        .unwrap();
        // Running again from the new status changes nothing.
        assert_eq!(
            recompute_validity(first, Some(valid_to), false, 30, today),
            None
        );
    }

    #[test]
    fn recompute_skips_non_expiring_and_windowless() {
        assert_eq!(
            recompute_validity(RequirementStatus::Valid, None, false, 30, date(2025, 1, 1)),
            None
        );
        assert_eq!(
            recompute_validity(
                RequirementStatus::Valid,
                Some(date(2020, 1, 1)),
                true,
                30,
                date(2025, 1, 1)
            ),
            None
        );
        // Only valid/expiring are ever touched.
        assert_eq!(
            recompute_validity(
                RequirementStatus::Missing,
                Some(date(2020, 1, 1)),
                false,
                30,
                date(2025, 1, 1)
            ),
            None
        );
    }
}
