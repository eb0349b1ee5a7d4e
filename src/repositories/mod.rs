//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for database entities. Mutations publish domain events on
//! commit, and every state-changing write on reminder jobs goes through a
//! conditional update so concurrent sweeps and manual actions cannot
//! double-apply.

pub mod email_log;
pub mod reminder_job;
pub mod requirement;

pub use email_log::EmailLogRepository;
pub use reminder_job::ReminderJobRepository;
pub use requirement::RequirementRepository;
