//! # Data Models
//!
//! This module contains all the SeaORM entities used by the doctrack service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod document_type;
pub mod email_log;
pub mod reminder_job;
pub mod requirement;
pub mod subcontractor;

pub use document_type::Entity as DocumentType;
pub use email_log::Entity as EmailLog;
pub use reminder_job::Entity as ReminderJob;
pub use requirement::Entity as Requirement;
pub use subcontractor::Entity as Subcontractor;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "doctrack".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
