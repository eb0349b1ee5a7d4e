//! # Notifier Boundary
//!
//! The external notification collaborator. The core only requires an
//! at-least-once contract: `send` reports success or failure synchronously
//! and may be retried by the next sweep. Template rendering, queuing, and
//! actual SMTP delivery live behind the relay.

pub mod relay;

pub use relay::RelayNotifier;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::schedule::TemplateKey;

/// Context handed to the notifier alongside the template key.
#[derive(Debug, Clone, Serialize)]
pub struct NotifyContext {
    pub requirement_id: Uuid,
    pub subcontractor_id: Uuid,
    pub subcontractor_name: String,
    pub document_type: String,
    /// Attempt count at send time; lets the relay render "reminder 3 of 5".
    pub attempts: i32,
}

/// Receipt returned by a successful send.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub id: Uuid,
}

/// Outbound notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification. Must be safe to call at-least-once per
    /// logical attempt; the dispatcher records the outcome either way.
    async fn send(
        &self,
        to: &str,
        template: TemplateKey,
        context: &NotifyContext,
    ) -> Result<SendReceipt, SchedulerError>;
}

/// Notifier used when no relay is configured (local profile): logs the
/// would-be send and reports success.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(
        &self,
        to: &str,
        template: TemplateKey,
        context: &NotifyContext,
    ) -> Result<SendReceipt, SchedulerError> {
        tracing::info!(
            to = %to,
            template = %template,
            requirement_id = %context.requirement_id,
            attempts = context.attempts,
            "Logging-only notifier invoked"
        );
        Ok(SendReceipt { id: Uuid::new_v4() })
    }
}
