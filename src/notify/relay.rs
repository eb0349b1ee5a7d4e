//! Mail relay notifier.
//!
//! Posts one JSON payload per notification to the configured HTTPS relay
//! endpoint. Transport-level retries are kept short; scheduling-level
//! retries belong to the dispatcher, which re-runs a failed attempt on the
//! next sweep.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::NotifierConfig;
use crate::error::SchedulerError;
use crate::schedule::TemplateKey;

use super::{Notifier, NotifyContext, SendReceipt};

const MAX_TRANSPORT_RETRIES: u32 = 3;
const MAX_URL_LENGTH: usize = 2048;

/// Notifier implementation backed by an HTTPS mail relay webhook.
pub struct RelayNotifier {
    client: Client,
    relay_url: String,
}

impl RelayNotifier {
    /// Create a relay notifier; fails when the configured URL is unusable.
    pub fn new(config: &NotifierConfig) -> Result<Self, SchedulerError> {
        let relay_url = config
            .relay_url
            .clone()
            .ok_or_else(|| SchedulerError::Notifier("relay URL not configured".to_string()))?;

        if relay_url.len() > MAX_URL_LENGTH || !relay_url.to_lowercase().starts_with("https://") {
            return Err(SchedulerError::Notifier(format!(
                "relay URL must be https and at most {} characters",
                MAX_URL_LENGTH
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| SchedulerError::Notifier(format!("failed to build client: {err}")))?;

        Ok(Self { client, relay_url })
    }

    /// Relay URL with credentials and path stripped, for log lines.
    fn redacted_target(&self) -> String {
        self.relay_url
            .split('/')
            .take(3)
            .collect::<Vec<_>>()
            .join("/")
    }

    fn build_payload(
        &self,
        to: &str,
        template: TemplateKey,
        context: &NotifyContext,
    ) -> serde_json::Value {
        json!({
            "to": to,
            "template_key": template.as_str(),
            "context": context,
        })
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn send(
        &self,
        to: &str,
        template: TemplateKey,
        context: &NotifyContext,
    ) -> Result<SendReceipt, SchedulerError> {
        let payload = self.build_payload(to, template, context);
        let mut delay = Duration::from_secs(1);

        for attempt in 1..=MAX_TRANSPORT_RETRIES {
            match self.client.post(&self.relay_url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(
                        requirement_id = %context.requirement_id,
                        template = %template,
                        target = %self.redacted_target(),
                        attempt,
                        "Notification accepted by relay"
                    );
                    let id = response
                        .json::<serde_json::Value>()
                        .await
                        .ok()
                        .and_then(|body| {
                            body.get("id")
                                .and_then(|v| v.as_str())
                                .and_then(|s| Uuid::parse_str(s).ok())
                        })
                        .unwrap_or_else(Uuid::new_v4);
                    return Ok(SendReceipt { id });
                }
                Ok(response) => {
                    warn!(
                        requirement_id = %context.requirement_id,
                        status = %response.status(),
                        attempt,
                        "Relay returned error status"
                    );
                    if attempt == MAX_TRANSPORT_RETRIES {
                        return Err(SchedulerError::Notifier(format!(
                            "relay returned status {} after {} attempts",
                            response.status(),
                            MAX_TRANSPORT_RETRIES
                        )));
                    }
                }
                Err(err) => {
                    warn!(
                        requirement_id = %context.requirement_id,
                        error = %err,
                        attempt,
                        "Relay request failed"
                    );
                    if attempt == MAX_TRANSPORT_RETRIES {
                        return Err(SchedulerError::Notifier(format!(
                            "relay unreachable after {} attempts: {}",
                            MAX_TRANSPORT_RETRIES, err
                        )));
                    }
                }
            }

            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        Err(SchedulerError::Notifier("relay retries exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifierConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> NotifyContext {
        NotifyContext {
            requirement_id: Uuid::new_v4(),
            subcontractor_id: Uuid::new_v4(),
            subcontractor_name: "Acme Roofing".to_string(),
            document_type: "Liability Insurance".to_string(),
            attempts: 2,
        }
    }

    #[test]
    fn rejects_non_https_relay() {
        let config = NotifierConfig {
            relay_url: Some("http://relay.internal/send".to_string()),
            timeout_seconds: 5,
        };
        assert!(RelayNotifier::new(&config).is_err());
    }

    #[test]
    fn rejects_missing_relay_url() {
        let config = NotifierConfig {
            relay_url: None,
            timeout_seconds: 5,
        };
        assert!(RelayNotifier::new(&config).is_err());
    }

    // wiremock serves plain http; exercise the send path by constructing the
    // notifier directly against the mock's URI.
    fn test_notifier(uri: &str) -> RelayNotifier {
        RelayNotifier {
            client: Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
            relay_url: format!("{}/send", uri),
        }
    }

    #[tokio::test]
    async fn posts_template_and_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(body_partial_json(serde_json::json!({
                "to": "billing@acme.example",
                "template_key": "reminder_soft",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": Uuid::new_v4(),
                "status": "queued",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = test_notifier(&server.uri());
        let receipt = notifier
            .send("billing@acme.example", TemplateKey::ReminderSoft, &context())
            .await
            .expect("send succeeds");
        assert!(!receipt.id.is_nil());
    }

    #[tokio::test]
    async fn surfaces_relay_errors_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let notifier = test_notifier(&server.uri());
        let err = notifier
            .send("billing@acme.example", TemplateKey::ReminderHard, &context())
            .await
            .expect_err("send fails");
        assert!(matches!(err, SchedulerError::Notifier(_)));
    }
}
