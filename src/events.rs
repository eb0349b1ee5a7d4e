//! # Domain Events
//!
//! A broadcast channel publishing requirement and reminder-job mutations on
//! commit. UI-equivalents subscribe to react to changes; the core never
//! depends on any particular delivery mechanism, and a lagging or absent
//! subscriber never blocks a mutation.

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::lifecycle::RequirementStatus;
use crate::schedule::JobState;

/// Event emitted after a mutation has been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    RequirementChanged {
        requirement_id: Uuid,
        status: RequirementStatus,
    },
    ReminderJobChanged {
        job_id: Uuid,
        requirement_id: Uuid,
        state: JobState,
    },
}

/// Fan-out bus for [`DomainEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. A send error just means nobody is listening.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = DomainEvent::RequirementChanged {
            requirement_id: Uuid::new_v4(),
            status: RequirementStatus::Submitted,
        };
        bus.publish(event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        bus.publish(DomainEvent::ReminderJobChanged {
            job_id: Uuid::new_v4(),
            requirement_id: Uuid::new_v4(),
            state: JobState::Completed,
        });
    }
}
