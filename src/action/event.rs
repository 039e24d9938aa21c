use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, strum::Display)]
pub enum SkipReason {
    AlreadyPending,
    Throttled,
    ConditionFalse,
}

/// Lifecycle notifications published by the engine for every dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEvent {
    Started {
        execution_id: String,
        action_type: String,
    },
    Skipped {
        action_type: String,
        reason: SkipReason,
    },
    Retrying {
        execution_id: String,
        action_type: String,
        attempt: u32,
        delay: Duration,
    },
    Succeeded {
        execution_id: String,
        action_type: String,
        duration: Duration,
    },
    Failed {
        execution_id: String,
        action_type: String,
        message: String,
    },
}

impl ActionEvent {
    pub fn action_type(&self) -> &str {
        match self {
            ActionEvent::Started { action_type, .. }
            | ActionEvent::Skipped { action_type, .. }
            | ActionEvent::Retrying { action_type, .. }
            | ActionEvent::Succeeded { action_type, .. }
            | ActionEvent::Failed { action_type, .. } => action_type,
        }
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Failed to send event: {message}")]
    SendFailed { message: String },
    #[error("Failed to receive event: {message}")]
    ReceiveFailed { message: String },
    #[error("Receiver lagged behind by {count} events")]
    Lagged { count: u64 },
}

pub type EventResult<T> = Result<T, EventError>;

pub struct ActionEventBus {
    sender: broadcast::Sender<ActionEvent>,
}

impl ActionEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> ActionEventReceiver {
        ActionEventReceiver::new(self.sender.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Fails only when nobody is subscribed.
    pub fn publish(&self, event: ActionEvent) -> EventResult<()> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|e| EventError::SendFailed {
                message: e.to_string(),
            })
    }
}

pub struct ActionEventReceiver {
    receiver: broadcast::Receiver<ActionEvent>,
}

impl ActionEventReceiver {
    fn new(receiver: broadcast::Receiver<ActionEvent>) -> Self {
        Self { receiver }
    }

    /// Receives the next event. On lag the receiver resubscribes and reports
    /// how many events were skipped.
    pub async fn recv(&mut self) -> EventResult<ActionEvent> {
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                self.receiver = self.receiver.resubscribe();
                Err(EventError::Lagged { count: n })
            }
            Err(e) => Err(EventError::ReceiveFailed {
                message: e.to_string(),
            }),
        }
    }

    pub fn try_recv(&mut self) -> Option<ActionEvent> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = ActionEventBus::new(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(ActionEvent::Skipped {
            action_type: "navigate".into(),
            reason: SkipReason::Throttled,
        })
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.action_type(), "navigate");
    }

    #[test]
    fn test_publish_without_subscribers_fails() {
        let bus = ActionEventBus::new(8);
        let result = bus.publish(ActionEvent::Started {
            execution_id: "1".into(),
            action_type: "vibrate".into(),
        });
        assert!(matches!(result, Err(EventError::SendFailed { .. })));
    }

    #[tokio::test]
    async fn test_lagged_receiver_recovers() {
        let bus = ActionEventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.publish(ActionEvent::Started {
                execution_id: i.to_string(),
                action_type: "log".into(),
            })
            .unwrap();
        }
        assert!(matches!(rx.recv().await, Err(EventError::Lagged { .. })));

        bus.publish(ActionEvent::Started {
            execution_id: "next".into(),
            action_type: "log".into(),
        })
        .unwrap();
        assert!(rx.recv().await.is_ok());
    }
}
