use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::types::DocumentEvent;
use crate::document::OwnerId;

/// In-process change feed backed by `tokio::broadcast`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DocumentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish an event to all current subscribers. Returns how many
    /// receivers saw it; zero listeners is not an error.
    pub fn publish(&self, event: DocumentEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to the raw event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.sender.subscribe()
    }

    /// Call `handler` for every event concerning `owner` until the returned
    /// [`Subscription`] is unsubscribed or dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_owner<F>(&self, owner: OwnerId, handler: F) -> Subscription
    where
        F: Fn(DocumentEvent) + Send + Sync + 'static,
    {
        let mut rx = self.sender.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.owner_id == owner => handler(event),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%owner, skipped, "change listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription { task: Some(task) }
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Handle for an owner-filtered listener.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use crate::events::types::ChangeKind;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn event(owner: OwnerId) -> DocumentEvent {
        DocumentEvent::new(ChangeKind::Saved, owner, DocumentId::new())
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let owner = OwnerId::new();

        assert_eq!(bus.publish(event(owner)), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.owner_id, owner);
    }

    #[tokio::test]
    async fn publish_without_listeners_is_fine() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(event(OwnerId::new())), 0);
    }

    #[tokio::test]
    async fn owner_subscription_filters_other_owners() {
        let bus = EventBus::new(16);
        let mine = OwnerId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = bus.subscribe_owner(mine, move |e| {
            let _ = tx.send(e.owner_id);
        });

        bus.publish(event(OwnerId::new()));
        bus.publish(event(mine));

        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, mine);
        assert!(rx.try_recv().is_err());
        assert!(sub.is_active());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new(16);
        let owner = OwnerId::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let sub = bus.subscribe_owner(owner, move |_| {
            let _ = tx.send(());
        });
        assert_eq!(bus.subscriber_count(), 1);

        sub.unsubscribe();
        // The aborted task drops its sender, closing the channel.
        assert!(rx.recv().await.is_none());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
