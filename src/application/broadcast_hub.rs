//! Fan-out of observer events with snapshot-on-subscribe.
//!
//! ```text
//!  ConnectionController ─┐                      ┌── observer a
//!  MessageDispatcher ────┼──▶ BroadcastHub ─────┼── observer b
//!  DemoSimulator ────────┘   (snapshot + chan)  └── observer c
//! ```
//!
//! Observers only see events published while they are attached. The one
//! exception is the connection snapshot, which each new subscription gets
//! up front. Snapshot updates and their events are published under the
//! same lock that subscription takes, so a new observer either sees the
//! old snapshot followed by the event, or the new snapshot alone.

use tokio::sync::{broadcast, RwLock};

use crate::domain::messaging::{ConnectionSnapshot, ConnectionState, ObserverEvent};

/// Buffered events per observer before slow ones start lagging.
pub const DEFAULT_HUB_CAPACITY: usize = 256;

pub struct BroadcastHub {
    sender: broadcast::Sender<ObserverEvent>,
    snapshot: RwLock<ConnectionSnapshot>,
}

/// A new observer's view: what to replay first, then the live stream.
pub struct Subscription {
    pub initial: Vec<ObserverEvent>,
    pub receiver: broadcast::Receiver<ObserverEvent>,
}

impl BroadcastHub {
    pub fn new(capacity: usize, demo_mode: bool) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            snapshot: RwLock::new(ConnectionSnapshot {
                demo_mode,
                ..ConnectionSnapshot::default()
            }),
        }
    }

    pub fn with_default_capacity(demo_mode: bool) -> Self {
        Self::new(DEFAULT_HUB_CAPACITY, demo_mode)
    }

    /// Sends an event to every attached observer. Never blocks.
    pub fn publish(&self, event: ObserverEvent) {
        tracing::trace!(event = event.name(), "Publishing observer event");
        // No receivers is fine.
        let _ = self.sender.send(event);
    }

    /// Records a state change and announces it.
    ///
    /// `leading` events go out before the `connection-state` event.
    pub async fn publish_state(
        &self,
        state: ConnectionState,
        challenge: Option<String>,
        leading: Vec<ObserverEvent>,
    ) {
        let mut snapshot = self.snapshot.write().await;
        snapshot.state = state;
        snapshot.challenge = challenge;

        for event in leading {
            self.publish(event);
        }
        self.publish(ObserverEvent::connection_state(state, snapshot.demo_mode));
    }

    /// Attaches a new observer.
    pub async fn subscribe(&self) -> Subscription {
        let snapshot = self.snapshot.read().await;
        let receiver = self.sender.subscribe();
        Subscription {
            initial: snapshot.to_events(),
            receiver,
        }
    }

    pub async fn snapshot(&self) -> ConnectionSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Number of observers currently attached.
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::with_default_capacity(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::messaging::SendOutcome;

    #[tokio::test]
    async fn all_attached_observers_receive_events() {
        let hub = BroadcastHub::default();
        let mut a = hub.subscribe().await.receiver;
        let mut b = hub.subscribe().await.receiver;

        hub.publish(ObserverEvent::error("boom"));

        assert_eq!(a.recv().await.unwrap().name(), "error");
        assert_eq!(b.recv().await.unwrap().name(), "error");
    }

    #[tokio::test]
    async fn late_observer_misses_earlier_events_but_gets_snapshot() {
        let hub = BroadcastHub::default();
        hub.publish(ObserverEvent::progress(1, 3, SendOutcome::default()));

        let mut sub = hub.subscribe().await;
        assert_eq!(sub.initial.len(), 1);
        assert_eq!(sub.initial[0].name(), "connection-state");
        assert!(sub.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn snapshot_includes_pending_challenge() {
        let hub = BroadcastHub::with_default_capacity(true);
        hub.publish_state(
            ConnectionState::AwaitingScan,
            Some("encoded".into()),
            vec![ObserverEvent::qr("encoded")],
        )
        .await;

        let sub = hub.subscribe().await;
        assert_eq!(
            sub.initial,
            vec![
                ObserverEvent::connection_state(ConnectionState::AwaitingScan, true),
                ObserverEvent::qr("encoded"),
            ]
        );
    }

    #[tokio::test]
    async fn publish_state_sends_leading_events_first() {
        let hub = BroadcastHub::default();
        let mut rx = hub.subscribe().await.receiver;

        hub.publish_state(
            ConnectionState::Connected,
            None,
            vec![ObserverEvent::connected("up")],
        )
        .await;

        assert_eq!(rx.recv().await.unwrap().name(), "connected");
        assert_eq!(
            rx.recv().await.unwrap(),
            ObserverEvent::connection_state(ConnectionState::Connected, false)
        );
        assert_eq!(hub.snapshot().await.state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn observer_count_tracks_subscriptions() {
        let hub = BroadcastHub::default();
        assert_eq!(hub.observer_count(), 0);
        let sub = hub.subscribe().await;
        assert_eq!(hub.observer_count(), 1);
        drop(sub);
        assert_eq!(hub.observer_count(), 0);
    }
}
