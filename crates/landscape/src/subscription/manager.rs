use crate::config::DEFAULT_OUTPUT_CAPACITY;
use crate::error::LandscapeError;
use crate::subscription::filter::{SubscriptionFilter, SubscriptionOption};
use crate::subscription::{SharedState, Subscription, SubscriptionState};
use landscape_bus::{EventBus, Listener};
use landscape_types::LandscapeEvent;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Opens subscriptions over a shared bus.
#[derive(Debug)]
pub struct SubscriptionManager {
    bus: Arc<EventBus>,
    output_capacity: usize,
    next_id: AtomicU64,
    active: Arc<AtomicUsize>,
}

impl SubscriptionManager {
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self::with_output_capacity(bus, DEFAULT_OUTPUT_CAPACITY)
    }

    /// `output_capacity` bounds the events buffered between the forwarding
    /// task and the caller (at least 1).
    #[must_use]
    pub fn with_output_capacity(bus: Arc<EventBus>, output_capacity: usize) -> Self {
        Self {
            bus,
            output_capacity: output_capacity.max(1),
            next_id: AtomicU64::new(0),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Open a subscription.
    ///
    /// The bus listener is attached before this returns, so every event
    /// published afterwards is seen. The subscription ends when `cancel`
    /// (or the handle's own [`Subscription::cancel`]) fires, when the handle
    /// is dropped, or when the bus closes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe<I>(&self, cancel: &CancellationToken, options: I) -> Subscription
    where
        I: IntoIterator<Item = SubscriptionOption>,
    {
        let filter = SubscriptionFilter::from_options(options);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = self.bus.new_listener();
        let (tx, rx) = mpsc::channel(self.output_capacity);
        let token = cancel.child_token();
        let state = Arc::new(SharedState::default());

        self.active.fetch_add(1, Ordering::AcqRel);
        debug!(
            subscription = id,
            listener = listener.id(),
            boards = ?filter.board_ids().collect::<Vec<_>>(),
            "Subscription opened"
        );

        let guard = CloseGuard {
            id,
            state: state.clone(),
            active: self.active.clone(),
        };
        tokio::spawn(forward(
            id,
            listener,
            filter.clone(),
            token.clone(),
            tx,
            guard,
        ));

        Subscription::new(id, rx, token, state, filter)
    }

    /// Subscriptions whose forwarding task has not finished.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }
}

/// Marks a subscription `Closed` when its task ends, however it ends.
struct CloseGuard {
    id: u64,
    state: Arc<SharedState>,
    active: Arc<AtomicUsize>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.state.advance(SubscriptionState::Closed);
        self.active.fetch_sub(1, Ordering::AcqRel);
        debug!(subscription = self.id, "Subscription closed");
    }
}

/// Why a forwarding loop stopped.
#[derive(Debug, Clone, Copy)]
enum ExitReason {
    Cancelled,
    CallerGone,
    BusClosed,
    LifecycleViolation,
}

async fn forward(
    id: u64,
    mut listener: Listener,
    filter: SubscriptionFilter,
    cancel: CancellationToken,
    tx: mpsc::Sender<LandscapeEvent>,
    guard: CloseGuard,
) {
    let reason = loop {
        let envelope = tokio::select! {
            biased;
            () = cancel.cancelled() => break ExitReason::Cancelled,
            () = tx.closed() => break ExitReason::CallerGone,
            next = listener.recv() => match next {
                Some(envelope) => envelope,
                None => break ExitReason::BusClosed,
            },
        };

        let event = match envelope.into_event() {
            Ok(event) => event,
            Err(source) => {
                let err = LandscapeError::ListenerLifecycle {
                    listener: listener.id(),
                    source,
                };
                error!(subscription = id, error = %err, "Terminating subscription");
                break ExitReason::LifecycleViolation;
            }
        };

        if !filter.matches(&event) {
            continue;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break ExitReason::Cancelled,
            sent = tx.send(event) => {
                if sent.is_err() {
                    break ExitReason::CallerGone;
                }
            }
        }
    };

    guard.state.advance(SubscriptionState::Closing);
    debug!(subscription = id, ?reason, dropped = listener.dropped(), "Subscription closing");
    listener.close();
    drop(tx);
    drop(guard);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::with_boards;
    use landscape_bus::{BusEnvelope, EventPublisher, PROTOCOL_VERSION};
    use landscape_types::{BoardId, MembershipChange, PeerId, PEER_ID_LEN};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    const WAIT: Duration = Duration::from_secs(2);

    fn event(board: &str, n: u8) -> LandscapeEvent {
        LandscapeEvent::MembershipChanged {
            board: BoardId::from(board),
            peer: PeerId::from_digest([n; PEER_ID_LEN]),
            change: MembershipChange::Joined,
        }
    }

    fn manager() -> SubscriptionManager {
        SubscriptionManager::new(Arc::new(EventBus::new()))
    }

    async fn wait_closed(manager: &SubscriptionManager, sub: &Subscription) {
        timeout(WAIT, async {
            while sub.state() != SubscriptionState::Closed || manager.active_subscriptions() != 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscription did not close in time");
    }

    #[tokio::test]
    async fn test_unfiltered_receives_everything() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let mut sub = manager.subscribe(&cancel, []);

        manager.bus().publish(event("P1", 1));
        manager.bus().publish(event("P2", 2));

        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), Some(event("P1", 1)));
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), Some(event("P2", 2)));
    }

    #[tokio::test]
    async fn test_filtered_drops_other_boards() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let mut p2 = manager.subscribe(&cancel, [with_boards(["P2"])]);

        manager.bus().publish(event("P1", 1));
        manager.bus().publish(event("P2", 2));

        assert_eq!(timeout(WAIT, p2.recv()).await.unwrap(), Some(event("P2", 2)));
    }

    #[tokio::test]
    async fn test_cancel_ends_stream_and_releases_listener() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let mut sub = manager.subscribe(&cancel, []);
        assert_eq!(manager.bus().listener_count(), 1);
        assert_eq!(sub.state(), SubscriptionState::Open);

        cancel.cancel();
        cancel.cancel();

        let end = timeout(WAIT, sub.recv()).await.expect("stream must end");
        assert_eq!(end, None);
        wait_closed(&manager, &sub).await;
        assert_eq!(manager.bus().listener_count(), 0);
        assert!(sub.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_discards_buffered_events() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let mut sub = manager.subscribe(&cancel, []);

        for n in 0..10 {
            manager.bus().publish(event("P1", n));
        }
        // Let the forwarding task fill the output channel.
        tokio::time::sleep(Duration::from_millis(50)).await;

        cancel.cancel();
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), None);
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cancelled_stream_yields_nothing() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let mut sub = manager.subscribe(&cancel, []);

        manager.bus().publish(event("P1", 1));
        tokio::time::sleep(Duration::from_millis(50)).await;

        sub.cancel();
        assert_eq!(timeout(WAIT, sub.next()).await.unwrap(), None);
        wait_closed(&manager, &sub).await;
    }

    #[tokio::test]
    async fn test_handle_cancel_leaves_parent_token_alone() {
        let manager = manager();
        let parent = CancellationToken::new();
        let mut first = manager.subscribe(&parent, []);
        let mut second = manager.subscribe(&parent, []);

        first.cancel();
        first.cancel();
        assert_eq!(timeout(WAIT, first.recv()).await.unwrap(), None);
        assert!(!parent.is_cancelled());

        manager.bus().publish(event("P1", 1));
        assert_eq!(timeout(WAIT, second.recv()).await.unwrap(), Some(event("P1", 1)));
    }

    #[tokio::test]
    async fn test_dropping_handle_releases_listener() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let sub = manager.subscribe(&cancel, []);
        assert_eq!(manager.active_subscriptions(), 1);
        drop(sub);

        timeout(WAIT, async {
            while manager.bus().listener_count() != 0 || manager.active_subscriptions() != 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("listener leaked");
    }

    #[tokio::test]
    async fn test_cancel_while_caller_not_reading() {
        // Output channel of one, nobody reading: the task blocks on delivery
        // and must still observe cancellation.
        let manager = SubscriptionManager::with_output_capacity(Arc::new(EventBus::new()), 1);
        let cancel = CancellationToken::new();
        let sub = manager.subscribe(&cancel, []);

        for n in 0..10 {
            manager.bus().publish(event("P1", n));
        }
        tokio::task::yield_now().await;

        cancel.cancel();
        wait_closed(&manager, &sub).await;
        assert_eq!(manager.bus().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_bus_close_ends_stream() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let mut sub = manager.subscribe(&cancel, []);

        manager.bus().publish(event("P1", 1));
        manager.bus().close();

        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), Some(event("P1", 1)));
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), None);
        wait_closed(&manager, &sub).await;
    }

    #[tokio::test]
    async fn test_foreign_envelope_terminates_only_that_subscription() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let mut a = manager.subscribe(&cancel, []);
        let mut b = manager.subscribe(&cancel, []);

        // Each subscription rejects the foreign envelope on its own.
        manager.bus().publish_envelope(BusEnvelope {
            version: PROTOCOL_VERSION + 1,
            ..BusEnvelope::new(event("P1", 1))
        });

        assert_eq!(timeout(WAIT, a.recv()).await.unwrap(), None);
        assert_eq!(timeout(WAIT, b.recv()).await.unwrap(), None);

        // A fresh subscription is unaffected.
        let mut c = manager.subscribe(&cancel, []);
        manager.bus().publish(event("P1", 2));
        assert_eq!(timeout(WAIT, c.recv()).await.unwrap(), Some(event("P1", 2)));
    }

    #[tokio::test]
    async fn test_subscription_as_stream() {
        let manager = manager();
        let cancel = CancellationToken::new();
        let sub = manager.subscribe(&cancel, [with_boards(["P1"])]);

        for n in 0..3 {
            manager.bus().publish(event("P1", n));
            manager.bus().publish(event("P2", n));
        }
        manager.bus().close();

        let collected: Vec<_> = timeout(WAIT, sub.collect::<Vec<_>>()).await.unwrap();
        assert_eq!(collected, (0..3).map(|n| event("P1", n)).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_subscribe_on_closed_bus_ends_immediately() {
        let manager = manager();
        manager.bus().close();
        let cancel = CancellationToken::new();
        let mut sub = manager.subscribe(&cancel, []);
        assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), None);
    }
}
