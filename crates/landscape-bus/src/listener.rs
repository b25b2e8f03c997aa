//! # Listener
//!
//! A live attachment to the bus. Detaches on [`Listener::close`] or on drop,
//! whichever comes first; both are idempotent.

use crate::envelope::BusEnvelope;
use crate::error::BusError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Receive handle for envelopes published after attachment.
pub struct Listener {
    id: u64,

    /// `None` once detached.
    receiver: Option<broadcast::Receiver<BusEnvelope>>,

    /// Shared count of attached listeners, decremented exactly once on detach.
    attached: Arc<AtomicUsize>,

    /// Events lost to the drop-oldest policy.
    dropped: u64,
}

impl Listener {
    pub(crate) fn new(
        id: u64,
        receiver: Option<broadcast::Receiver<BusEnvelope>>,
        attached: Arc<AtomicUsize>,
    ) -> Self {
        if receiver.is_some() {
            attached.fetch_add(1, Ordering::AcqRel);
            debug!(listener = id, "Listener attached");
        }
        Self {
            id,
            receiver,
            attached,
            dropped: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next envelope.
    ///
    /// # Returns
    ///
    /// - `Some(envelope)` - The next envelope in publish order
    /// - `None` - The listener was closed or the bus shut down
    ///
    /// When this listener has fallen behind, the oldest queued envelopes are
    /// skipped and reception continues with the oldest one still retained.
    pub async fn recv(&mut self) -> Option<BusEnvelope> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Closed) => {
                    self.close();
                    return None;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => self.on_lagged(skipped),
            }
        }
    }

    /// Try to receive the next envelope without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(envelope))` - An envelope was queued
    /// - `Ok(None)` - Nothing queued right now
    /// - `Err(BusError::Closed)` - Listener closed or bus shut down
    pub fn try_recv(&mut self) -> Result<Option<BusEnvelope>, BusError> {
        loop {
            let Some(receiver) = self.receiver.as_mut() else {
                return Err(BusError::Closed);
            };
            match receiver.try_recv() {
                Ok(envelope) => return Ok(Some(envelope)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    self.close();
                    return Err(BusError::Closed);
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => self.on_lagged(skipped),
            }
        }
    }

    /// Detach from the bus. Later receives observe end-of-stream.
    pub fn close(&mut self) {
        if self.receiver.take().is_some() {
            self.attached.fetch_sub(1, Ordering::AcqRel);
            debug!(listener = self.id, dropped = self.dropped, "Listener detached");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_none()
    }

    /// Number of envelopes this listener lost by lagging.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn on_lagged(&mut self, skipped: u64) {
        self.dropped += skipped;
        warn!(
            listener = self.id,
            skipped,
            total_dropped = self.dropped,
            "Listener lagged, oldest events dropped"
        );
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("dropped", &self.dropped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::publisher::{EventBus, EventPublisher};
    use crate::BusError;
    use landscape_types::{BoardId, LandscapeEvent, PeerId, PEER_ID_LEN};
    use std::time::Duration;
    use tokio::time::timeout;

    fn event(board: &str, n: u8) -> LandscapeEvent {
        LandscapeEvent::SourceDiscovered {
            board: BoardId::from(board),
            peer: PeerId::from_digest([n; PEER_ID_LEN]),
        }
    }

    #[tokio::test]
    async fn test_listener_receives_in_publish_order() {
        let bus = EventBus::new();
        let mut listener = bus.new_listener();

        for n in 0..5 {
            bus.publish(event("P1", n));
        }

        for n in 0..5 {
            let envelope = timeout(Duration::from_millis(100), listener.recv())
                .await
                .expect("timeout")
                .expect("envelope");
            assert_eq!(envelope.event, event("P1", n));
        }
    }

    #[tokio::test]
    async fn test_no_replay_of_history() {
        let bus = EventBus::new();
        let _keep_open = bus.new_listener();
        bus.publish(event("P1", 1));

        let mut late = bus.new_listener();
        assert_eq!(late.try_recv(), Ok(None));

        bus.publish(event("P1", 2));
        assert_eq!(late.try_recv().unwrap().unwrap().event, event("P1", 2));
    }

    #[tokio::test]
    async fn test_close_yields_end_of_stream() {
        let bus = EventBus::new();
        let mut listener = bus.new_listener();
        assert_eq!(bus.listener_count(), 1);

        listener.close();
        listener.close();
        assert!(listener.is_closed());
        assert_eq!(bus.listener_count(), 0);

        bus.publish(event("P1", 1));
        let next = timeout(Duration::from_millis(100), listener.recv())
            .await
            .expect("closed listener must not block");
        assert!(next.is_none());
        assert_eq!(listener.try_recv(), Err(BusError::Closed));
    }

    #[tokio::test]
    async fn test_drop_oldest_when_lagging() {
        let bus = EventBus::with_capacity(4);
        let mut slow = bus.new_listener();
        let mut fast = bus.new_listener();

        for n in 0..10 {
            bus.publish(event("P1", n));
            // the fast listener keeps up
            assert_eq!(fast.try_recv().unwrap().unwrap().event, event("P1", n));
        }

        // Only the newest `capacity` events survive for the slow listener.
        let mut received = Vec::new();
        while let Ok(Some(envelope)) = slow.try_recv() {
            received.push(envelope.event);
        }
        assert_eq!(
            received,
            (6..10).map(|n| event("P1", n)).collect::<Vec<_>>()
        );
        assert_eq!(slow.dropped(), 6);
        assert_eq!(fast.dropped(), 0);
    }

    #[tokio::test]
    async fn test_lag_bound_is_the_reported_capacity() {
        let bus = EventBus::with_capacity(3);
        let capacity = bus.capacity();
        let mut idle = bus.new_listener();

        for n in 0..10 {
            bus.publish(event("P1", n));
        }

        let mut retained = Vec::new();
        while let Ok(Some(envelope)) = idle.try_recv() {
            retained.push(envelope.event);
        }
        assert_eq!(capacity, 4);
        assert_eq!(retained.len(), capacity);
        assert_eq!(retained[0], event("P1", 6));
        assert_eq!(idle.dropped(), 6);
    }

    #[tokio::test]
    async fn test_drop_detaches() {
        let bus = EventBus::new();
        {
            let _a = bus.new_listener();
            let _b = bus.new_listener();
            assert_eq!(bus.listener_count(), 2);
        }
        assert_eq!(bus.listener_count(), 0);
    }
}
