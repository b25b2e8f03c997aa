//! # Event Publisher
//!
//! Defines the publishing side of the bus and the in-memory bus itself.

use crate::envelope::BusEnvelope;
use crate::listener::Listener;
use crate::DEFAULT_LISTENER_CAPACITY;
use landscape_types::LandscapeEvent;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Interface the replication/transport collaborators use to emit events.
pub trait EventPublisher: Send + Sync {
    /// Publish an event. Never waits for listeners.
    ///
    /// # Returns
    ///
    /// The number of listeners the event was queued for.
    fn publish(&self, event: LandscapeEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory broadcast bus.
///
/// Uses `tokio::sync::broadcast`: one ring buffer shared by all listeners,
/// each listener with its own read cursor. A listener that falls more than
/// `capacity` envelopes behind skips the oldest ones.
///
/// The ring buffer holds a power of two envelopes, so a requested capacity
/// is rounded up to the next power of two; [`EventBus::capacity`] reports
/// the effective bound.
pub struct EventBus {
    /// `None` once the bus is closed.
    sender: RwLock<Option<broadcast::Sender<BusEnvelope>>>,

    /// Listeners currently attached (closed listeners excluded).
    attached: Arc<AtomicUsize>,

    next_listener_id: AtomicU64,

    events_published: AtomicU64,

    capacity: usize,
}

impl EventBus {
    /// Create a bus with the default per-listener capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LISTENER_CAPACITY)
    }

    /// Create a bus holding at least `capacity` envelopes per listener.
    /// The effective bound is `capacity` rounded up to a power of two.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            attached: Arc::new(AtomicUsize::new(0)),
            next_listener_id: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Attach a listener receiving everything published from now on.
    ///
    /// On a closed bus the listener is born detached and reports
    /// end-of-stream on its first receive.
    #[must_use]
    pub fn new_listener(&self) -> Listener {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let receiver = self.sender.read().as_ref().map(broadcast::Sender::subscribe);
        if receiver.is_none() {
            debug!(listener = id, "Listener requested on closed bus");
        }
        Listener::new(id, receiver, self.attached.clone())
    }

    /// Publish a pre-built envelope, e.g. one decoded from the wire.
    ///
    /// Publishing on a closed bus is a no-op: nothing is queued or counted.
    pub fn publish_envelope(&self, envelope: BusEnvelope) -> usize {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            debug!(event_id = %envelope.event_id, "Event dropped (bus closed)");
            return 0;
        };
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let event_id = envelope.event_id;
        let kind = envelope.event.kind();
        let board = envelope.event.board_id().clone();
        match sender.send(envelope) {
            Ok(receivers) => {
                debug!(%event_id, kind, %board, receivers, "Event published");
                receivers
            }
            Err(_) => {
                debug!(%event_id, kind, %board, "Event dropped (no listeners)");
                0
            }
        }
    }

    /// Shut the bus down.
    ///
    /// Attached listeners drain what is already queued and then observe
    /// end-of-stream. Idempotent.
    pub fn close(&self) {
        if self.sender.write().take().is_some() {
            info!(
                listeners = self.listener_count(),
                published = self.events_published(),
                "Event bus closed"
            );
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Number of listeners currently attached.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.attached.load(Ordering::Acquire)
    }

    /// Effective per-listener queue bound (a power of two).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: LandscapeEvent) -> usize {
        self.publish_envelope(BusEnvelope::new(event))
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("closed", &self.is_closed())
            .field("listeners", &self.listener_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}
