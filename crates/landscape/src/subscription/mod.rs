//! # Subscriptions
//!
//! A subscription is a caller-facing, cancellable, board-filtered view over
//! the landscape bus. Each one owns a single bus listener and a forwarding
//! task:
//!
//! ```text
//! EventBus ──→ Listener ──→ [forwarding task: filter] ──→ mpsc ──→ Subscription
//!                                   ↑
//!                          cancellation token
//! ```
//!
//! ## Lifecycle
//!
//! `Open` → `Closing` → `Closed`. The task leaves `Open` when the caller
//! cancels, the caller drops the handle, the bus closes, or a lifecycle
//! violation is detected. On every exit path (panics included) the listener
//! is detached and the output channel is closed before `Closed` is reached.

pub mod filter;
pub mod manager;

pub use filter::{with_boards, SubscriptionFilter, SubscriptionOption};
pub use manager::SubscriptionManager;

use landscape_types::LandscapeEvent;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Listener attached, forwarding loop running.
    Open,
    /// Loop exited; releasing the listener and output channel.
    Closing,
    /// Terminal.
    Closed,
}

impl SubscriptionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Closing => 1,
            Self::Closed => 2,
        }
    }
}

/// State shared between a subscription handle and its forwarding task.
/// Transitions only move forward.
#[derive(Debug, Default)]
pub(crate) struct SharedState(AtomicU8);

impl SharedState {
    pub(crate) fn get(&self) -> SubscriptionState {
        SubscriptionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn advance(&self, to: SubscriptionState) {
        self.0.fetch_max(to.as_u8(), Ordering::AcqRel);
    }
}

/// Handle to a running subscription.
///
/// Yields matching events through [`Subscription::recv`] or as a [`Stream`].
/// Dropping the handle cancels the subscription.
pub struct Subscription {
    id: u64,
    events: mpsc::Receiver<LandscapeEvent>,
    cancel: CancellationToken,
    state: Arc<SharedState>,
    filter: SubscriptionFilter,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        events: mpsc::Receiver<LandscapeEvent>,
        cancel: CancellationToken,
        state: Arc<SharedState>,
        filter: SubscriptionFilter,
    ) -> Self {
        Self {
            id,
            events,
            cancel,
            state,
            filter,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next matching event, or `None` once the subscription has ended.
    ///
    /// After cancellation this returns `None` even if forwarded events are
    /// still buffered.
    pub async fn recv(&mut self) -> Option<LandscapeEvent> {
        if self.cancel.is_cancelled() {
            self.events.close();
            return None;
        }
        let next = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        };
        if next.is_none() {
            self.events.close();
        }
        next
    }

    /// Stop the subscription. Idempotent.
    ///
    /// Buffered events are discarded: the next `recv` (or stream poll)
    /// yields `None`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.state.get()
    }

    #[must_use]
    pub fn filter(&self) -> &SubscriptionFilter {
        &self.filter
    }
}

impl Stream for Subscription {
    type Item = LandscapeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // The forwarding task drops its sender on cancellation, which wakes
        // a pending poll.
        if self.cancel.is_cancelled() {
            self.events.close();
            return Poll::Ready(None);
        }
        self.events.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("filter", &self.filter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_only_moves_forward() {
        let state = SharedState::default();
        assert_eq!(state.get(), SubscriptionState::Open);

        state.advance(SubscriptionState::Closed);
        state.advance(SubscriptionState::Closing);
        state.advance(SubscriptionState::Open);
        assert_eq!(state.get(), SubscriptionState::Closed);
    }
}
