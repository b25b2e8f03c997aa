//! # Landscape Bus - Broadcast of Topology Events
//!
//! Fan-out primitive between the replication/transport collaborators that
//! produce landscape events and the subscriptions that consume them.
//!
//! ```text
//! ┌──────────────┐   publish()    ┌──────────────┐   recv()   ┌────────────┐
//! │ Replication  │ ─────────────→ │   EventBus   │ ─────────→ │ Listener 1 │
//! │ / Transport  │                │              │ ─────────→ │ Listener 2 │
//! └──────────────┘                └──────────────┘            └────────────┘
//! ```
//!
//! ## Delivery Rules
//!
//! - **No back-pressure:** `publish` never waits for listeners.
//! - **No replay:** a listener sees only events published after it attached.
//! - **Per-listener order:** each listener receives events in publish order.
//! - **Drop-oldest:** every listener has a bounded queue; a listener that
//!   falls behind by more than its capacity loses the oldest events and keeps
//!   receiving the newest. Other listeners are unaffected. The capacity is
//!   rounded up to a power of two (`EventBus::capacity` reports it).
//! - **Versioned envelope:** events travel inside a `BusEnvelope` carrying
//!   `PROTOCOL_VERSION`; consumers reject envelopes they do not understand.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod envelope;
pub mod error;
pub mod listener;
pub mod publisher;

pub use envelope::BusEnvelope;
pub use error::BusError;
pub use listener::Listener;
pub use publisher::{EventBus, EventPublisher};

/// Current protocol version of bus envelopes.
pub const PROTOCOL_VERSION: u16 = 1;

/// Events buffered per listener before the oldest are dropped.
pub const DEFAULT_LISTENER_CAPACITY: usize = 1024;
