//! # Landscape Service
//!
//! Ties the identity registry, the topology table and the event bus into the
//! service other subsystems talk to:
//!
//! ```text
//!             ┌─────────────────────── Landscape ───────────────────────┐
//! config ───→ │ IdentityRegistry ──→ TopologyTable    (sync lookups)    │
//!             │                                                         │
//! publish ──→ │ EventBus ──→ SubscriptionManager ──→ Subscription ──────┼──→ caller
//!             └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups are synchronous and lock-free. `stop()` closes the bus, which ends
//! every open subscription with end-of-stream.

use crate::config::LandscapeConfig;
use crate::error::{Result, TopologyError};
use crate::identity::{IdentityRegistry, KeyPair};
use crate::subscription::{Subscription, SubscriptionManager, SubscriptionOption};
use crate::topology::TopologyTable;
use landscape_bus::{BusEnvelope, EventBus, EventPublisher};
use landscape_types::{BoardId, LandscapeEvent, PeerAddrInfo, PeerId};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const CREATED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// The landscape service.
pub struct Landscape {
    registry: IdentityRegistry,
    topology: TopologyTable,
    bus: Arc<EventBus>,
    subscriptions: SubscriptionManager,
    board: BoardId,
    lifecycle: AtomicU8,
}

impl Landscape {
    /// Build the landscape from explicit configuration.
    ///
    /// # Errors
    ///
    /// Any `ConfigError`, `IdentityError` or `TopologyError` found while
    /// validating the configuration and deriving the membership.
    pub fn new(config: LandscapeConfig) -> Result<Self> {
        config.validate()?;

        let registry = IdentityRegistry::from_membership(
            &config.membership.private_keys,
            &config.membership.local_addrs,
        )?;
        let board = BoardId::new(config.topology.board.trim());
        let topology = TopologyTable::single_board(&registry, board.clone())?;
        let bus = Arc::new(EventBus::with_capacity(config.bus.listener_capacity));
        let subscriptions = SubscriptionManager::with_output_capacity(
            bus.clone(),
            config.subscription.output_capacity,
        );

        info!(
            members = registry.len(),
            %board,
            listener_capacity = bus.capacity(),
            "Landscape created"
        );

        Ok(Self {
            registry,
            topology,
            bus,
            subscriptions,
            board,
            lifecycle: AtomicU8::new(CREATED),
        })
    }

    /// Mark the service running. Idempotent; a stopped landscape stays
    /// stopped.
    pub fn start(&self) {
        match self
            .lifecycle
            .compare_exchange(CREATED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => info!(board = %self.board, "Landscape started"),
            Err(STOPPED) => warn!("Landscape already stopped; start ignored"),
            Err(_) => {}
        }
    }

    /// Stop the service and close the bus. Idempotent.
    pub fn stop(&self) {
        if self.lifecycle.swap(STOPPED, Ordering::AcqRel) != STOPPED {
            self.bus.close();
            info!(
                published = self.bus.events_published(),
                "Landscape stopped"
            );
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle.load(Ordering::Acquire) == RUNNING
    }

    /// Key pair of the member at configuration position `index`.
    pub fn private_key(&self, index: usize) -> std::result::Result<&KeyPair, TopologyError> {
        self.registry.get(index).map(|identity| identity.keypair())
    }

    /// Addresses to dial when joining the overlay: one record per member.
    #[must_use]
    pub fn bootstrap_peers(&self) -> Vec<PeerAddrInfo> {
        self.registry.addr_infos()
    }

    /// Boards assigned to `peer`.
    pub fn partitions_for(
        &self,
        peer: &PeerId,
    ) -> std::result::Result<BTreeSet<BoardId>, TopologyError> {
        self.topology.partitions_for(peer)
    }

    /// Holders of `board`.
    pub fn holders_of(&self, board: &BoardId) -> std::result::Result<&[PeerId], TopologyError> {
        self.topology.holders_of(board)
    }

    /// Peer ids of the log sources present on `board`.
    pub fn sources_for(&self, board: &BoardId) -> std::result::Result<Vec<PeerId>, TopologyError> {
        self.holders_of(board).map(<[PeerId]>::to_vec)
    }

    /// Dialable addresses of the holders of `board`.
    pub fn addresses_for(
        &self,
        board: &BoardId,
    ) -> std::result::Result<Vec<PeerAddrInfo>, TopologyError> {
        self.topology.addresses_for(board)
    }

    /// Follow landscape events. See [`SubscriptionManager::subscribe`].
    pub fn subscribe<I>(&self, cancel: &CancellationToken, options: I) -> Subscription
    where
        I: IntoIterator<Item = SubscriptionOption>,
    {
        self.subscriptions.subscribe(cancel, options)
    }

    /// Publish an already-built envelope, e.g. one relayed from a peer.
    pub fn publish_envelope(&self, envelope: BusEnvelope) -> usize {
        self.bus.publish_envelope(envelope)
    }

    /// The board every member holds.
    #[must_use]
    pub fn board(&self) -> &BoardId {
        &self.board
    }

    #[must_use]
    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    #[must_use]
    pub fn topology(&self) -> &TopologyTable {
        &self.topology
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Subscriptions whose forwarding task is still running.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.active_subscriptions()
    }
}

impl EventPublisher for Landscape {
    fn publish(&self, event: LandscapeEvent) -> usize {
        self.bus.publish(event)
    }

    fn events_published(&self) -> u64 {
        self.bus.events_published()
    }
}

impl std::fmt::Debug for Landscape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Landscape")
            .field("members", &self.registry.len())
            .field("board", &self.board)
            .field("running", &self.is_running())
            .field("listeners", &self.bus.listener_count())
            .finish()
    }
}
