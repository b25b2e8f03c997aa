//! # Landscape Configuration
//!
//! Membership and topology are explicit configuration handed to
//! [`crate::Landscape::new`]; nothing is read from process-wide state.
//!
//! ## File Format
//!
//! ```toml
//! [membership]
//! private_keys = ["e4b404...23a4", "2c56a4...f4ca"]
//! local_addrs = ["/ip4/0.0.0.0/tcp/4007", "/ip4/0.0.0.0/tcp/4008"]
//!
//! [topology]
//! board = "boardIDForCutCornersLandscape"
//!
//! [bus]
//! listener_capacity = 1024   # rounded up to a power of two
//!
//! [subscription]
//! output_capacity = 64
//! ```
//!
//! Every section except `[membership]` may be omitted.

use crate::error::ConfigError;
use landscape_bus::DEFAULT_LISTENER_CAPACITY;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Board shared by every member of the development membership.
pub const CUT_CORNERS_BOARD: &str = "boardIDForCutCornersLandscape";

/// Private keys of the four-member development membership.
pub const CUT_CORNERS_PRIVATE_KEYS: [&str; 4] = [
    "e4b404b19b59749a92141d1f1ef22509ac01480148923a1f7c9f65e68e80b85f97ea5ddec354513941796d00085c66daa866da65aa2a548a5fa2f0b7388823a4",
    "2c56a4518f3aa4add8f83d149a23a75a398018b59c3d01084626d83753189d2bdee10a66d305bb4d33d78dbb14a882b44ebe0ffd647d696c53c3181e7d20f4ca",
    "42d18b2ac8a1a60a9bccb2995233ae3c46e15a595343ad445bd9165458c38cc86e846ac9b8dddd4831b79552b62d006246052238f7fb9e6ea8ea4a5d73767503",
    "56e379081af7c1fb0820e78d45850d665f971c2e2bfc3df836ed8f074b9c4ad9fc155f8941bfa50e5d10f31e1d0212e9d952c09f505d25df6dcbaddca74c409b",
];

/// Local listen addresses of the development membership, by position.
pub const CUT_CORNERS_LOCAL_ADDRS: [&str; 4] = [
    "/ip4/0.0.0.0/tcp/4007",
    "/ip4/0.0.0.0/tcp/4008",
    "/ip4/0.0.0.0/tcp/4009",
    "/ip4/0.0.0.0/tcp/4010",
];

/// Buffered events per subscription before the forwarding task waits.
pub const DEFAULT_OUTPUT_CAPACITY: usize = 64;

/// Complete landscape configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LandscapeConfig {
    pub membership: MembershipConfig,
    #[serde(default)]
    pub topology: TopologyConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

/// Parallel lists: member `i` has `private_keys[i]` and `local_addrs[i]`.
#[derive(Clone, Default, Deserialize)]
pub struct MembershipConfig {
    pub private_keys: Vec<String>,
    pub local_addrs: Vec<String>,
}

impl std::fmt::Debug for MembershipConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipConfig")
            .field("private_keys", &format_args!("[{} redacted]", self.private_keys.len()))
            .field("local_addrs", &self.local_addrs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// The board every member holds.
    pub board: String,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            board: CUT_CORNERS_BOARD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Per-listener queue bound; lagging listeners drop the oldest events.
    /// Rounded up to the next power of two.
    pub listener_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            listener_capacity: DEFAULT_LISTENER_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Per-subscription output channel bound.
    pub output_capacity: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
        }
    }
}

impl LandscapeConfig {
    /// Configuration with the given membership and default everything else.
    pub fn new<K, A>(private_keys: K, local_addrs: A) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            membership: MembershipConfig {
                private_keys: private_keys.into_iter().map(Into::into).collect(),
                local_addrs: local_addrs.into_iter().map(Into::into).collect(),
            },
            topology: TopologyConfig::default(),
            bus: BusConfig::default(),
            subscription: SubscriptionConfig::default(),
        }
    }

    /// The hard-wired four-member development landscape.
    #[must_use]
    pub fn cut_corners() -> Self {
        Self::new(CUT_CORNERS_PRIVATE_KEYS, CUT_CORNERS_LOCAL_ADDRS)
    }

    #[must_use]
    pub fn with_board(mut self, board: impl Into<String>) -> Self {
        self.topology.board = board.into();
        self
    }

    #[must_use]
    pub fn with_listener_capacity(mut self, capacity: usize) -> Self {
        self.bus.listener_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.subscription.output_capacity = capacity;
        self
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural consistency. Key material and addresses are checked
    /// later, when identities are derived.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let keys = self.membership.private_keys.len();
        let addrs = self.membership.local_addrs.len();
        if keys != addrs {
            return Err(ConfigError::MembershipMismatch { keys, addrs });
        }
        if keys == 0 {
            return Err(ConfigError::EmptyMembership);
        }
        if self.topology.board.trim().is_empty() {
            return Err(ConfigError::EmptyBoard);
        }
        if self.bus.listener_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("bus.listener_capacity"));
        }
        if self.subscription.output_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("subscription.output_capacity"));
        }
        Ok(())
    }
}
