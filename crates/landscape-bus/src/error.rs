//! Bus error types.

use thiserror::Error;

/// Errors from bus and listener operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus was closed or the listener detached.
    #[error("event bus closed")]
    Closed,

    /// An envelope was produced by an incompatible protocol version.
    #[error("unsupported envelope version: received {received}, supported {supported}")]
    UnsupportedVersion { received: u16, supported: u16 },
}
