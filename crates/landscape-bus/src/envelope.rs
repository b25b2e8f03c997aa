//! # Bus Envelope
//!
//! Wrapper for every event on the bus. Collaborators bridging events in from
//! the wire may construct envelopes directly; everyone else goes through
//! [`BusEnvelope::new`], which stamps the current protocol version.

use crate::error::BusError;
use crate::PROTOCOL_VERSION;
use landscape_types::LandscapeEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusEnvelope {
    /// Protocol version of the producer. MUST be checked before use.
    pub version: u16,

    /// Unique id of this publication, for log correlation.
    pub event_id: Uuid,

    pub event: LandscapeEvent,
}

impl BusEnvelope {
    /// Wrap an event with the current protocol version and a fresh id.
    #[must_use]
    pub fn new(event: LandscapeEvent) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            event_id: Uuid::new_v4(),
            event,
        }
    }

    /// Borrow the event if this envelope speaks our protocol version.
    pub fn validate(&self) -> Result<&LandscapeEvent, BusError> {
        if self.version != PROTOCOL_VERSION {
            return Err(BusError::UnsupportedVersion {
                received: self.version,
                supported: PROTOCOL_VERSION,
            });
        }
        Ok(&self.event)
    }

    /// Consume the envelope, yielding the event if the version is supported.
    pub fn into_event(self) -> Result<LandscapeEvent, BusError> {
        self.validate()?;
        Ok(self.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landscape_types::{BoardId, PeerId, PEER_ID_LEN};

    fn event() -> LandscapeEvent {
        LandscapeEvent::SourceDiscovered {
            board: BoardId::from("P1"),
            peer: PeerId::from_digest([1; PEER_ID_LEN]),
        }
    }

    #[test]
    fn test_new_envelope_is_valid() {
        let envelope = BusEnvelope::new(event());
        assert_eq!(envelope.version, PROTOCOL_VERSION);
        assert_eq!(envelope.validate().unwrap(), &event());
        assert_eq!(envelope.into_event().unwrap(), event());
    }

    #[test]
    fn test_foreign_version_rejected() {
        let envelope = BusEnvelope {
            version: PROTOCOL_VERSION + 1,
            ..BusEnvelope::new(event())
        };
        assert_eq!(
            envelope.validate(),
            Err(BusError::UnsupportedVersion {
                received: PROTOCOL_VERSION + 1,
                supported: PROTOCOL_VERSION,
            })
        );
    }

    #[test]
    fn test_envelope_from_wire() {
        let envelope = BusEnvelope::new(event());
        let json = serde_json::to_string(&envelope).unwrap();
        let decoded: BusEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, envelope);
    }
}
