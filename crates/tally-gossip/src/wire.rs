//! Gossip wire format.
//!
//! A single cross-node state update travels as an [`Envelope`]: a kind
//! discriminator, the event name, and that event's serialized counter
//! snapshot. Envelopes are immutable and exist only in transit.

use serde::{Deserialize, Serialize};
use tally_core::CounterError;

/// The only envelope kind a correctly versioned peer produces: merge the
/// carried counter state into the receiver's registry.
pub const ENVELOPE_KIND_MERGE: &str = "merge";

/// Wire representation of one cross-node counter update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Update kind; see [`ENVELOPE_KIND_MERGE`].
    pub kind: String,
    /// Event the carried counter state belongs to.
    pub event: String,
    /// Serialized [`tally_core::CounterSnapshot`].
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Create a merge envelope for `event` carrying `payload`.
    pub fn merge(event: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            kind: ENVELOPE_KIND_MERGE.to_string(),
            event: event.into(),
            payload,
        }
    }

    /// Serialize for transmission.
    pub fn encode(&self) -> Result<Vec<u8>, CounterError> {
        bincode::serialize(self).map_err(|e| CounterError::encode(e.to_string()))
    }

    /// Decode a received envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, CounterError> {
        bincode::deserialize(bytes).map_err(|e| CounterError::decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips() {
        let envelope = Envelope::merge("clicks", vec![1, 2, 3]);
        let restored = Envelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(restored, envelope);
        assert_eq!(restored.kind, ENVELOPE_KIND_MERGE);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = Envelope::decode(&[0xff; 3]).unwrap_err();
        assert!(matches!(err, CounterError::Decode { .. }));
    }
}
