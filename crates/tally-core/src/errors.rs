//! Error types for counter operations.

/// Errors produced by the counter engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounterError {
    /// Increment amount was zero or negative. No state is mutated.
    #[error("cannot increment a grow-only counter by {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// Serialized counter, registry, or envelope bytes failed to decode.
    #[error("decode error: {message}")]
    Decode {
        /// What failed to decode
        message: String,
    },

    /// Serialization of local state failed. Always a programming error,
    /// never a recoverable runtime condition.
    #[error("encode error: {message}")]
    Encode {
        /// What failed to encode
        message: String,
    },
}

impl CounterError {
    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }
}
