//! Error types for the semantics engine.
//!
//! The tree itself degrades instead of failing: unknown node ids, missing
//! handlers and calls made before a root exists all produce negative results
//! (`None`/`false`). Errors only exist at the edges, where a platform bridge
//! can refuse an update or an action arrives with the wrong arguments.

use crate::actions::SemanticsAction;

/// Result type alias for semantics operations.
pub type Result<T> = std::result::Result<T, SemanticsError>;

/// Errors reported by a platform bridge when delivering an update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The native side rejected the update.
    #[error("platform rejected semantics update: {0}")]
    Rejected(String),

    /// The native accessibility service is not connected.
    #[error("platform accessibility service is disconnected")]
    Disconnected,
}

impl BridgeError {
    /// Create a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Errors that can occur in the semantics engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticsError {
    /// Delivering an update to the platform failed.
    #[error("semantics bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// An action request carried arguments of the wrong kind.
    #[error("invalid arguments for action '{action}': expected {expected}")]
    InvalidArguments {
        action: SemanticsAction,
        expected: &'static str,
    },
}

impl SemanticsError {
    /// Create an invalid-arguments error.
    pub fn invalid_arguments(action: SemanticsAction, expected: &'static str) -> Self {
        Self::InvalidArguments { action, expected }
    }
}
