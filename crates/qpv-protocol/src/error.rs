//! Error types for the protocol engine.

use thiserror::Error;

use crate::config::ConfigError;
use crate::network::Port;

/// Errors that abort a protocol run.
///
/// Photon loss is not represented here: it is protocol data and shows up as
/// `NO_PHOTON` / `NOT_SENT` outcomes in the results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// Node positions violate the ordering a scenario requires.
    #[error("invalid positions: {constraint} does not hold ({detail})")]
    PositionOrder {
        /// The required ordering.
        constraint: &'static str,
        /// The positions actually supplied.
        detail: String,
    },

    /// A role requires a port that has no channel attached.
    #[error("node '{node}' has no channel bound to port {port}")]
    UnboundPort {
        /// Node name.
        node: String,
        /// The missing port.
        port: Port,
    },

    /// A port was bound to two channels.
    #[error("port {port} of node '{node}' is already bound")]
    DuplicatePort {
        /// Node name.
        node: String,
        /// The port bound twice.
        port: Port,
    },

    /// A node name was added twice or not found.
    #[error("unknown or duplicate node '{0}'")]
    Node(String),

    /// A payload type does not match the channel type.
    #[error("node '{node}' sent a {payload} payload on {channel} port {port}")]
    PayloadMismatch {
        /// Sending node.
        node: String,
        /// Port used.
        port: Port,
        /// Payload kind.
        payload: &'static str,
        /// Channel kind.
        channel: &'static str,
    },

    /// A quantum operation received physically invalid parameters.
    #[error("quantum operation failed: {0}")]
    Quantum(#[from] qpv_quantum::QuantumError),

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
