//! Error taxonomy for the session-facing API (§7).

use companion_pairing::PairingError;
use companion_protocol::ProtocolError;
use companion_transport::TransportError;
use thiserror::Error;

/// Errors produced while pairing, connecting, or issuing commands.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The TCP connection or frame transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The SRP or X25519 handshake failed.
    #[error(transparent)]
    Pairing(#[from] PairingError),

    /// The request/response multiplexer reported a failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A `Credentials` JSON blob was malformed or its fields had the wrong
    /// length.
    #[error("malformed credentials: {0}")]
    MalformedCredentials(String),
}

/// Result alias for this crate's operations.
pub type Result<T> = std::result::Result<T, ClientError>;
