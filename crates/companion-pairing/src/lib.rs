//! SRP-6a Pair-Setup and X25519 Pair-Verify state machines.
//!
//! Both handshakes are modeled sans-I/O: a state machine is driven by
//! calling [`PairSetup::step`] / [`PairVerify::step`] with each inbound TLV
//! payload and sending whatever bytes the returned [`StepResult`] carries.
//! Neither type touches a socket.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod common;
mod pair_setup;
mod pair_verify;
mod srp;
mod tags;

use companion_crypto::CryptoError;
use companion_tlv::TlvError;
use thiserror::Error;
use zeroize::Zeroize;

pub use pair_setup::PairSetup;
pub use pair_verify::PairVerify;
pub use srp::SrpClient;

/// Errors produced while driving a pairing handshake.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingError {
    /// Device rejected the SRP proof or pair-verify signature.
    #[error("device reported authentication failure")]
    Authentication,
    /// Device reported too many failed pairing attempts.
    #[error("device reported too many failed attempts")]
    MaxTries,
    /// Device asked the client to back off and retry later.
    #[error("device asked to back off, retry after {retry_seconds}s")]
    BackOff {
        /// Suggested retry delay. The wire protocol carries no duration
        /// alongside this error code, so this is a fixed, documented
        /// default rather than a parsed value.
        retry_seconds: u64,
    },
    /// Device reported an error code outside the known set.
    #[error("device reported unrecognized error code {0:#04x}")]
    UnknownDeviceError(u8),
    /// SRP aborted due to a degenerate public value (`B mod N == 0` or
    /// scrambler `u == 0`); indicates a malicious or broken peer.
    #[error("srp exchange aborted on a degenerate public value")]
    SrpAbort,
    /// A signature did not validate under the expected public key.
    #[error("signature verification failed")]
    SignatureInvalid,
    /// The device's claimed identifier did not match the expected one.
    #[error("device identifier mismatch")]
    IdentifierMismatch,
    /// A TLV arrived with a `SeqNo` other than the one this step expected.
    #[error("unexpected sequence number: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedSeqNo {
        /// `SeqNo` this step required.
        expected: u8,
        /// `SeqNo` actually present.
        actual: u8,
    },
    /// `step` was called again after the handshake already finished.
    #[error("handshake already complete")]
    AlreadyComplete,
    /// Malformed TLV framing.
    #[error(transparent)]
    Tlv(#[from] TlvError),
    /// A cryptographic primitive failed (AEAD open, bad key material).
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Result alias for this crate's operations.
pub type Result<T> = std::result::Result<T, PairingError>;

/// Long-term credentials produced by a successful Pair-Setup, persisted
/// by the caller across runs (§3 Data Model).
#[derive(Debug, Clone)]
pub struct LongTermCredentials {
    /// Device's long-term Ed25519 public key.
    pub device_ltpk: [u8; 32],
    /// This client's long-term Ed25519 private key.
    pub client_ltsk: [u8; 32],
    /// Device-assigned identifier, opaque bytes.
    pub device_id: Vec<u8>,
    /// This client's identifier (a UUID, 16 bytes).
    pub client_id: [u8; 16],
}

impl Drop for LongTermCredentials {
    fn drop(&mut self) {
        self.client_ltsk.zeroize();
    }
}

/// Per-session symmetric keys produced by a successful Pair-Verify.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    /// Key this client encrypts outbound frames with.
    pub tx_key: [u8; 32],
    /// Key this client decrypts inbound frames with.
    pub rx_key: [u8; 32],
}

/// What a handshake step produced.
#[derive(Debug)]
pub enum StepResult<T> {
    /// Send these bytes to the device and await its reply before calling
    /// `step` again.
    Send(Vec<u8>),
    /// The handshake is complete; this is its output.
    Done(T),
}

fn device_error(code: u8) -> PairingError {
    match code {
        tags::ERROR_AUTHENTICATION => PairingError::Authentication,
        tags::ERROR_MAX_TRIES => PairingError::MaxTries,
        tags::ERROR_BACKOFF => PairingError::BackOff { retry_seconds: 60 },
        other => PairingError::UnknownDeviceError(other),
    }
}
