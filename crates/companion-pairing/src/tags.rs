//! TLV8 tag bytes shared by Pair-Setup and Pair-Verify, per the
//! HomeKit-derived pairing TLV layout.

/// Pairing method (Pair-Setup M1 only).
pub(crate) const METHOD: u8 = 0x00;
/// `client_id` / `device_id`.
pub(crate) const IDENTIFIER: u8 = 0x01;
/// SRP salt (Pair-Setup M2 only).
pub(crate) const SALT: u8 = 0x02;
/// SRP or X25519 public key.
pub(crate) const PUBLIC_KEY: u8 = 0x03;
/// SRP client/server proof.
pub(crate) const PROOF: u8 = 0x04;
/// AEAD-encrypted sub-TLV.
pub(crate) const ENCRYPTED_DATA: u8 = 0x05;
/// Sequence number (`M1`..`M6` for Pair-Setup, `M1`..`M4` for Pair-Verify).
pub(crate) const SEQ_NO: u8 = 0x06;
/// Error code, present only on a failed step.
pub(crate) const ERROR: u8 = 0x07;
/// Ed25519 signature.
pub(crate) const SIGNATURE: u8 = 0x0A;
/// Optional display name, OPACK-encoded by the caller (Pair-Setup M5 only).
pub(crate) const NAME: u8 = 0x11;

/// `Method` value for Pair-Setup.
pub(crate) const METHOD_PAIR_SETUP: u8 = 0x00;

/// `Error` value: wrong PIN / bad proof.
pub(crate) const ERROR_AUTHENTICATION: u8 = 0x02;
/// `Error` value: too many failed attempts.
pub(crate) const ERROR_MAX_TRIES: u8 = 0x04;
/// `Error` value: device asks the client to back off and retry later.
pub(crate) const ERROR_BACKOFF: u8 = 0x05;
