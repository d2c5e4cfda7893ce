//! Companion Protocol cryptographic primitives.
//!
//! Thin adapter over `ed25519-dalek`, `x25519-dalek`, `hkdf`+`sha2`, and
//! `chacha20poly1305`. Functions are pure aside from key generation, which
//! draws from the operating system RNG — callers needing deterministic
//! tests supply their own seed bytes via [`ed25519_from_seed`] and
//! [`x25519_from_seed`] instead of the `_keypair()` constructors.
//!
//! # Nonce constructions
//!
//! Three distinct 12-byte nonce layouts are used across the protocol's
//! handshakes and data channel, so each gets its own named constructor
//! rather than a single parameterized one:
//!
//! - [`nonce_from_counter_8`] — pairing-phase: `0x00 × 4 || counter_le64`.
//! - [`nonce_from_counter_12`] — data channel: `counter_le64 || 0x00 × 4`.
//! - [`nonce_from_label`] — deterministic pairing nonces such as
//!   `"PS-Msg05"`, right-aligned with left zero-padding.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod aead;
mod kdf;
mod keys;
mod nonce;

pub use aead::{aead_open, aead_seal};
pub use kdf::hkdf;
pub use keys::{
    Ed25519PublicKey, Ed25519SecretKey, Signature, X25519PublicKey, X25519SecretKey,
    ed25519_from_seed, ed25519_keypair, ed25519_sign, ed25519_verify, x25519_dh, x25519_from_seed,
    x25519_keypair,
};
pub use nonce::{NonceCounter, nonce_from_counter_8, nonce_from_counter_12, nonce_from_label};

use thiserror::Error;

/// Errors produced by this crate's cryptographic operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD decryption failed: wrong key, wrong nonce, wrong AAD, or a
    /// tampered ciphertext/tag. ChaCha20-Poly1305 gives no finer-grained
    /// reason than this.
    #[error("AEAD authentication failed")]
    AeadOpenFailed,

    /// A public key was not a valid point on its curve.
    #[error("invalid public key bytes")]
    InvalidPublicKey,

    /// A signature did not have the expected length or encoding.
    #[error("invalid signature bytes")]
    InvalidSignature,

    /// A per-direction nonce counter reached its maximum value; the
    /// session must be re-paired rather than risk nonce reuse.
    #[error("nonce counter exhausted")]
    NonceCounterExhausted,
}

/// Result alias for this crate's operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
