//! Ed25519 signing keys and X25519 Diffie-Hellman keys.

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand_core::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

/// A 32-byte Ed25519 public (verifying) key.
pub type Ed25519PublicKey = [u8; 32];
/// A 32-byte Ed25519 private key seed.
pub type Ed25519SecretKey = [u8; 32];
/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];
/// A 32-byte X25519 public key.
pub type X25519PublicKey = [u8; 32];
/// A 32-byte X25519 private scalar.
pub type X25519SecretKey = [u8; 32];

/// Generate a fresh Ed25519 keypair from the OS RNG.
#[must_use]
pub fn ed25519_keypair() -> (Ed25519SecretKey, Ed25519PublicKey) {
    let signing_key = SigningKey::generate(&mut OsRng);
    (
        signing_key.to_bytes(),
        signing_key.verifying_key().to_bytes(),
    )
}

/// Derive an Ed25519 keypair from an existing 32-byte seed.
///
/// Used during Pair-Setup, where the client's SRP ephemeral secret `a`
/// is required to equal the long-term Ed25519 private key bytes.
#[must_use]
pub fn ed25519_from_seed(seed: &Ed25519SecretKey) -> (Ed25519SecretKey, Ed25519PublicKey) {
    let signing_key = SigningKey::from_bytes(seed);
    (
        signing_key.to_bytes(),
        signing_key.verifying_key().to_bytes(),
    )
}

/// Sign `msg` with the given Ed25519 private key.
#[must_use]
pub fn ed25519_sign(sk: &Ed25519SecretKey, msg: &[u8]) -> Signature {
    let signing_key = SigningKey::from_bytes(sk);
    signing_key.sign(msg).to_bytes()
}

/// Verify an Ed25519 signature. Returns `false` for a malformed public key
/// or signature as well as for a genuine mismatch — callers only need to
/// know whether the proof held.
#[must_use]
pub fn ed25519_verify(pk: &Ed25519PublicKey, msg: &[u8], sig: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(pk) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(sig);
    verifying_key.verify(msg, &signature).is_ok()
}

/// Generate a fresh X25519 keypair from the OS RNG.
#[must_use]
pub fn x25519_keypair() -> (X25519SecretKey, X25519PublicKey) {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = X25519Public::from(&secret);
    (secret.to_bytes(), public.to_bytes())
}

/// Derive an X25519 keypair from an existing 32-byte scalar.
#[must_use]
pub fn x25519_from_seed(seed: &X25519SecretKey) -> (X25519SecretKey, X25519PublicKey) {
    let secret = StaticSecret::from(*seed);
    let public = X25519Public::from(&secret);
    (secret.to_bytes(), public.to_bytes())
}

/// Compute the X25519 shared secret between `sk` and `peer_pk`.
#[must_use]
pub fn x25519_dh(sk: &X25519SecretKey, peer_pk: &X25519PublicKey) -> [u8; 32] {
    let secret = StaticSecret::from(*sk);
    let peer = X25519Public::from(*peer_pk);
    secret.diffie_hellman(&peer).to_bytes()
}
