//! ChaCha20-Poly1305 AEAD seal/open.

use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};

use crate::{CryptoError, Result};

/// Encrypt `plaintext` under `key`/`nonce`, authenticating `aad`.
///
/// Returns ciphertext with the 16-byte Poly1305 tag appended.
#[must_use]
pub fn aead_seal(key: &[u8; 32], nonce: &[u8; 12], aad: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let Ok(ciphertext) = cipher.encrypt(
        Nonce::from_slice(nonce),
        Payload {
            msg: plaintext,
            aad,
        },
    ) else {
        unreachable!("ChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };
    ciphertext
}

/// Decrypt and authenticate `ct_and_tag` under `key`/`nonce`/`aad`.
///
/// # Errors
///
/// Returns [`CryptoError::AeadOpenFailed`] if the tag does not verify —
/// this covers a wrong key, wrong nonce, wrong AAD, and a tampered
/// ciphertext indiscriminately, matching what the underlying AEAD itself
/// reports.
pub fn aead_open(
    key: &[u8; 32],
    nonce: &[u8; 12],
    aad: &[u8],
    ct_and_tag: &[u8],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ct_and_tag,
                aad,
            },
        )
        .map_err(|_| CryptoError::AeadOpenFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let key = [0x6bu8; 32];
        let nonce = crate::nonce_from_counter_8(0);
        let ct = aead_seal(&key, &nonce, b"", b"test");
        let pt = aead_open(&key, &nonce, b"", &ct).unwrap();
        assert_eq!(pt, b"test");
    }

    #[test]
    fn open_fails_on_wrong_key() {
        let key = [0x01u8; 32];
        let wrong_key = [0x02u8; 32];
        let nonce = [0u8; 12];
        let ct = aead_seal(&key, &nonce, b"", b"secret");
        assert_eq!(
            aead_open(&wrong_key, &nonce, b"", &ct),
            Err(CryptoError::AeadOpenFailed)
        );
    }

    #[test]
    fn open_fails_on_wrong_aad() {
        let key = [0x01u8; 32];
        let nonce = [0u8; 12];
        let ct = aead_seal(&key, &nonce, b"header-v1", b"secret");
        assert_eq!(
            aead_open(&key, &nonce, b"header-v2", &ct),
            Err(CryptoError::AeadOpenFailed)
        );
    }

    #[test]
    fn open_fails_on_tampered_ciphertext() {
        let key = [0x01u8; 32];
        let nonce = [0u8; 12];
        let mut ct = aead_seal(&key, &nonce, b"", b"secret");
        ct[0] ^= 0xFF;
        assert_eq!(
            aead_open(&key, &nonce, b"", &ct),
            Err(CryptoError::AeadOpenFailed)
        );
    }

    #[test]
    fn seal_open_round_trip_empty_plaintext() {
        let key = [0x09u8; 32];
        let nonce = [0u8; 12];
        let ct = aead_seal(&key, &nonce, b"aad", b"");
        let pt = aead_open(&key, &nonce, b"aad", &ct).unwrap();
        assert!(pt.is_empty());
    }
}
