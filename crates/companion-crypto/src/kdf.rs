//! HKDF-SHA512 key derivation.

use hkdf::Hkdf;
use sha2::Sha512;

/// Derive a 32-byte key from `ikm` using HKDF-SHA512 with the given
/// UTF-8 salt and info labels.
///
/// The salt and info parameters are always short ASCII labels in this
/// protocol (e.g. `"Pair-Setup-Encrypt-Salt"` / `"Pair-Setup-Encrypt-Info"`),
/// so this only accepts `&str` rather than arbitrary bytes.
#[must_use]
pub fn hkdf(salt: &str, info: &str, ikm: &[u8]) -> [u8; 32] {
    let hkdf = Hkdf::<Sha512>::new(Some(salt.as_bytes()), ikm);
    let mut okm = [0u8; 32];
    let Ok(()) = hkdf.expand(info.as_bytes(), &mut okm) else {
        unreachable!("32 bytes is a valid HKDF-SHA512 output length");
    };
    okm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hkdf_is_deterministic() {
        let a = hkdf("salt", "info", b"input key material");
        let b = hkdf("salt", "info", b"input key material");
        assert_eq!(a, b);
    }

    #[test]
    fn hkdf_differs_by_salt() {
        let a = hkdf("salt-a", "info", b"ikm");
        let b = hkdf("salt-b", "info", b"ikm");
        assert_ne!(a, b);
    }

    #[test]
    fn hkdf_differs_by_info() {
        let a = hkdf("salt", "info-a", b"ikm");
        let b = hkdf("salt", "info-b", b"ikm");
        assert_ne!(a, b);
    }

    #[test]
    fn hkdf_differs_by_ikm() {
        let a = hkdf("salt", "info", b"ikm-a");
        let b = hkdf("salt", "info", b"ikm-b");
        assert_ne!(a, b);
    }

    #[test]
    fn hkdf_accepts_empty_salt() {
        let okm = hkdf("", "ClientEncrypt-main", b"shared secret");
        assert_eq!(okm.len(), 32);
    }
}
