//! SRP-6a client (RFC 5054 3072-bit group, SHA-512), parameterized so the
//! caller supplies the ephemeral secret `a` — Pair-Setup requires `a` to
//! equal the client's long-term Ed25519 private key bytes.

use num_bigint::BigUint;
use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use crate::PairingError;

/// RFC 5054 Appendix A 3072-bit group prime `N` (identical to RFC 3526
/// Group 15), whitespace stripped.
const N_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC7",
    "4020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F14",
    "374FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B",
    "7EDEE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163",
    "BF0598DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208",
    "552BB9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E",
    "36CE3BE39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF6",
    "95581718 3995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D",
    "04507A33A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F8",
    "5A6E1E4C7ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA",
    "06D98A0864D87602733EC86A64521F2B18177B200CBBE117577A615D6C7709",
    "88C0BAD946E208E24FA074E5AB3143DB5BFCE0FD108E4B82D120A93AD2CAFFF",
    "FFFFFFFFFFFFF",
);

/// SRP generator, per RFC 5054's 3072-bit group entry.
pub(crate) const G: u32 = 5;

/// Username SRP authenticates as for Pair-Setup.
pub const USERNAME: &str = "Pair-Setup";

pub(crate) fn group_modulus() -> BigUint {
    let hex: String = N_HEX.chars().filter(|c| !c.is_whitespace()).collect();
    let Some(n) = BigUint::parse_bytes(hex.as_bytes(), 16) else {
        unreachable!("N_HEX is a fixed, valid hex literal");
    };
    n
}

/// Byte length of the group modulus (384 bytes for the 3072-bit group).
pub(crate) fn group_len() -> usize {
    group_modulus().to_bytes_be().len()
}

/// Left zero-pad `bytes` to `len`.
pub(crate) fn pad(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len.saturating_sub(bytes.len())];
    out.extend_from_slice(bytes);
    out
}

pub(crate) fn sha512(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// An in-progress SRP-6a exchange, holding the client's ephemeral secret
/// for the lifetime of a single Pair-Setup flow.
pub struct SrpClient {
    a: BigUint,
    n: BigUint,
    g: BigUint,
    k: BigUint,
}

/// The client's public ephemeral value `A` and, after [`SrpClient::process_challenge`],
/// the derived session key and client proof.
pub struct SrpSession {
    /// Serialized `A = g^a mod N`, 384 bytes big-endian with left zero-padding.
    pub a_pub: Vec<u8>,
    /// 64-byte session key `K`.
    pub session_key: [u8; 64],
    /// Client proof `M1`, sent to the device.
    pub client_proof: [u8; 64],
    /// Server's expected proof, to compare against the device's reply.
    expected_server_proof: [u8; 64],
}

impl SrpClient {
    /// Start a new exchange with an externally supplied 32-byte ephemeral
    /// secret `a` (Pair-Setup uses the client's Ed25519 private key bytes).
    #[must_use]
    pub fn new(a: [u8; 32]) -> Self {
        let n = group_modulus();
        let g = BigUint::from(G);
        let k = BigUint::from_bytes_be(&sha512(&[
            &n.to_bytes_be(),
            &pad(&g.to_bytes_be(), group_len()),
        ]));
        Self {
            a: BigUint::from_bytes_be(&a),
            n,
            g,
            k,
        }
    }

    /// Compute `A = g^a mod N`, serialized as 384 bytes big-endian.
    #[must_use]
    pub fn public_key(&self) -> Vec<u8> {
        pad(&self.g.modpow(&self.a, &self.n).to_bytes_be(), group_len())
    }

    /// Process the device's `{salt, B}` challenge (Pair-Setup M2), deriving
    /// the session key and this client's proof.
    ///
    /// # Errors
    ///
    /// Returns [`PairingError::SrpAbort`] if the server's public value `B`
    /// is degenerate (`B mod N == 0`) or the derived scrambler `u` is zero
    /// — both indicate a malicious or broken peer per RFC 5054 §2.5.
    pub fn process_challenge(
        &self,
        pin: &str,
        salt: &[u8],
        b_pub: &[u8],
    ) -> Result<SrpSession, PairingError> {
        let b = BigUint::from_bytes_be(b_pub);
        if &b % &self.n == BigUint::from(0u32) {
            return Err(PairingError::SrpAbort);
        }

        let len = group_len();
        let a_pub = self.public_key();
        let u_hash = sha512(&[&pad(&a_pub, len), &pad(b_pub, len)]);
        let u = BigUint::from_bytes_be(&u_hash);
        if u == BigUint::from(0u32) {
            return Err(PairingError::SrpAbort);
        }

        let inner = sha512(&[USERNAME.as_bytes(), b":", pin.as_bytes()]);
        let x = BigUint::from_bytes_be(&sha512(&[salt, &inner]));

        // S = (B - k * g^x mod N) ^ (a + u*x) mod N
        let g_x = self.g.modpow(&x, &self.n);
        let k_g_x = (&self.k * &g_x) % &self.n;
        let base = (&b + &self.n - &k_g_x) % &self.n;
        let exponent = &self.a + (&u * &x);
        let s = base.modpow(&exponent, &self.n);

        let session_key: [u8; 64] = sha512(&[&s.to_bytes_be()]);

        let h_n = sha512(&[&self.n.to_bytes_be()]);
        let h_g = sha512(&[&pad(&self.g.to_bytes_be(), len)]);
        let h_n_xor_g: Vec<u8> = h_n.iter().zip(h_g.iter()).map(|(a, b)| a ^ b).collect();
        let h_username = sha512(&[USERNAME.as_bytes()]);

        let client_proof = sha512(&[
            &h_n_xor_g,
            &h_username,
            salt,
            &pad(&a_pub, len),
            &pad(b_pub, len),
            &session_key,
        ]);

        let expected_server_proof = sha512(&[&pad(&a_pub, len), &client_proof, &session_key]);

        Ok(SrpSession {
            a_pub,
            session_key,
            client_proof,
            expected_server_proof,
        })
    }
}

impl SrpSession {
    /// Verify the device's proof `M2` against the expected value.
    #[must_use]
    pub fn verify_server_proof(&self, server_proof: &[u8]) -> bool {
        server_proof == self.expected_server_proof
    }
}

impl Drop for SrpSession {
    fn drop(&mut self) {
        self.session_key.zeroize();
        self.client_proof.zeroize();
    }
}
