//! Credential serialization (§3 "Long-term credentials", §6 "Credential
//! serialization").
//!
//! Persisting the JSON blob to disk is an external collaborator per §1;
//! this module only converts between [`LongTermCredentials`] and the
//! base64-in-JSON shape a caller's own file store would write out.

use base64::{Engine as _, engine::general_purpose::STANDARD as base64};
use companion_pairing::LongTermCredentials;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// JSON-serializable form of [`LongTermCredentials`]: four `bytes` fields,
/// base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Device's long-term Ed25519 public key, base64.
    pub ltpk: String,
    /// This client's long-term Ed25519 private key, base64.
    pub ltsk: String,
    /// Device-assigned identifier, base64.
    #[serde(rename = "atvId")]
    pub atv_id: String,
    /// This client's UUID, base64.
    #[serde(rename = "clientId")]
    pub client_id: String,
}

impl From<&LongTermCredentials> for Credentials {
    fn from(creds: &LongTermCredentials) -> Self {
        Self {
            ltpk: base64.encode(creds.device_ltpk),
            ltsk: base64.encode(creds.client_ltsk),
            atv_id: base64.encode(&creds.device_id),
            client_id: base64.encode(creds.client_id),
        }
    }
}

impl Credentials {
    /// Serialize to the JSON shape a caller's credential file stores.
    ///
    /// # Errors
    ///
    /// Never fails for a well-formed `Credentials`; the `Result` exists
    /// because `serde_json` represents most encode paths as fallible.
    pub fn to_json(&self) -> Result<String, ClientError> {
        serde_json::to_string(self).map_err(|e| ClientError::MalformedCredentials(e.to_string()))
    }

    /// Parse the JSON shape a caller's credential file stores.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedCredentials`] if the JSON is
    /// malformed or a field isn't valid base64.
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        serde_json::from_str(json).map_err(|e| ClientError::MalformedCredentials(e.to_string()))
    }

    /// Decode into the long-term credentials the pairing crate consumes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedCredentials`] if a field isn't
    /// valid base64, or if `ltpk`/`ltsk`/`clientId` don't decode to
    /// exactly 32/32/16 bytes respectively.
    pub fn try_into_long_term(&self) -> Result<LongTermCredentials, ClientError> {
        let device_ltpk = decode_fixed::<32>(&self.ltpk, "ltpk")?;
        let client_ltsk = decode_fixed::<32>(&self.ltsk, "ltsk")?;
        let client_id = decode_fixed::<16>(&self.client_id, "clientId")?;
        let device_id = base64
            .decode(&self.atv_id)
            .map_err(|e| ClientError::MalformedCredentials(format!("atvId: {e}")))?;
        Ok(LongTermCredentials {
            device_ltpk,
            client_ltsk,
            device_id,
            client_id,
        })
    }
}

fn decode_fixed<const N: usize>(field: &str, name: &str) -> Result<[u8; N], ClientError> {
    let bytes = base64
        .decode(field)
        .map_err(|e| ClientError::MalformedCredentials(format!("{name}: {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        ClientError::MalformedCredentials(format!(
            "{name}: expected {N} bytes, got {}",
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LongTermCredentials {
        LongTermCredentials {
            device_ltpk: [0xAA; 32],
            client_ltsk: [0xBB; 32],
            device_id: b"AA:BB:CC:DD:EE:FF".to_vec(),
            client_id: [0x01; 16],
        }
    }

    #[test]
    fn round_trips_through_json() {
        let creds = sample();
        let serialized = Credentials::from(&creds);
        let json = serialized.to_json().unwrap();

        let parsed = Credentials::from_json(&json).unwrap();
        let restored = parsed.try_into_long_term().unwrap();

        assert_eq!(restored.device_ltpk, creds.device_ltpk);
        assert_eq!(restored.client_ltsk, creds.client_ltsk);
        assert_eq!(restored.device_id, creds.device_id);
        assert_eq!(restored.client_id, creds.client_id);
    }

    #[test]
    fn json_uses_documented_field_names() {
        let json = Credentials::from(&sample()).to_json().unwrap();
        assert!(json.contains("\"ltpk\""));
        assert!(json.contains("\"ltsk\""));
        assert!(json.contains("\"atvId\""));
        assert!(json.contains("\"clientId\""));
    }

    #[test]
    fn rejects_wrong_length_key() {
        let mut creds = Credentials::from(&sample());
        creds.ltpk = base64.encode([0u8; 4]);
        assert!(matches!(
            creds.try_into_long_term(),
            Err(ClientError::MalformedCredentials(_))
        ));
    }

    #[test]
    fn rejects_invalid_base64() {
        let mut creds = Credentials::from(&sample());
        creds.ltsk = "not base64!!".to_string();
        assert!(matches!(
            creds.try_into_long_term(),
            Err(ClientError::MalformedCredentials(_))
        ));
    }
}
