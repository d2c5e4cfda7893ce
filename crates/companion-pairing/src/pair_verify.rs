//! Pair-Verify (M1→M4): X25519 key agreement plus a signature check
//! against the device's long-term key, producing per-session AEAD keys.

use companion_crypto::{
    aead_open, aead_seal, ed25519_sign, ed25519_verify, hkdf, nonce_from_label, x25519_dh,
    x25519_keypair,
};
use companion_tlv::{TlvMap, TlvWriter};
use zeroize::Zeroize;

use crate::{
    LongTermCredentials, PairingError, Result, SessionKeys, StepResult,
    common::{expect_seq_no, reject_device_error},
    tags,
};

enum State {
    Start,
    AwaitingM2 {
        client_eph_pub: [u8; 32],
        client_eph_priv: [u8; 32],
    },
    AwaitingM4 {
        shared: [u8; 32],
    },
    Done,
}

impl Drop for State {
    fn drop(&mut self) {
        match self {
            Self::AwaitingM2 {
                client_eph_priv, ..
            } => client_eph_priv.zeroize(),
            Self::AwaitingM4 { shared } => shared.zeroize(),
            Self::Start | Self::Done => {}
        }
    }
}

/// Drives a single Pair-Verify flow against an already-paired device.
/// Not reusable once it reaches `Done`.
pub struct PairVerify {
    state: State,
    credentials: LongTermCredentials,
}

impl PairVerify {
    /// Start a new Pair-Verify flow using credentials from a prior Pair-Setup.
    #[must_use]
    pub fn new(credentials: LongTermCredentials) -> Self {
        Self {
            state: State::Start,
            credentials,
        }
    }

    /// Advance the state machine.
    ///
    /// Pass `None` to get the very first outbound message (M1); pass
    /// `Some(tlv_bytes)` with the device's previous reply on every
    /// subsequent call.
    ///
    /// # Errors
    ///
    /// Returns a [`PairingError`] if the device reports a TLV `Error`, its
    /// identifier doesn't match, its signature fails to verify against the
    /// stored `device_ltpk`, or the TLV is malformed.
    pub fn step(&mut self, input: Option<&[u8]>) -> Result<StepResult<SessionKeys>> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Start => Ok(self.send_m1()),
            State::AwaitingM2 {
                client_eph_pub,
                client_eph_priv,
            } => self.process_m2(input, client_eph_pub, client_eph_priv),
            State::AwaitingM4 { shared } => process_m4(input, shared),
            State::Done => Err(PairingError::AlreadyComplete),
        }
    }

    fn send_m1(&mut self) -> StepResult<SessionKeys> {
        let (client_eph_priv, client_eph_pub) = x25519_keypair();
        let tlv = TlvWriter::new()
            .add_byte(tags::SEQ_NO, 1)
            .add(tags::PUBLIC_KEY, &client_eph_pub)
            .build();
        self.state = State::AwaitingM2 {
            client_eph_pub,
            client_eph_priv,
        };
        StepResult::Send(tlv)
    }

    fn process_m2(
        &mut self,
        input: Option<&[u8]>,
        client_eph_pub: [u8; 32],
        client_eph_priv: [u8; 32],
    ) -> Result<StepResult<SessionKeys>> {
        let map = TlvMap::decode(input.unwrap_or_default())?;
        reject_device_error(&map)?;
        expect_seq_no(&map, 2)?;

        let device_eph_pub_slice = map.require(tags::PUBLIC_KEY)?;
        let device_eph_pub: [u8; 32] = device_eph_pub_slice
            .try_into()
            .map_err(|_| PairingError::SignatureInvalid)?;
        let encrypted = map.require(tags::ENCRYPTED_DATA)?;

        let shared = x25519_dh(&client_eph_priv, &device_eph_pub);
        let sk = hkdf(
            "Pair-Verify-Encrypt-Salt",
            "Pair-Verify-Encrypt-Info",
            &shared,
        );

        let nonce = nonce_from_label("PV-Msg02");
        let plaintext = aead_open(&sk, &nonce, b"", encrypted)?;

        let inner = TlvMap::decode(&plaintext)?;
        let identifier = inner.require(tags::IDENTIFIER)?;
        if identifier != self.credentials.device_id.as_slice() {
            return Err(PairingError::IdentifierMismatch);
        }
        let signature_slice = inner.require(tags::SIGNATURE)?;
        let signature: [u8; 64] = signature_slice
            .try_into()
            .map_err(|_| PairingError::SignatureInvalid)?;

        let mut device_info =
            Vec::with_capacity(device_eph_pub.len() + identifier.len() + client_eph_pub.len());
        device_info.extend_from_slice(&device_eph_pub);
        device_info.extend_from_slice(identifier);
        device_info.extend_from_slice(&client_eph_pub);
        if !ed25519_verify(&self.credentials.device_ltpk, &device_info, &signature) {
            return Err(PairingError::SignatureInvalid);
        }

        let mut client_info = Vec::with_capacity(
            client_eph_pub.len() + self.credentials.client_id.len() + device_eph_pub.len(),
        );
        client_info.extend_from_slice(&client_eph_pub);
        client_info.extend_from_slice(&self.credentials.client_id);
        client_info.extend_from_slice(&device_eph_pub);
        let client_signature = ed25519_sign(&self.credentials.client_ltsk, &client_info);

        let inner_reply = TlvWriter::new()
            .add(tags::IDENTIFIER, &self.credentials.client_id)
            .add(tags::SIGNATURE, &client_signature)
            .build();
        let nonce = nonce_from_label("PV-Msg03");
        let encrypted_reply = aead_seal(&sk, &nonce, b"", &inner_reply);

        let tlv = TlvWriter::new()
            .add_byte(tags::SEQ_NO, 3)
            .add(tags::ENCRYPTED_DATA, &encrypted_reply)
            .build();

        self.state = State::AwaitingM4 { shared };
        Ok(StepResult::Send(tlv))
    }
}

fn process_m4(input: Option<&[u8]>, shared: [u8; 32]) -> Result<StepResult<SessionKeys>> {
    let map = TlvMap::decode(input.unwrap_or_default())?;
    reject_device_error(&map)?;
    expect_seq_no(&map, 4)?;

    let tx_key = hkdf("", "ClientEncrypt-main", &shared);
    let rx_key = hkdf("", "ServerEncrypt-main", &shared);

    Ok(StepResult::Done(SessionKeys { tx_key, rx_key }))
}

#[cfg(test)]
mod tests {
    use companion_crypto::{ed25519_keypair, x25519_dh, x25519_keypair};

    use super::*;

    struct FakeDevice {
        device_id: Vec<u8>,
        device_ltsk: [u8; 32],
        device_ltpk: [u8; 32],
        client_ltpk: [u8; 32],
        eph_priv: [u8; 32],
        eph_pub: [u8; 32],
        shared: Option<[u8; 32]>,
    }

    impl FakeDevice {
        fn new(device_id: &[u8], client_ltpk: [u8; 32]) -> Self {
            let (device_ltsk, device_ltpk) = ed25519_keypair();
            let (eph_priv, eph_pub) = x25519_keypair();
            Self {
                device_id: device_id.to_vec(),
                device_ltsk,
                device_ltpk,
                client_ltpk,
                eph_priv,
                eph_pub,
                shared: None,
            }
        }

        fn respond_m2(&mut self, m1: &[u8]) -> Vec<u8> {
            let map = TlvMap::decode(m1).unwrap();
            let client_eph_pub_slice = map.get(tags::PUBLIC_KEY).unwrap();
            let client_eph_pub: [u8; 32] = client_eph_pub_slice.try_into().unwrap();

            let shared = x25519_dh(&self.eph_priv, &client_eph_pub);
            self.shared = Some(shared);
            let sk = hkdf(
                "Pair-Verify-Encrypt-Salt",
                "Pair-Verify-Encrypt-Info",
                &shared,
            );

            let mut info = Vec::new();
            info.extend_from_slice(&self.eph_pub);
            info.extend_from_slice(&self.device_id);
            info.extend_from_slice(&client_eph_pub);
            let signature = ed25519_sign(&self.device_ltsk, &info);

            let inner = TlvWriter::new()
                .add(tags::IDENTIFIER, &self.device_id)
                .add(tags::SIGNATURE, &signature)
                .build();
            let nonce = nonce_from_label("PV-Msg02");
            let encrypted = aead_seal(&sk, &nonce, b"", &inner);

            TlvWriter::new()
                .add_byte(tags::SEQ_NO, 2)
                .add(tags::PUBLIC_KEY, &self.eph_pub)
                .add(tags::ENCRYPTED_DATA, &encrypted)
                .build()
        }

        fn respond_m4(&self, m3: &[u8], client_eph_pub: [u8; 32]) -> Vec<u8> {
            let shared = self.shared.unwrap();
            let sk = hkdf(
                "Pair-Verify-Encrypt-Salt",
                "Pair-Verify-Encrypt-Info",
                &shared,
            );

            let map = TlvMap::decode(m3).unwrap();
            let encrypted = map.get(tags::ENCRYPTED_DATA).unwrap();
            let nonce = nonce_from_label("PV-Msg03");
            let plaintext = aead_open(&sk, &nonce, b"", encrypted).unwrap();

            let inner = TlvMap::decode(&plaintext).unwrap();
            let client_id = inner.get(tags::IDENTIFIER).unwrap().to_vec();
            let signature_slice = inner.get(tags::SIGNATURE).unwrap();
            let signature: [u8; 64] = signature_slice.try_into().unwrap();

            let mut info = Vec::new();
            info.extend_from_slice(&client_eph_pub);
            info.extend_from_slice(&client_id);
            info.extend_from_slice(&self.eph_pub);
            assert!(ed25519_verify(&self.client_ltpk, &info, &signature));

            TlvWriter::new().add_byte(tags::SEQ_NO, 4).build()
        }
    }

    fn credentials(
        device_id: Vec<u8>,
        device_ltpk: [u8; 32],
        client_ltsk: [u8; 32],
    ) -> LongTermCredentials {
        LongTermCredentials {
            device_ltpk,
            client_ltsk,
            device_id,
            client_id: [0x07; 16],
        }
    }

    #[test]
    fn full_handshake_yields_matching_session_keys() {
        let (client_ltsk, client_ltpk) = ed25519_keypair();
        let device_id = b"AA:BB:CC:DD:EE:FF".to_vec();
        let mut device = FakeDevice::new(&device_id, client_ltpk);

        let creds = credentials(device_id, device.device_ltpk, client_ltsk);
        let mut client = PairVerify::new(creds);

        let StepResult::Send(m1) = client.step(None).unwrap() else {
            panic!("expected Send")
        };
        let client_eph_pub: [u8; 32] = TlvMap::decode(&m1)
            .unwrap()
            .get(tags::PUBLIC_KEY)
            .unwrap()
            .try_into()
            .unwrap();

        let m2 = device.respond_m2(&m1);
        let StepResult::Send(m3) = client.step(Some(&m2)).unwrap() else {
            panic!("expected Send")
        };

        let m4 = device.respond_m4(&m3, client_eph_pub);
        let StepResult::Done(keys) = client.step(Some(&m4)).unwrap() else {
            panic!("expected Done")
        };

        let device_tx = hkdf("", "ServerEncrypt-main", &device.shared.unwrap());
        let device_rx = hkdf("", "ClientEncrypt-main", &device.shared.unwrap());
        assert_eq!(keys.tx_key, device_rx);
        assert_eq!(keys.rx_key, device_tx);
    }

    #[test]
    fn wrong_device_identifier_is_rejected() {
        let (client_ltsk, client_ltpk) = ed25519_keypair();
        let mut device = FakeDevice::new(b"AA:BB:CC:DD:EE:FF", client_ltpk);

        let creds = credentials(b"wrong-id".to_vec(), device.device_ltpk, client_ltsk);
        let mut client = PairVerify::new(creds);

        let StepResult::Send(m1) = client.step(None).unwrap() else {
            panic!("expected Send")
        };
        let m2 = device.respond_m2(&m1);
        let err = client.step(Some(&m2)).unwrap_err();
        assert_eq!(err, PairingError::IdentifierMismatch);
    }

    #[test]
    fn tampered_device_signature_is_rejected() {
        let (client_ltsk, client_ltpk) = ed25519_keypair();
        let device_id = b"AA:BB:CC:DD:EE:FF".to_vec();
        let mut device = FakeDevice::new(&device_id, client_ltpk);

        let creds = credentials(device_id, device.device_ltpk, client_ltsk);
        let mut client = PairVerify::new(creds);

        let StepResult::Send(m1) = client.step(None).unwrap() else {
            panic!("expected Send")
        };
        let mut m2 = device.respond_m2(&m1);
        *m2.last_mut().unwrap() ^= 0xFF;
        assert!(client.step(Some(&m2)).is_err());
    }
}
