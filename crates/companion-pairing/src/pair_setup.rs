//! Pair-Setup (M1→M6): SRP-6a PIN verification producing long-term
//! Ed25519 credentials.

use companion_crypto::{
    aead_open, aead_seal, ed25519_from_seed, ed25519_sign, ed25519_verify, hkdf, nonce_from_label,
};
use companion_tlv::{TlvMap, TlvWriter};

use crate::{
    LongTermCredentials, PairingError, Result, StepResult,
    common::{expect_seq_no, reject_device_error},
    srp::{SrpClient, SrpSession},
    tags,
};

enum State {
    Start,
    AwaitingM2,
    AwaitingM4 { session: SrpSession },
    AwaitingM6 { k: [u8; 64] },
    Done,
}

/// Drives a single Pair-Setup flow. Not reusable once it reaches `Done`.
pub struct PairSetup {
    state: State,
    pin: String,
    client_id: [u8; 16],
    client_ltsk: [u8; 32],
    client_ltpk: [u8; 32],
    /// Pre-encoded OPACK bytes for the optional `Name` TLV (`{name: <display>}`),
    /// supplied already-encoded so this crate need not depend on the OPACK codec.
    name_opack: Option<Vec<u8>>,
    verify_device_signature: bool,
}

impl PairSetup {
    /// Start a new Pair-Setup flow.
    ///
    /// `client_id` is this client's UUID. `ltsk_seed` is used both as the
    /// client's long-term Ed25519 private key seed and, per §4.4, as the
    /// SRP client's ephemeral secret `a`. `verify_device_signature`
    /// controls whether the optional M6 accessory-signature check runs.
    #[must_use]
    pub fn new(
        pin: String,
        client_id: [u8; 16],
        ltsk_seed: [u8; 32],
        name_opack: Option<Vec<u8>>,
        verify_device_signature: bool,
    ) -> Self {
        let (client_ltsk, client_ltpk) = ed25519_from_seed(&ltsk_seed);
        Self {
            state: State::Start,
            pin,
            client_id,
            client_ltsk,
            client_ltpk,
            name_opack,
            verify_device_signature,
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
    /// Returns a [`PairingError`] if the device reports a TLV `Error`, a
    /// proof or signature fails to verify, or the TLV is malformed.
    pub fn step(&mut self, input: Option<&[u8]>) -> Result<StepResult<LongTermCredentials>> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Start => Ok(self.send_m1()),
            State::AwaitingM2 => self.process_m2(input),
            State::AwaitingM4 { session } => self.process_m4(input, &session),
            State::AwaitingM6 { k } => self.process_m6(input, k),
            State::Done => Err(PairingError::AlreadyComplete),
        }
    }

    fn send_m1(&mut self) -> StepResult<LongTermCredentials> {
        let tlv = TlvWriter::new()
            .add_byte(tags::METHOD, tags::METHOD_PAIR_SETUP)
            .add_byte(tags::SEQ_NO, 1)
            .build();
        self.state = State::AwaitingM2;
        StepResult::Send(tlv)
    }

    fn process_m2(&mut self, input: Option<&[u8]>) -> Result<StepResult<LongTermCredentials>> {
        let map = TlvMap::decode(input.unwrap_or_default())?;
        reject_device_error(&map)?;
        expect_seq_no(&map, 2)?;

        let salt = map.require(tags::SALT)?.to_vec();
        let b_pub = map.require(tags::PUBLIC_KEY)?.to_vec();

        let srp = SrpClient::new(self.client_ltsk);
        let session = srp.process_challenge(&self.pin, &salt, &b_pub)?;

        let tlv = TlvWriter::new()
            .add_byte(tags::SEQ_NO, 3)
            .add(tags::PUBLIC_KEY, &session.a_pub)
            .add(tags::PROOF, &session.client_proof)
            .build();

        self.state = State::AwaitingM4 { session };
        Ok(StepResult::Send(tlv))
    }

    fn process_m4(
        &mut self,
        input: Option<&[u8]>,
        session: &SrpSession,
    ) -> Result<StepResult<LongTermCredentials>> {
        let map = TlvMap::decode(input.unwrap_or_default())?;
        reject_device_error(&map)?;
        expect_seq_no(&map, 4)?;

        let server_proof = map.require(tags::PROOF)?;
        if !session.verify_server_proof(server_proof) {
            return Err(PairingError::Authentication);
        }

        let k = session.session_key;
        let ios_device_x = hkdf(
            "Pair-Setup-Controller-Sign-Salt",
            "Pair-Setup-Controller-Sign-Info",
            &k,
        );
        let session_key = hkdf("Pair-Setup-Encrypt-Salt", "Pair-Setup-Encrypt-Info", &k);

        let mut info =
            Vec::with_capacity(ios_device_x.len() + self.client_id.len() + self.client_ltpk.len());
        info.extend_from_slice(&ios_device_x);
        info.extend_from_slice(&self.client_id);
        info.extend_from_slice(&self.client_ltpk);
        let signature = ed25519_sign(&self.client_ltsk, &info);

        let mut inner = TlvWriter::new()
            .add(tags::IDENTIFIER, &self.client_id)
            .add(tags::PUBLIC_KEY, &self.client_ltpk)
            .add(tags::SIGNATURE, &signature);
        if let Some(name) = &self.name_opack {
            inner = inner.add(tags::NAME, name);
        }
        let inner_bytes = inner.build();

        let nonce = nonce_from_label("PS-Msg05");
        let encrypted = aead_seal(&session_key, &nonce, b"", &inner_bytes);

        let tlv = TlvWriter::new()
            .add_byte(tags::SEQ_NO, 5)
            .add(tags::ENCRYPTED_DATA, &encrypted)
            .build();

        self.state = State::AwaitingM6 { k };
        Ok(StepResult::Send(tlv))
    }

    fn process_m6(
        &mut self,
        input: Option<&[u8]>,
        k: [u8; 64],
    ) -> Result<StepResult<LongTermCredentials>> {
        let map = TlvMap::decode(input.unwrap_or_default())?;
        reject_device_error(&map)?;
        expect_seq_no(&map, 6)?;

        let session_key = hkdf("Pair-Setup-Encrypt-Salt", "Pair-Setup-Encrypt-Info", &k);
        let encrypted = map.require(tags::ENCRYPTED_DATA)?;
        let nonce = nonce_from_label("PS-Msg06");
        let plaintext = aead_open(&session_key, &nonce, b"", encrypted)?;

        let inner = TlvMap::decode(&plaintext)?;
        let device_id = inner.require(tags::IDENTIFIER)?.to_vec();
        let device_ltpk_slice = inner.require(tags::PUBLIC_KEY)?;
        let device_ltpk: [u8; 32] = device_ltpk_slice
            .try_into()
            .map_err(|_| PairingError::SignatureInvalid)?;

        if self.verify_device_signature {
            let signature_slice = inner.require(tags::SIGNATURE)?;
            let signature: [u8; 64] = signature_slice
                .try_into()
                .map_err(|_| PairingError::SignatureInvalid)?;

            // Same construction as the client's own M5 signing key, but
            // with the accessory-facing salt/info labels (HAP pair-setup
            // accessory proof).
            let accessory_x = hkdf(
                "Pair-Setup-Accessory-Sign-Salt",
                "Pair-Setup-Accessory-Sign-Info",
                &k,
            );
            let mut info =
                Vec::with_capacity(accessory_x.len() + device_id.len() + device_ltpk.len());
            info.extend_from_slice(&accessory_x);
            info.extend_from_slice(&device_id);
            info.extend_from_slice(&device_ltpk);
            if !ed25519_verify(&device_ltpk, &info, &signature) {
                return Err(PairingError::SignatureInvalid);
            }
        }

        self.state = State::Done;
        Ok(StepResult::Done(LongTermCredentials {
            device_ltpk,
            client_ltsk: self.client_ltsk,
            device_id,
            client_id: self.client_id,
        }))
    }
}
