//! Drives Pair-Setup and Pair-Verify over a freshly connected transport
//! (§4.5, §6).
//!
//! Both handshakes are sans-I/O state machines in `companion-pairing`;
//! this module is the only place that pumps bytes between a machine's
//! `step()` and [`Protocol::request_auth`].

use companion_pairing::{LongTermCredentials, PairSetup, PairVerify, SessionKeys, StepResult};
use companion_protocol::Protocol;
use companion_transport::FrameType;

use crate::error::Result;

/// Drive a Pair-Setup flow to completion, alternating `PairSetupStart`
/// (the first message only) and `PairSetupNext` (every reply after).
pub(crate) async fn drive_pair_setup(
    protocol: &Protocol,
    mut machine: PairSetup,
) -> Result<LongTermCredentials> {
    let mut frame_type = FrameType::PairSetupStart;
    let mut input: Option<Vec<u8>> = None;
    loop {
        match machine.step(input.as_deref())? {
            StepResult::Send(bytes) => {
                let reply = protocol.request_auth(frame_type, bytes).await?;
                frame_type = FrameType::PairSetupNext;
                input = Some(reply);
            }
            StepResult::Done(credentials) => return Ok(credentials),
        }
    }
}

/// Drive a Pair-Verify flow to completion, alternating `PairVerifyStart`
/// (the first message only) and `PairVerifyNext` (every reply after).
pub(crate) async fn drive_pair_verify(
    protocol: &Protocol,
    mut machine: PairVerify,
) -> Result<SessionKeys> {
    let mut frame_type = FrameType::PairVerifyStart;
    let mut input: Option<Vec<u8>> = None;
    loop {
        match machine.step(input.as_deref())? {
            StepResult::Send(bytes) => {
                let reply = protocol.request_auth(frame_type, bytes).await?;
                frame_type = FrameType::PairVerifyNext;
                input = Some(reply);
            }
            StepResult::Done(keys) => return Ok(keys),
        }
    }
}
