//! Helpers shared by both handshake state machines.

use companion_tlv::TlvMap;

use crate::{PairingError, Result, device_error, tags};

/// Fail with the decoded [`PairingError`] if the device's TLV carries an
/// `Error` entry.
pub(crate) fn reject_device_error(map: &TlvMap) -> Result<()> {
    if let Some(err) = map.get(tags::ERROR)
        && let Some(&code) = err.first()
    {
        return Err(device_error(code));
    }
    Ok(())
}

/// Check that the TLV's `SeqNo` matches what this step expects.
pub(crate) fn expect_seq_no(map: &TlvMap, expected: u8) -> Result<()> {
    let actual = *map.require(tags::SEQ_NO)?.first().unwrap_or(&0);
    if actual != expected {
        return Err(PairingError::UnexpectedSeqNo { expected, actual });
    }
    Ok(())
}
