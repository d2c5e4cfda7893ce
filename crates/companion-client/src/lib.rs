//! Companion Protocol session API (§6): discovery TXT-record types,
//! credential serialization, and the connect/pair/command surface built
//! on top of `companion-pairing`, `companion-transport`, and
//! `companion-protocol`.
//!
//! This is the crate an application links against; the lower crates are
//! implementation detail reachable through it but not meant to be the
//! primary entry point.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod credentials;
mod discovery;
mod error;
mod pairing;
mod session;

pub use companion_opack::Value;
pub use companion_pairing::LongTermCredentials;
pub use companion_protocol::Event;
pub use config::SessionConfig;
pub use credentials::Credentials;
pub use discovery::DeviceTxtRecord;
pub use error::{ClientError, Result};
pub use session::Session;

use companion_opack::{Value as OpackValue, pack};
use companion_pairing::{PairSetup, PairVerify};
use companion_protocol::Protocol;
use companion_transport::FrameTransport;
use tokio::sync::broadcast;

/// Run Pair-Setup against a device, producing long-term credentials the
/// caller persists (persistence itself is out of scope, §1).
///
/// Opens its own TCP connection and closes it once the handshake
/// completes or fails.
///
/// # Errors
///
/// Returns [`ClientError::Transport`] if the connection fails, or
/// [`ClientError::Pairing`] if the PIN is rejected, the device reports
/// too many attempts, or asks for backoff (§7).
pub async fn pair(config: &SessionConfig, pin: &str) -> Result<LongTermCredentials> {
    let transport = FrameTransport::connect((config.host.as_str(), config.port)).await?;
    let (protocol, _events) = Protocol::spawn(transport);

    let client_id: [u8; 16] = rand::random();
    let ltsk_seed: [u8; 32] = rand::random();
    let name_opack = Some(pack(&OpackValue::map([(
        "name",
        OpackValue::string(&config.display_name),
    )])));

    let machine = PairSetup::new(
        pin.to_string(),
        client_id,
        ltsk_seed,
        name_opack,
        config.verify_device_signature,
    );
    pairing::drive_pair_setup(&protocol, machine).await
}

/// Run Pair-Verify against a previously paired device and return a
/// ready-to-use [`Session`] plus a receiver for its unsolicited events.
///
/// # Errors
///
/// Returns [`ClientError::Transport`] if the connection fails, or
/// [`ClientError::Pairing`] if the device's identity or signature doesn't
/// match the stored credentials (§4.5 M3).
pub async fn connect(
    config: &SessionConfig,
    credentials: &LongTermCredentials,
) -> Result<(Session, broadcast::Receiver<Event>)> {
    let transport = FrameTransport::connect((config.host.as_str(), config.port)).await?;
    let (protocol, events) = Protocol::spawn(transport);

    let machine = PairVerify::new(credentials.clone());
    let keys = pairing::drive_pair_verify(&protocol, machine).await?;
    protocol
        .install_keys(companion_transport::SessionKeys {
            tx_key: keys.tx_key,
            rx_key: keys.rx_key,
        })
        .await?;

    Ok((Session::new(protocol), events))
}
