//! Request/response multiplexer sitting above the frame transport (§4.7).
//!
//! One task owns a [`FrameTransport`], the pending-request table, and the
//! `_x` transaction-id counter (§5: single-task ownership). Callers never
//! touch the socket directly — [`Protocol`] handles talk to the owning
//! task over an mpsc channel and are cheap to clone, so concurrent OPACK
//! requests can be in flight at once; auth frames must still be driven
//! strictly serially, since only one handshake can be in progress.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod xid;

use std::{collections::HashMap, sync::Arc, time::Duration};

use companion_opack::{Value, pack, unpack};
use companion_transport::{FrameTransport, FrameType, SessionKeys, TransportError};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{broadcast, mpsc, oneshot},
};

use envelope::{MsgType, build_request, decode as decode_envelope};
use xid::XidGenerator;

/// Default per-request timeout (§4.7).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the broadcast channel unsolicited events are published on.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the command channel cloned [`Protocol`] handles share.
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Errors produced while driving a request through the multiplexer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The device's OPACK response carried `_em`.
    #[error("device reported an error: {0}")]
    Response(String),
    /// No response (or an unparseable one) arrived within the timeout.
    #[error("request timed out")]
    Timeout,
    /// The owning task stopped, e.g. because the transport closed.
    #[error("protocol stopped")]
    Stopped,
    /// The frame transport failed while sending this request.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result alias for this crate's operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// An unsolicited OPACK event (`_t == 1`).
#[derive(Debug, Clone)]
pub struct Event {
    /// The event's `_i` identifier, e.g. `FetchAttentionState`.
    pub name: String,
    /// The event's `_c` content map.
    pub body: Value,
}

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
enum PendingKey {
    Auth(FrameType),
    Opack(u32),
}

type AuthWaiter = oneshot::Sender<Result<Vec<u8>>>;
type OpackWaiter = oneshot::Sender<Result<Value>>;

enum Waiter {
    Auth(AuthWaiter),
    Opack(OpackWaiter),
}

enum Command {
    SendAuth {
        frame_type: FrameType,
        payload: Vec<u8>,
        respond_to: AuthWaiter,
    },
    SendOpack {
        frame_type: FrameType,
        envelope: Value,
        xid: u32,
        respond_to: OpackWaiter,
    },
    InstallKeys(Box<SessionKeys>),
    Cancel(PendingKey),
}

/// Handle to a running protocol multiplexer.
///
/// Cloning shares the same owning task and the same `_x` counter.
#[derive(Clone)]
pub struct Protocol {
    commands: mpsc::Sender<Command>,
    xids: Arc<XidGenerator>,
}

impl Protocol {
    /// Spawn the owning task over an already-connected transport, and
    /// return a handle plus a receiver for unsolicited events.
    ///
    /// Further [`broadcast::Receiver`]s can be obtained by calling
    /// `.resubscribe()` on the one returned here.
    pub fn spawn<S>(transport: FrameTransport<S>) -> (Self, broadcast::Receiver<Event>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(run(transport, command_rx, event_tx));
        (
            Self {
                commands: command_tx,
                xids: Arc::new(XidGenerator::new()),
            },
            event_rx,
        )
    }

    /// Install session keys on the transport once Pair-Verify completes.
    /// Every frame sent or received after this resolves is
    /// authenticated-encrypted.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Stopped`] if the owning task already exited.
    pub async fn install_keys(&self, keys: SessionKeys) -> Result<()> {
        self.commands
            .send(Command::InstallKeys(Box::new(keys)))
            .await
            .map_err(|_| ProtocolError::Stopped)
    }

    /// Send an auth frame and await the reply on its `*_Next` frame type.
    ///
    /// Used to drive Pair-Setup and Pair-Verify: pass the bytes a
    /// handshake's `step` produced and get back the device's reply for the
    /// next `step` call. §5 requires these to run strictly serially —
    /// issuing a second auth request before the first resolves is
    /// undefined.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Timeout`] if no reply arrives within
    /// [`DEFAULT_TIMEOUT`], or [`ProtocolError::Stopped`] if the
    /// connection closes first.
    pub async fn request_auth(&self, frame_type: FrameType, payload: Vec<u8>) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::SendAuth {
                frame_type,
                payload,
                respond_to: tx,
            })
            .await
            .map_err(|_| ProtocolError::Stopped)?;
        await_reply(
            &self.commands,
            rx,
            PendingKey::Auth(reply_frame_type(frame_type)),
        )
        .await
    }

    /// Send an OPACK request under `identifier` and await its `_t == 3`
    /// response, returning the response's `_c` content.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Response`] if the reply carried `_em`,
    /// [`ProtocolError::Timeout`] if none arrived within [`DEFAULT_TIMEOUT`],
    /// or [`ProtocolError::Stopped`] if the connection closed first.
    pub async fn request_opack(
        &self,
        frame_type: FrameType,
        identifier: &str,
        content: Value,
    ) -> Result<Value> {
        let xid = self.xids.next();
        let envelope = build_request(identifier, content, xid);
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::SendOpack {
                frame_type,
                envelope,
                xid,
                respond_to: tx,
            })
            .await
            .map_err(|_| ProtocolError::Stopped)?;
        await_reply(&self.commands, rx, PendingKey::Opack(xid)).await
    }
}

/// Await a pending entry's reply, cancelling it on timeout (§5 Cancellation).
async fn await_reply<T>(
    commands: &mpsc::Sender<Command>,
    rx: oneshot::Receiver<Result<T>>,
    key: PendingKey,
) -> Result<T> {
    match tokio::time::timeout(DEFAULT_TIMEOUT, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(ProtocolError::Stopped),
        Err(_) => {
            let _ = commands.send(Command::Cancel(key)).await;
            Err(ProtocolError::Timeout)
        }
    }
}

/// Map an auth frame's outbound type to the frame type its reply arrives on.
fn reply_frame_type(sent: FrameType) -> FrameType {
    match sent {
        FrameType::PairSetupStart | FrameType::PairSetupNext => FrameType::PairSetupNext,
        FrameType::PairVerifyStart | FrameType::PairVerifyNext => FrameType::PairVerifyNext,
        other => other,
    }
}

async fn run<S>(
    mut transport: FrameTransport<S>,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<Event>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut pending: HashMap<PendingKey, Waiter> = HashMap::new();

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else { break };
                handle_command(cmd, &mut transport, &mut pending).await;
            },
            frame = transport.recv() => {
                match frame {
                    Ok((frame_type, payload)) => dispatch(frame_type, payload, &mut pending, &events),
                    Err(error) => {
                        tracing::warn!(%error, "frame transport closed, failing all pending requests");
                        break;
                    },
                }
            },
        }
    }

    for waiter in pending.into_values() {
        match waiter {
            Waiter::Auth(tx) => {
                let _ = tx.send(Err(ProtocolError::Stopped));
            }
            Waiter::Opack(tx) => {
                let _ = tx.send(Err(ProtocolError::Stopped));
            }
        }
    }
}

async fn handle_command<S>(
    cmd: Command,
    transport: &mut FrameTransport<S>,
    pending: &mut HashMap<PendingKey, Waiter>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match cmd {
        Command::SendAuth {
            frame_type,
            payload,
            respond_to,
        } => {
            if let Err(error) = transport.send(frame_type, &payload).await {
                let _ = respond_to.send(Err(error.into()));
                return;
            }
            pending.insert(
                PendingKey::Auth(reply_frame_type(frame_type)),
                Waiter::Auth(respond_to),
            );
        }
        Command::SendOpack {
            frame_type,
            envelope,
            xid,
            respond_to,
        } => {
            let bytes = pack(&envelope);
            if let Err(error) = transport.send(frame_type, &bytes).await {
                let _ = respond_to.send(Err(error.into()));
                return;
            }
            pending.insert(PendingKey::Opack(xid), Waiter::Opack(respond_to));
        }
        Command::InstallKeys(keys) => transport.install_keys(*keys),
        Command::Cancel(key) => {
            pending.remove(&key);
        }
    }
}

fn dispatch(
    frame_type: FrameType,
    payload: Vec<u8>,
    pending: &mut HashMap<PendingKey, Waiter>,
    events: &broadcast::Sender<Event>,
) {
    match frame_type {
        FrameType::PairSetupNext | FrameType::PairVerifyNext => {
            if let Some(Waiter::Auth(tx)) = pending.remove(&PendingKey::Auth(frame_type)) {
                let _ = tx.send(Ok(payload));
            }
        }
        FrameType::UOpack | FrameType::EOpack | FrameType::POpack => {
            dispatch_opack(&payload, pending, events);
        }
        FrameType::NoOp | FrameType::PairSetupStart | FrameType::PairVerifyStart => {
            tracing::debug!(?frame_type, "dropping frame with no pending consumer");
        }
    }
}

fn dispatch_opack(
    payload: &[u8],
    pending: &mut HashMap<PendingKey, Waiter>,
    events: &broadcast::Sender<Event>,
) {
    let Ok(value) = unpack(payload) else {
        tracing::warn!("dropping malformed OPACK frame");
        return;
    };
    let Some(envelope) = decode_envelope(&value) else {
        tracing::warn!("dropping OPACK frame with no {{_i, _t, _c}} envelope");
        return;
    };

    match envelope.msg_type {
        MsgType::Event => {
            let _ = events.send(Event {
                name: envelope.identifier,
                body: envelope.content,
            });
        }
        MsgType::Response => {
            let Some(xid) = envelope.xid else { return };
            if let Some(Waiter::Opack(tx)) = pending.remove(&PendingKey::Opack(xid)) {
                let error_message = envelope
                    .content
                    .get("_em")
                    .or_else(|| value.get("_em"))
                    .and_then(Value::as_str);
                let result = match error_message {
                    Some(message) => Err(ProtocolError::Response(message.to_string())),
                    None => Ok(envelope.content),
                };
                let _ = tx.send(result);
            }
        }
        MsgType::Request => {
            tracing::debug!(identifier = %envelope.identifier, "dropping unexpected inbound OPACK request");
        }
    }
}

#[cfg(test)]
mod tests {
    use companion_opack::Value;
    use companion_transport::FrameTransport;
    use tokio::io::duplex;

    use super::*;

    fn device_keys() -> (SessionKeys, SessionKeys) {
        let a = [0x11; 32];
        let b = [0x22; 32];
        (
            SessionKeys {
                tx_key: a,
                rx_key: b,
            },
            SessionKeys {
                tx_key: b,
                rx_key: a,
            },
        )
    }

    #[tokio::test]
    async fn auth_request_round_trips() {
        let (client_io, device_io) = duplex(4096);
        let (protocol, _events) = Protocol::spawn(FrameTransport::new(client_io));
        let mut device = FrameTransport::new(device_io);

        let handle = tokio::spawn({
            let protocol = protocol.clone();
            async move {
                protocol
                    .request_auth(FrameType::PairSetupStart, b"M1".to_vec())
                    .await
            }
        });

        let (frame_type, payload) = device.recv().await.unwrap();
        assert_eq!(frame_type, FrameType::PairSetupStart);
        assert_eq!(payload, b"M1");
        device.send(FrameType::PairSetupNext, b"M2").await.unwrap();

        let reply = handle.await.unwrap().unwrap();
        assert_eq!(reply, b"M2");
    }

    #[tokio::test]
    async fn opack_request_resolves_with_content() {
        let (client_io, device_io) = duplex(4096);
        let (protocol, _events) = Protocol::spawn(FrameTransport::new(client_io));
        let mut device = FrameTransport::new(device_io);

        let handle = tokio::spawn({
            let protocol = protocol.clone();
            async move {
                protocol
                    .request_opack(FrameType::UOpack, "_systemInfo", Value::Map(Vec::new()))
                    .await
            }
        });

        let (frame_type, payload) = device.recv().await.unwrap();
        assert_eq!(frame_type, FrameType::UOpack);
        let request = unpack(&payload).unwrap();
        let xid = request.get("_x").and_then(Value::as_i64).unwrap();

        let response = build_request(
            "_systemInfo",
            Value::map([("name", Value::string("tv"))]),
            xid as u32,
        );
        let response = patch_msg_type_to_response(response);
        device
            .send(FrameType::UOpack, &pack(&response))
            .await
            .unwrap();

        let content = handle.await.unwrap().unwrap();
        assert_eq!(content.get("name").and_then(Value::as_str), Some("tv"));
    }

    #[tokio::test]
    async fn opack_error_response_is_rejected() {
        let (client_io, device_io) = duplex(4096);
        let (protocol, _events) = Protocol::spawn(FrameTransport::new(client_io));
        let mut device = FrameTransport::new(device_io);

        let handle = tokio::spawn({
            let protocol = protocol.clone();
            async move {
                protocol
                    .request_opack(FrameType::UOpack, "_launchApp", Value::Map(Vec::new()))
                    .await
            }
        });

        let (_, payload) = device.recv().await.unwrap();
        let request = unpack(&payload).unwrap();
        let xid = request.get("_x").and_then(Value::as_i64).unwrap() as u32;

        let response = patch_msg_type_to_response(build_request(
            "_launchApp",
            Value::map([("_em", Value::string("no such app"))]),
            xid,
        ));
        device
            .send(FrameType::UOpack, &pack(&response))
            .await
            .unwrap();

        let error = handle.await.unwrap().unwrap_err();
        assert!(matches!(error, ProtocolError::Response(message) if message == "no such app"));
    }

    #[tokio::test]
    async fn unsolicited_event_reaches_the_subscriber() {
        let (client_io, device_io) = duplex(4096);
        let (_protocol, mut events) = Protocol::spawn(FrameTransport::new(client_io));
        let mut device = FrameTransport::new(device_io);

        let event = Value::map([
            ("_i", Value::string("FetchAttentionState")),
            ("_t", Value::Int(1)),
            ("_c", Value::map([("state", Value::string("Awake"))])),
        ]);
        device.send(FrameType::EOpack, &pack(&event)).await.unwrap();

        let received = events.recv().await.unwrap();
        assert_eq!(received.name, "FetchAttentionState");
        assert_eq!(
            received.body.get("state").and_then(Value::as_str),
            Some("Awake")
        );
    }

    #[tokio::test]
    async fn encrypted_session_round_trips_after_install_keys() {
        let (client_io, device_io) = duplex(4096);
        let (protocol, _events) = Protocol::spawn(FrameTransport::new(client_io));
        let mut device = FrameTransport::new(device_io);

        let (client_keys, device_keys) = device_keys();
        protocol.install_keys(client_keys).await.unwrap();
        device.install_keys(device_keys);

        // Give the owning task a chance to process the InstallKeys command
        // before the device's first send races it.
        tokio::task::yield_now().await;

        let handle = tokio::spawn({
            let protocol = protocol.clone();
            async move {
                protocol
                    .request_opack(FrameType::EOpack, "_sessionStart", Value::Map(Vec::new()))
                    .await
            }
        });

        let (_, payload) = device.recv().await.unwrap();
        let request = unpack(&payload).unwrap();
        let xid = request.get("_x").and_then(Value::as_i64).unwrap() as u32;

        let response =
            patch_msg_type_to_response(build_request("_sessionStart", Value::Map(Vec::new()), xid));
        device
            .send(FrameType::EOpack, &pack(&response))
            .await
            .unwrap();

        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn pending_request_times_out_when_device_never_replies() {
        let (client_io, _device_io) = duplex(4096);
        let (protocol, _events) = Protocol::spawn(FrameTransport::new(client_io));

        let handle = tokio::spawn(async move {
            protocol
                .request_opack(FrameType::UOpack, "_systemInfo", Value::Map(Vec::new()))
                .await
        });

        tokio::time::advance(DEFAULT_TIMEOUT + Duration::from_millis(1)).await;

        assert!(matches!(handle.await.unwrap(), Err(ProtocolError::Timeout)));
    }

    #[tokio::test]
    async fn closing_the_transport_fails_pending_requests() {
        let (client_io, device_io) = duplex(4096);
        let (protocol, _events) = Protocol::spawn(FrameTransport::new(client_io));

        let handle = tokio::spawn({
            let protocol = protocol.clone();
            async move {
                protocol
                    .request_opack(FrameType::UOpack, "_systemInfo", Value::Map(Vec::new()))
                    .await
            }
        });

        tokio::task::yield_now().await;
        drop(device_io);

        let error = handle.await.unwrap().unwrap_err();
        assert!(matches!(error, ProtocolError::Stopped));
    }

    fn patch_msg_type_to_response(mut value: Value) -> Value {
        let Value::Map(entries) = &mut value else {
            panic!("expected map")
        };
        for (key, v) in entries.iter_mut() {
            if key == "_t" {
                *v = Value::Int(3);
            }
        }
        value
    }
}
