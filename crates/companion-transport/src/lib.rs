//! Length-prefixed frame transport over a TCP-like stream.
//!
//! [`FrameTransport`] owns the socket and the decode buffer, reading and
//! writing `T (1 byte) || L (3 bytes big-endian) || payload` frames
//! (§4.6). Before [`FrameTransport::install_keys`] is called, frames are
//! sent and received in plaintext. After, every non-empty frame is sealed
//! with ChaCha20-Poly1305 using its own wire header as AAD, and the last
//! 16 bytes of `payload` on the wire are the authentication tag.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod frame;

use bytes::{Buf, BytesMut};
use companion_crypto::{CryptoError, NonceCounter, aead_open, aead_seal, nonce_from_counter_12};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpStream, ToSocketAddrs},
};
use zeroize::Zeroize;

pub use frame::{FrameType, HEADER_LEN, MAX_PAYLOAD_LEN};
use frame::{decode_header, encode_header};

/// Size of the chunks read from the socket into the accumulation buffer.
const READ_CHUNK: usize = 4096;

/// Errors produced by the frame transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection.
    #[error("connection closed")]
    Closed,
    /// A frame (or its sealed form) would not fit the 3-byte length field.
    #[error("frame payload of {0} bytes exceeds the 24-bit length field")]
    FrameTooLarge(usize),
    /// The header's type byte isn't one of the known [`FrameType`] values.
    #[error("unknown frame type byte {0:#04x}")]
    UnknownFrameType(u8),
    /// AEAD open/seal failed, or a nonce counter was exhausted.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The underlying socket returned an I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for this crate's operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Per-direction AEAD keys installed once Pair-Verify completes.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    /// Key this side encrypts outbound frames with.
    pub tx_key: [u8; 32],
    /// Key this side decrypts inbound frames with.
    pub rx_key: [u8; 32],
}

impl Drop for SessionKeys {
    fn drop(&mut self) {
        self.tx_key.zeroize();
        self.rx_key.zeroize();
    }
}

struct Keyed {
    keys: SessionKeys,
    tx_counter: NonceCounter,
    rx_counter: NonceCounter,
}

/// A length-prefixed frame transport over any async byte stream.
///
/// Generic over the stream type so tests can drive it with
/// `tokio::io::duplex` instead of a real socket; [`FrameTransport::connect`]
/// is the constructor production code uses.
pub struct FrameTransport<S> {
    stream: S,
    read_buf: BytesMut,
    keyed: Option<Keyed>,
}

impl FrameTransport<TcpStream> {
    /// Open a TCP connection and wrap it in a frame transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the connection fails.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }
}

impl<S> FrameTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            keyed: None,
        }
    }

    /// Install the session keys produced by Pair-Verify; every subsequent
    /// frame is authenticated-encrypted. Resets both nonce counters, per
    /// §4.3: counters are per-session and never reused across a re-pair.
    pub fn install_keys(&mut self, keys: SessionKeys) {
        self.keyed = Some(Keyed {
            keys,
            tx_counter: NonceCounter::new(),
            rx_counter: NonceCounter::new(),
        });
    }

    /// Whether session keys are installed.
    #[must_use]
    pub fn is_keyed(&self) -> bool {
        self.keyed.is_some()
    }

    /// Send one frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::FrameTooLarge`] if the sealed (or plain)
    /// payload doesn't fit the 3-byte length field, [`TransportError::Crypto`]
    /// if the tx nonce counter is exhausted, or [`TransportError::Io`] on a
    /// socket write failure.
    pub async fn send(&mut self, frame_type: FrameType, payload: &[u8]) -> Result<()> {
        let wire_len = if self.keyed.is_some() && !payload.is_empty() {
            payload.len() + 16
        } else {
            payload.len()
        };
        let header = encode_header(frame_type, wire_len)?;

        let wire = if let Some(keyed) = &mut self.keyed {
            if payload.is_empty() {
                Vec::new()
            } else {
                let nonce = nonce_from_counter_12(keyed.tx_counter.advance()?);
                aead_seal(&keyed.keys.tx_key, &nonce, &header, payload)
            }
        } else {
            payload.to_vec()
        };

        self.stream.write_all(&header).await?;
        self.stream.write_all(&wire).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Receive the next frame, blocking until a full frame has arrived.
    ///
    /// Reads accumulate into an internal buffer; a short read that leaves
    /// less than a full frame buffered is simply retried on the next
    /// socket read rather than treated as an error.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the peer closes the
    /// connection mid-frame, [`TransportError::UnknownFrameType`] for an
    /// unrecognized type byte, [`TransportError::Crypto`] if decryption
    /// fails or the rx nonce counter is exhausted, or [`TransportError::Io`]
    /// on a socket read failure.
    pub async fn recv(&mut self) -> Result<(FrameType, Vec<u8>)> {
        loop {
            if self.read_buf.len() >= HEADER_LEN {
                let mut header = [0u8; HEADER_LEN];
                header.copy_from_slice(&self.read_buf[..HEADER_LEN]);
                let (frame_type, len) = decode_header(header)?;

                if self.read_buf.len() >= HEADER_LEN + len {
                    self.read_buf.advance(HEADER_LEN);
                    let wire_payload = self.read_buf.split_to(len);
                    let payload = self.decrypt(header, &wire_payload)?;
                    return Ok((frame_type, payload));
                }
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn decrypt(&mut self, header: [u8; HEADER_LEN], wire_payload: &[u8]) -> Result<Vec<u8>> {
        let Some(keyed) = &mut self.keyed else {
            return Ok(wire_payload.to_vec());
        };
        if wire_payload.is_empty() {
            return Ok(Vec::new());
        }
        let nonce = nonce_from_counter_12(keyed.rx_counter.advance()?);
        Ok(aead_open(
            &keyed.keys.rx_key,
            &nonce,
            &header,
            wire_payload,
        )?)
    }
}
