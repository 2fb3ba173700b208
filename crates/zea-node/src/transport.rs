//! Length-prefixed framing.
//!
//! Every frame is a u32 big-endian length followed by the bincode-encoded
//! envelope. Oversized frames, short reads and undecodable bytes close the
//! connection; a decode failure never reaches protocol state.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio::net::TcpStream;
use zea_core::schema::{Envelope, Message, SchemaError};

/// Upper bound on a frame, comfortably above the largest auction payload.
pub const MAX_FRAME_LEN: u32 = 8 * 1024 * 1024;

/// Deadline for a dial plus a single request/response round trip.
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(10);

/// Transport-level failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Socket failure (refused connection, reset, EOF mid-frame).
    #[error("transport I/O: {0}")]
    Io(#[from] std::io::Error),
    /// The peer announced a frame above [`MAX_FRAME_LEN`].
    #[error("oversized frame of {0} bytes")]
    OversizedFrame(u32),
    /// The frame decoded but the envelope or payload did not.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The peer did not answer within the deadline.
    #[error("request timed out")]
    Timeout,
}

/// Write one message as a frame.
///
/// # Errors
/// Fails on socket or encoding errors.
pub async fn send_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<(), TransportError> {
    let bytes = message.into_envelope()?.to_bytes()?;
    let len = u32::try_from(bytes.len()).map_err(|_| TransportError::OversizedFrame(u32::MAX))?;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::OversizedFrame(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message frame.
///
/// # Errors
/// Fails on socket errors, oversized frames, and undecodable bytes.
pub async fn recv_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message, TransportError> {
    let mut len_bytes = [0_u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_LEN {
        return Err(TransportError::OversizedFrame(len));
    }
    let len_usize = usize::try_from(len).map_err(|_| TransportError::OversizedFrame(len))?;
    let mut bytes = vec![0_u8; len_usize];
    reader.read_exact(&mut bytes).await?;
    let envelope = Envelope::from_bytes(&bytes)?;
    Ok(Message::from_envelope(&envelope)?)
}

/// Dial a peer and send one message, expecting no reply.
///
/// # Errors
/// Fails on dial or send failure within the deadline.
pub async fn send_oneshot(addr: SocketAddr, message: &Message) -> Result<(), TransportError> {
    tokio::time::timeout(REQUEST_DEADLINE, async {
        let mut stream = TcpStream::connect(addr).await?;
        send_message(&mut stream, message).await
    })
    .await
    .map_err(|_| TransportError::Timeout)?
}

/// Dial a peer, send one message, and await a single reply.
///
/// # Errors
/// Fails on dial, send or receive failure within the deadline.
pub async fn request(addr: SocketAddr, message: &Message) -> Result<Message, TransportError> {
    tokio::time::timeout(REQUEST_DEADLINE, async {
        let mut stream = TcpStream::connect(addr).await?;
        send_message(&mut stream, message).await?;
        recv_message(&mut stream).await
    })
    .await
    .map_err(|_| TransportError::Timeout)?
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "unit-test")]

    use zea_core::schema::{DhRequest, Relay};

    use super::*;

    #[tokio::test]
    async fn frame_round_trip() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let sent = Message::DhRequest(DhRequest { sender: 9 });
        send_message(&mut a, &sent).await.unwrap();
        let got = recv_message(&mut b).await.unwrap();
        match got {
            Message::DhRequest(req) => assert_eq!(req.sender, 9),
            Message::DiffieHellman(_)
            | Message::DhResponse(_)
            | Message::Tx(_)
            | Message::Register(_)
            | Message::Auction(_)
            | Message::Relay(_) => panic!("wrong variant"),
        }
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let len = (MAX_FRAME_LEN + 1).to_be_bytes();
        tokio::spawn(async move {
            let _ = tokio::io::AsyncWriteExt::write_all(&mut a, &len).await;
        });
        assert!(matches!(
            recv_message(&mut b).await,
            Err(TransportError::OversizedFrame(_))
        ));
    }

    #[tokio::test]
    async fn truncated_frame_is_an_io_error() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let sent = Message::Relay(Relay {
            message: "ping".to_owned(),
        });
        send_message(&mut a, &sent).await.unwrap();
        drop(a);

        // First message arrives, then the closed stream surfaces as EOF.
        recv_message(&mut b).await.unwrap();
        assert!(matches!(
            recv_message(&mut b).await,
            Err(TransportError::Io(_))
        ));
    }
}
