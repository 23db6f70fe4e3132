//! Transport-agnostic channel abstraction.
//!
//! The relay and CLI crates each provide a concrete [`Channel`] (axum
//! WebSocket, `tokio-tungstenite` client); the transfer pipelines in
//! this crate only depend on this trait, which preserves whole-frame
//! boundaries and frame kind (text vs. binary) the way the spec's
//! abstract channel requires.

use crate::error::{ProtocolError, Result};
use crate::wire::messages::Message;
use async_trait::async_trait;

/// One frame off the wire: a whole UTF-8 text message or a whole
/// binary message, never a partial frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// A bidirectional, order-preserving channel of whole frames.
///
/// Implementations MUST NOT reorder frames within a direction and MUST
/// surface any send/receive failure as [`ProtocolError::Channel`] or
/// [`ProtocolError::ChannelClosed`].
#[async_trait]
pub trait Channel: Send {
    async fn send_frame(&mut self, frame: Frame) -> Result<()>;

    /// Returns `Ok(None)` when the peer closes the channel cleanly.
    async fn recv_frame(&mut self) -> Result<Option<Frame>>;

    /// Serialize and send a [`Message`] as a text frame.
    async fn send_message(&mut self, message: &Message) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.send_frame(Frame::Text(json)).await
    }

    /// Send a pre-encoded binary chunk frame.
    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.send_frame(Frame::Binary(bytes)).await
    }

    /// Receive the next frame and require it to be text, parsing it as
    /// a [`Message`].
    async fn recv_message(&mut self) -> Result<Message> {
        match self.recv_frame().await? {
            Some(Frame::Text(s)) => Ok(serde_json::from_str(&s)?),
            Some(Frame::Binary(_)) => Err(ProtocolError::UnexpectedMessage {
                got: "binary frame".into(),
                expected: "text message".into(),
            }),
            None => Err(ProtocolError::ChannelClosed),
        }
    }

    /// Receive the next frame and require it to be binary.
    async fn recv_binary(&mut self) -> Result<Vec<u8>> {
        match self.recv_frame().await? {
            Some(Frame::Binary(b)) => Ok(b),
            Some(Frame::Text(_)) => Err(ProtocolError::UnexpectedMessage {
                got: "text frame".into(),
                expected: "binary chunk".into(),
            }),
            None => Err(ProtocolError::ChannelClosed),
        }
    }
}

#[cfg(test)]
pub mod test_support {
    //! An in-memory [`Channel`] pair for exercising the transfer
    //! pipelines without a real relay or socket.

    use super::*;
    use tokio::sync::mpsc;

    pub struct MemoryChannel {
        tx: mpsc::UnboundedSender<Frame>,
        rx: mpsc::UnboundedReceiver<Frame>,
    }

    /// Construct a connected pair: frames sent on `a` arrive on `b` and
    /// vice versa.
    pub fn memory_pair() -> (MemoryChannel, MemoryChannel) {
        let (tx_a, rx_b) = mpsc::unbounded_channel();
        let (tx_b, rx_a) = mpsc::unbounded_channel();
        (
            MemoryChannel { tx: tx_a, rx: rx_a },
            MemoryChannel { tx: tx_b, rx: rx_b },
        )
    }

    #[async_trait]
    impl Channel for MemoryChannel {
        async fn send_frame(&mut self, frame: Frame) -> Result<()> {
            self.tx
                .send(frame)
                .map_err(|_| ProtocolError::ChannelClosed)
        }

        async fn recv_frame(&mut self) -> Result<Option<Frame>> {
            Ok(self.rx.recv().await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::memory_pair;
    use super::*;
    use crate::wire::messages::Role;

    #[tokio::test]
    async fn memory_channel_round_trips_a_message() {
        let (mut a, mut b) = memory_pair();
        let hello = Message::Hello {
            code_hash_hex: "ff".repeat(32),
            role: Role::Sender,
        };
        a.send_message(&hello).await.unwrap();
        let got = b.recv_message().await.unwrap();
        assert_eq!(got, hello);
    }

    #[tokio::test]
    async fn memory_channel_round_trips_binary() {
        let (mut a, mut b) = memory_pair();
        a.send_binary(vec![1, 2, 3]).await.unwrap();
        let got = b.recv_binary().await.unwrap();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn dropping_sender_yields_channel_closed() {
        let (a, mut b) = memory_pair();
        drop(a);
        let err = b.recv_message().await.unwrap_err();
        assert!(matches!(err, ProtocolError::ChannelClosed));
    }
}
