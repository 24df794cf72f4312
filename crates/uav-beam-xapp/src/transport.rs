//! In-process message transport.
//!
//! Carries outbound control messages over an unbounded channel. Production
//! deployments replace this with the RIC message router behind the same
//! [`MessageTransport`] trait; the decision path is identical either way.

use tokio::sync::mpsc;
use uav_beam_core::{MessageTransport, TransportError};

/// One framed outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// RMR message type.
    pub msg_type: u32,
    /// Serialized payload.
    pub payload: Vec<u8>,
}

/// Channel-backed [`MessageTransport`].
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelTransport {
    /// Creates the transport and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageTransport for ChannelTransport {
    fn send(&self, msg_type: u32, payload: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(OutboundMessage {
                msg_type,
                payload: payload.to_vec(),
            })
            .map_err(|_| TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e2::msg_type;

    #[test]
    fn test_send_delivers() {
        let (transport, mut rx) = ChannelTransport::new();
        transport
            .send(msg_type::RIC_CONTROL_REQ, b"{}")
            .unwrap();

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.msg_type, msg_type::RIC_CONTROL_REQ);
        assert_eq!(msg.payload, b"{}");
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        let err = transport.send(msg_type::RIC_CONTROL_REQ, b"{}").unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }
}
