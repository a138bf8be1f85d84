//! Datagram endpoint abstraction with asynchronous send completion

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;

use crate::LinkError;

/// Outcome of one issued send, delivered exactly once per send.
///
/// `Failed` covers anything the link could observe going wrong (dropped on
/// the channel, unknown peer, socket error); the benchmark counts airtime
/// attempts, so callers treat it as informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    Failed,
}

/// One inbound datagram, delivered with the peer address that produced it.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub from: SocketAddr,
    pub payload: Bytes,
}

/// An unreliable, unordered datagram transport.
///
/// `send` only issues a datagram. Whether it made it onto the air arrives
/// later through `next_completion`, once per issued send, in issue order.
/// No filtering is done on the inbound path; callers see every datagram the
/// link delivers.
#[async_trait]
pub trait DatagramEndpoint: Send + Sync {
    async fn send(&self, to: SocketAddr, payload: Bytes) -> Result<(), LinkError>;

    /// Next send-completion notification. `None` once the link is closed.
    async fn next_completion(&self) -> Option<SendStatus>;

    /// Next inbound datagram. `None` once the link is closed.
    async fn recv(&self) -> Option<Datagram>;
}
