//! datagram link layer for the airgauge benchmark

use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod endpoint;
pub mod simulated;
pub mod udp;

pub use endpoint::{Datagram, DatagramEndpoint, SendStatus};
pub use simulated::{SimulatedEndpoint, SimulatedLinkCore};
pub use udp::UdpLink;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Datagram too large for link MTU")]
    DatagramTooLarge,

    #[error("Link transmit queue is full")]
    QueueFull,

    #[error("Link is closed")]
    Closed,

    #[error("socket io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub mtu: usize,
    pub bandwidth_bps: u32,
    pub packet_loss: f32,
    pub latency: Duration,
    pub latency_jitter: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            mtu: 250,
            bandwidth_bps: 1_000_000,
            packet_loss: 0.05,
            latency: Duration::from_millis(2),
            latency_jitter: Duration::from_millis(1),
        }
    }
}
