//! benchmark control protocol for airgauge

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod credit;
pub mod receiver;
pub mod sender;
pub mod window;
pub mod wire;

pub use credit::SendCredit;
pub use receiver::{Receiver, ReceiverStats};
pub use sender::{Sender, SenderStats};
pub use window::{MeasurementWindow, WindowAccumulator};

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Which side of the benchmark this node plays, fixed for the process
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Sender,
    Receiver,
}

impl FromStr for Role {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sender" | "initiator" => Ok(Role::Sender),
            "receiver" | "responder" => Ok(Role::Receiver),
            other => Err(BenchError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Sender => write!(f, "sender"),
            Role::Receiver => write!(f, "receiver"),
        }
    }
}

/// Fixed role-specific ports, so the two peers can validate each other by
/// address without a negotiation handshake.
pub const SENDER_PORT: u16 = 47801;
pub const RECEIVER_PORT: u16 = 47802;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    pub role: Role,
    pub self_addr: SocketAddr,
    pub peer_addr: SocketAddr,
    pub payload_len: usize,
    pub credit_limit: u32,
    pub burst_window: Duration,
    pub idle_period: Duration,
    pub report_window: Duration,
    pub poll_interval: Duration,
    pub send_spacing: Duration,
    pub gate_backoff: Duration,
}

impl BenchConfig {
    /// Protocol defaults for `role`, addressed at the two fixed local ports.
    pub fn for_role(role: Role) -> Self {
        let (self_port, peer_port) = match role {
            Role::Sender => (SENDER_PORT, RECEIVER_PORT),
            Role::Receiver => (RECEIVER_PORT, SENDER_PORT),
        };
        Self {
            role,
            self_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self_port),
            peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), peer_port),
            payload_len: wire::DATA_LEN,
            credit_limit: 8,
            burst_window: Duration::from_secs(3),
            idle_period: Duration::from_secs(5),
            report_window: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
            send_spacing: Duration::from_millis(100),
            gate_backoff: Duration::from_millis(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("sender".parse::<Role>().unwrap(), Role::Sender);
        assert_eq!("Receiver".parse::<Role>().unwrap(), Role::Receiver);
        assert_eq!("responder".parse::<Role>().unwrap(), Role::Receiver);
        assert!(matches!(
            "master".parse::<Role>(),
            Err(BenchError::UnknownRole(_))
        ));
    }

    #[test]
    fn test_role_addresses_are_paired() {
        let sender = BenchConfig::for_role(Role::Sender);
        let receiver = BenchConfig::for_role(Role::Receiver);
        assert_eq!(sender.self_addr.port(), receiver.peer_addr.port());
        assert_eq!(receiver.self_addr.port(), sender.peer_addr.port());
    }
}
