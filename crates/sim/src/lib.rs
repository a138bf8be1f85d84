//! simulation tools for airgauge

pub mod scenarios;

use std::time::Duration;
use airgauge_link::LinkConfig;

pub struct LinkPresets;

impl LinkPresets {
    pub fn clean_channel() -> LinkConfig {
        LinkConfig {
            mtu: 250,
            bandwidth_bps: 2_000_000,
            packet_loss: 0.0,
            latency: Duration::from_millis(1),
            latency_jitter: Duration::ZERO,
        }
    }

    pub fn average_channel() -> LinkConfig {
        LinkConfig {
            mtu: 250,
            bandwidth_bps: 1_000_000,
            packet_loss: 0.05,
            latency: Duration::from_millis(2),
            latency_jitter: Duration::from_millis(1),
        }
    }

    pub fn congested_channel() -> LinkConfig {
        LinkConfig {
            mtu: 250,
            bandwidth_bps: 250_000,
            packet_loss: 0.15,
            latency: Duration::from_millis(8),
            latency_jitter: Duration::from_millis(4),
        }
    }

    pub fn lossy_channel() -> LinkConfig {
        LinkConfig {
            mtu: 250,
            bandwidth_bps: 500_000,
            packet_loss: 0.40,
            latency: Duration::from_millis(5),
            latency_jitter: Duration::from_millis(3),
        }
    }
}
