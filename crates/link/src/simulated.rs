//! Simulated wireless channel for in-process multi-node runs

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, trace, warn};
use rand::Rng;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::sleep;

use crate::{Datagram, DatagramEndpoint, LinkConfig, LinkError, SendStatus};

struct LinkPacket {
    from: SocketAddr,
    to: SocketAddr,
    payload: Bytes,
}

struct NodeChannels {
    inbound: mpsc::Sender<Datagram>,
    completions: mpsc::Sender<SendStatus>,
}

/// Routes datagrams between joined nodes over a single shared channel with
/// serialized airtime, latency, jitter and probabilistic loss.
pub struct SimulatedLinkCore {
    nodes: Arc<RwLock<HashMap<SocketAddr, NodeChannels>>>,
    config: LinkConfig,
    stats: Arc<Mutex<ChannelStats>>,
    packet_queue: mpsc::Sender<LinkPacket>,
}

#[derive(Debug, Default)]
struct ChannelStats {
    packets_queued: u64,
    packets_dropped: u64,
    packets_delivered: u64,
    bytes_delivered: u64,
}

impl SimulatedLinkCore {
    pub fn new(config: LinkConfig) -> Arc<Self> {
        let nodes = Arc::new(RwLock::new(HashMap::<SocketAddr, NodeChannels>::new()));
        let stats = Arc::new(Mutex::new(ChannelStats::default()));
        let (packet_queue, mut packet_rx) = mpsc::channel::<LinkPacket>(10_000);
        let nodes_clone = nodes.clone();
        let stats_clone = stats.clone();
        let config_clone = config.clone();

        log::info!("SimulatedLinkCore initialized with config: {:?}", config);

        tokio::spawn(async move {
            while let Some(packet) = packet_rx.recv().await {
                let airtime = Duration::from_secs_f64(
                    (packet.payload.len() * 8) as f64 / config_clone.bandwidth_bps as f64,
                );
                let jitter_ms = config_clone.latency_jitter.as_millis() as f64;
                let jitter = if jitter_ms > 0.0 {
                    let mut rng = rand::rng();
                    let jitter_factor: f64 = rng.random_range(-1.0..1.0);
                    Duration::from_millis((jitter_factor * jitter_ms).abs() as u64)
                } else {
                    Duration::ZERO
                };
                sleep(airtime + config_clone.latency + jitter).await;

                let dropped = {
                    let mut rng = rand::rng();
                    rng.random::<f32>() < config_clone.packet_loss
                };

                let n_guard = nodes_clone.read().await;
                let status = if dropped {
                    let mut stats = stats_clone.lock().await;
                    stats.packets_dropped += 1;
                    debug!("simulated packet loss on channel");
                    SendStatus::Failed
                } else if let Some(dest) = n_guard.get(&packet.to) {
                    let size = packet.payload.len();
                    match dest.inbound.try_send(Datagram {
                        from: packet.from,
                        payload: packet.payload,
                    }) {
                        Ok(()) => {
                            trace!("datagram delivered to {}", packet.to);
                            let mut stats = stats_clone.lock().await;
                            stats.packets_delivered += 1;
                            stats.bytes_delivered += size as u64;
                            SendStatus::Sent
                        }
                        Err(e) => {
                            warn!("inbound queue for {} rejected datagram: {}", packet.to, e);
                            SendStatus::Failed
                        }
                    }
                } else {
                    warn!("node {} not joined, dropping datagram", packet.to);
                    SendStatus::Failed
                };

                if let Some(origin) = n_guard.get(&packet.from) {
                    if origin.completions.try_send(status).is_err() {
                        warn!("completion queue for {} full, notification lost", packet.from);
                    }
                }
            }
        });

        Arc::new(Self {
            nodes,
            config,
            stats,
            packet_queue,
        })
    }

    /// Attach a node at `addr` and hand back its endpoint.
    pub async fn join(self: &Arc<Self>, addr: SocketAddr) -> SimulatedEndpoint {
        let (inbound_tx, inbound_rx) = mpsc::channel(1000);
        let (completions_tx, completions_rx) = mpsc::channel(1000);
        self.nodes.write().await.insert(
            addr,
            NodeChannels {
                inbound: inbound_tx,
                completions: completions_tx,
            },
        );
        SimulatedEndpoint {
            addr,
            core: Arc::clone(self),
            inbound: Mutex::new(inbound_rx),
            completions: Mutex::new(completions_rx),
        }
    }

    fn enqueue(&self, from: SocketAddr, to: SocketAddr, payload: Bytes) -> Result<(), LinkError> {
        if payload.len() > self.config.mtu {
            return Err(LinkError::DatagramTooLarge);
        }
        let packet = LinkPacket { from, to, payload };
        match self.packet_queue.try_send(packet) {
            Ok(()) => {
                trace!("enqueued datagram from {} to {}", from, to);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(LinkError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(LinkError::Closed),
        }
    }

    pub async fn get_stats(&self) -> (u64, u64, u64, u64) {
        let stats = self.stats.lock().await;
        (
            stats.packets_queued,
            stats.packets_dropped,
            stats.packets_delivered,
            stats.bytes_delivered,
        )
    }
}

/// One node's view of the simulated channel.
pub struct SimulatedEndpoint {
    addr: SocketAddr,
    core: Arc<SimulatedLinkCore>,
    inbound: Mutex<mpsc::Receiver<Datagram>>,
    completions: Mutex<mpsc::Receiver<SendStatus>>,
}

impl SimulatedEndpoint {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl DatagramEndpoint for SimulatedEndpoint {
    async fn send(&self, to: SocketAddr, payload: Bytes) -> Result<(), LinkError> {
        self.core.enqueue(self.addr, to, payload)?;
        let mut stats = self.core.stats.lock().await;
        stats.packets_queued += 1;
        Ok(())
    }

    async fn next_completion(&self) -> Option<SendStatus> {
        self.completions.lock().await.recv().await
    }

    async fn recv(&self) -> Option<Datagram> {
        self.inbound.lock().await.recv().await
    }
}
