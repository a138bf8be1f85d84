//! UDP-backed datagram link

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};

use crate::{Datagram, DatagramEndpoint, LinkConfig, LinkError, SendStatus};

/// Datagram endpoint over a bound UDP socket.
///
/// UDP reports send errors synchronously, so the outcome of each `send_to`
/// is re-routed through the completion queue to honor the asynchronous
/// completion contract shared with the simulated link.
pub struct UdpLink {
    socket: Arc<UdpSocket>,
    mtu: usize,
    completions_tx: mpsc::Sender<SendStatus>,
    completions: Mutex<mpsc::Receiver<SendStatus>>,
    inbound: Mutex<mpsc::Receiver<Datagram>>,
}

impl UdpLink {
    pub async fn bind(addr: SocketAddr, config: &LinkConfig) -> Result<Self, LinkError> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        let (inbound_tx, inbound_rx) = mpsc::channel(1000);
        let (completions_tx, completions_rx) = mpsc::channel(1000);

        let reader = socket.clone();
        let recv_buf_len = config.mtu.max(2048);
        tokio::spawn(async move {
            let mut buf = vec![0u8; recv_buf_len];
            loop {
                match reader.recv_from(&mut buf).await {
                    Ok((len, from)) => {
                        let payload = Bytes::copy_from_slice(&buf[..len]);
                        if inbound_tx.send(Datagram { from, payload }).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("udp recv error: {}", e);
                    }
                }
            }
        });

        Ok(Self {
            socket,
            mtu: config.mtu,
            completions_tx,
            completions: Mutex::new(completions_rx),
            inbound: Mutex::new(inbound_rx),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl DatagramEndpoint for UdpLink {
    async fn send(&self, to: SocketAddr, payload: Bytes) -> Result<(), LinkError> {
        if payload.len() > self.mtu {
            return Err(LinkError::DatagramTooLarge);
        }
        let status = match self.socket.send_to(&payload, to).await {
            Ok(_) => SendStatus::Sent,
            Err(e) => {
                debug!("udp send to {} failed: {}", to, e);
                SendStatus::Failed
            }
        };
        self.completions_tx
            .send(status)
            .await
            .map_err(|_| LinkError::Closed)?;
        Ok(())
    }

    async fn next_completion(&self) -> Option<SendStatus> {
        self.completions.lock().await.recv().await
    }

    async fn recv(&self) -> Option<Datagram> {
        self.inbound.lock().await.recv().await
    }
}
