//! Windowed receive-and-aggregate loop with feedback reporting

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::time::sleep;

use airgauge_link::{DatagramEndpoint, SendStatus};

use crate::{wire, BenchConfig, MeasurementWindow, WindowAccumulator};

#[derive(Debug, Default)]
pub struct ReceiverStats {
    pub datagrams_counted: AtomicU64,
    pub reports_emitted: AtomicU64,
    pub report_failures: AtomicU64,
}

pub struct Receiver<E> {
    endpoint: Arc<E>,
    config: BenchConfig,
    acc: Arc<WindowAccumulator>,
    stats: Arc<ReceiverStats>,
}

impl<E: DatagramEndpoint + 'static> Receiver<E> {
    pub fn new(endpoint: Arc<E>, config: BenchConfig) -> Self {
        Self {
            endpoint,
            config,
            acc: WindowAccumulator::new(),
            stats: Arc::new(ReceiverStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ReceiverStats> {
        self.stats.clone()
    }

    /// Run the measurement-and-report loop for the lifetime of the process.
    pub async fn run(self) {
        info!("acting as receiver, peer {}", self.config.peer_addr);

        tokio::spawn(count_inbound(
            self.endpoint.clone(),
            self.config.clone(),
            self.acc.clone(),
            self.stats.clone(),
        ));
        tokio::spawn(drain_completions(self.endpoint.clone()));

        let mut window = MeasurementWindow::new(self.acc.clone(), self.config.report_window);
        loop {
            if let Some(count) = window.poll() {
                let seq = self.stats.reports_emitted.fetch_add(1, Ordering::Relaxed);
                let bytes = count as u64 * self.config.payload_len as u64;
                info!(
                    "[{}] received {} datagrams ({} bytes) in the last {:?}",
                    seq, count, bytes, self.config.report_window
                );
                if let Err(e) = self
                    .endpoint
                    .send(self.config.peer_addr, wire::feedback_datagram(count))
                    .await
                {
                    self.stats.report_failures.fetch_add(1, Ordering::Relaxed);
                    warn!("failed to issue feedback report: {}", e);
                }
            }
            sleep(self.config.poll_interval).await;
        }
    }
}

/// Validation for the delivery path: exact peer, exact length, exact magic.
/// Everything else is dropped without a side effect or a log line.
fn accept_datagram(config: &BenchConfig, from: SocketAddr, payload: &[u8]) -> bool {
    from == config.peer_addr && wire::is_data_datagram(payload, config.payload_len)
}

async fn count_inbound<E: DatagramEndpoint>(
    endpoint: Arc<E>,
    config: BenchConfig,
    acc: Arc<WindowAccumulator>,
    stats: Arc<ReceiverStats>,
) {
    while let Some(datagram) = endpoint.recv().await {
        if accept_datagram(&config, datagram.from, &datagram.payload) {
            acc.record();
            stats.datagrams_counted.fetch_add(1, Ordering::Relaxed);
        }
    }
    debug!("inbound channel closed");
}

/// Feedback sends get completions too; they only matter for diagnostics.
async fn drain_completions<E: DatagramEndpoint>(endpoint: Arc<E>) {
    while let Some(status) = endpoint.next_completion().await {
        if status == SendStatus::Failed {
            warn!("link reported a failed feedback transmission");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use async_trait::async_trait;
    use airgauge_link::{Datagram, LinkError};
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    fn test_config() -> BenchConfig {
        let mut config = BenchConfig::for_role(Role::Receiver);
        config.peer_addr = "10.0.0.1:47801".parse().unwrap();
        config
    }

    #[test]
    fn test_accept_requires_peer_and_magic() {
        let config = test_config();
        let good = wire::data_datagram(config.payload_len);
        let stranger = "10.0.0.9:47801".parse().unwrap();

        assert!(accept_datagram(&config, config.peer_addr, &good));
        assert!(!accept_datagram(&config, stranger, &good));

        let mut bad_magic = good.to_vec();
        bad_magic[0] ^= 0x01;
        assert!(!accept_datagram(&config, config.peer_addr, &bad_magic));

        // feedback-sized traffic is never counted as data
        let feedback = wire::feedback_datagram(5);
        assert!(!accept_datagram(&config, config.peer_addr, &feedback));
    }

    /// Endpoint that replays a fixed inbound script then goes quiet,
    /// recording everything sent through it.
    #[derive(Default)]
    struct ScriptedEndpoint {
        inbound: Mutex<VecDeque<Datagram>>,
        sent: Mutex<Vec<(SocketAddr, Bytes)>>,
    }

    impl ScriptedEndpoint {
        fn push_inbound(&self, from: SocketAddr, payload: Bytes) {
            self.inbound
                .lock()
                .unwrap()
                .push_back(Datagram { from, payload });
        }

        fn sent(&self) -> Vec<(SocketAddr, Bytes)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DatagramEndpoint for ScriptedEndpoint {
        async fn send(&self, to: SocketAddr, payload: Bytes) -> Result<(), LinkError> {
            self.sent.lock().unwrap().push((to, payload));
            Ok(())
        }

        async fn next_completion(&self) -> Option<SendStatus> {
            std::future::pending().await
        }

        async fn recv(&self) -> Option<Datagram> {
            if let Some(datagram) = self.inbound.lock().unwrap().pop_front() {
                return Some(datagram);
            }
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reports_only_valid_datagrams() {
        let mut config = test_config();
        config.report_window = Duration::from_millis(100);
        config.poll_interval = Duration::from_millis(10);

        let endpoint = Arc::new(ScriptedEndpoint::default());
        for _ in 0..37 {
            endpoint.push_inbound(config.peer_addr, wire::data_datagram(config.payload_len));
        }
        for _ in 0..5 {
            let mut bad = wire::data_datagram(config.payload_len).to_vec();
            bad[1] ^= 0xFF;
            endpoint.push_inbound(config.peer_addr, Bytes::from(bad));
        }

        let peer_addr = config.peer_addr;
        let receiver = Receiver::new(endpoint.clone(), config);
        let stats = receiver.stats();
        let task = tokio::spawn(receiver.run());

        tokio::time::sleep(Duration::from_millis(150)).await;

        let sent = endpoint.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, peer_addr);
        assert_eq!(wire::parse_feedback(&sent[0].1), Some(37));
        assert_eq!(stats.datagrams_counted.load(Ordering::Relaxed), 37);
        assert_eq!(stats.reports_emitted.load(Ordering::Relaxed), 1);

        // three further silent window durations produce no reports
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(endpoint.sent().len(), 1);

        task.abort();
    }
}
