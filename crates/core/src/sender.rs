//! Credit-limited burst/idle transmit loop and feedback consumption

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::time::{sleep, Instant};

use airgauge_link::{DatagramEndpoint, SendStatus};

use crate::{wire, BenchConfig, SendCredit};

#[derive(Debug, Default)]
pub struct SenderStats {
    pub datagrams_issued: AtomicU64,
    pub sends_gated: AtomicU64,
    pub issue_failures: AtomicU64,
    pub send_failures: AtomicU64,
    pub feedback_reports: AtomicU64,
    pub bursts_completed: AtomicU64,
}

/// One responder report, as observed on the sender side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackReport {
    pub seq: u64,
    pub datagrams: u32,
    pub bytes: u64,
}

pub struct Sender<E> {
    endpoint: Arc<E>,
    config: BenchConfig,
    credit: Arc<SendCredit>,
    stats: Arc<SenderStats>,
}

impl<E: DatagramEndpoint + 'static> Sender<E> {
    pub fn new(endpoint: Arc<E>, config: BenchConfig) -> Self {
        let credit = Arc::new(SendCredit::new(config.credit_limit));
        Self {
            endpoint,
            config,
            credit,
            stats: Arc::new(SenderStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SenderStats> {
        self.stats.clone()
    }

    /// Run the transmit loop for the lifetime of the process, alternating
    /// between a burst window and an idle period.
    pub async fn run(self) {
        info!("acting as sender, peer {}", self.config.peer_addr);

        tokio::spawn(drain_completions(
            self.endpoint.clone(),
            self.credit.clone(),
            self.stats.clone(),
        ));
        tokio::spawn(consume_feedback(
            self.endpoint.clone(),
            self.config.clone(),
            self.stats.clone(),
        ));

        // generated once, re-sent for the whole run
        let payload = wire::data_datagram(self.config.payload_len);

        loop {
            let burst_start = Instant::now();
            while burst_start.elapsed() < self.config.burst_window {
                if self.credit.try_acquire() {
                    match self
                        .endpoint
                        .send(self.config.peer_addr, payload.clone())
                        .await
                    {
                        Ok(()) => {
                            self.stats.datagrams_issued.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            // never reached the link, no completion will come back
                            self.credit.release();
                            self.stats.issue_failures.fetch_add(1, Ordering::Relaxed);
                            warn!("failed to issue send: {}", e);
                        }
                    }
                    sleep(self.config.send_spacing).await;
                } else {
                    self.stats.sends_gated.fetch_add(1, Ordering::Relaxed);
                    sleep(self.config.gate_backoff).await;
                }
            }

            let bursts = self.stats.bursts_completed.fetch_add(1, Ordering::Relaxed) + 1;
            info!(
                "burst {} complete: {} datagrams issued so far, idling {:?}",
                bursts,
                self.stats.datagrams_issued.load(Ordering::Relaxed),
                self.config.idle_period
            );
            sleep(self.config.idle_period).await;
        }
    }
}

/// Return one credit per completion, success or failure alike; failures are
/// logged and never retried.
async fn drain_completions<E: DatagramEndpoint>(
    endpoint: Arc<E>,
    credit: Arc<SendCredit>,
    stats: Arc<SenderStats>,
) {
    while let Some(status) = endpoint.next_completion().await {
        credit.release();
        if status == SendStatus::Failed {
            stats.send_failures.fetch_add(1, Ordering::Relaxed);
            warn!("link reported a failed transmission");
        }
    }
    debug!("completion channel closed");
}

async fn consume_feedback<E: DatagramEndpoint>(
    endpoint: Arc<E>,
    config: BenchConfig,
    stats: Arc<SenderStats>,
) {
    while let Some(datagram) = endpoint.recv().await {
        if let Some(report) = handle_feedback(&config, &stats, datagram.from, &datagram.payload) {
            info!(
                "[{}] peer received {} datagrams ({} bytes) in the last {:?}",
                report.seq, report.datagrams, report.bytes, config.report_window
            );
        }
    }
}

/// Validate and decode one inbound datagram as a feedback report.
///
/// Anything not from the configured peer, or not feedback-sized, is
/// silently discarded.
fn handle_feedback(
    config: &BenchConfig,
    stats: &SenderStats,
    from: SocketAddr,
    payload: &[u8],
) -> Option<FeedbackReport> {
    if from != config.peer_addr {
        return None;
    }
    let datagrams = wire::parse_feedback(payload)?;
    let seq = stats.feedback_reports.fetch_add(1, Ordering::Relaxed);
    Some(FeedbackReport {
        seq,
        datagrams,
        bytes: datagrams as u64 * config.payload_len as u64,
    })
}
