//! Scenarios running both benchmark roles over the simulated channel

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use airgauge_core::{BenchConfig, Receiver, Role, Sender};
use airgauge_link::{LinkConfig, SimulatedLinkCore};

/// Stats gathered from one timed two-node run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_for: Duration,
    pub datagrams_issued: u64,
    pub sends_gated: u64,
    pub send_failures: u64,
    pub datagrams_counted: u64,
    pub reports_emitted: u64,
    pub feedback_reports: u64,
    pub channel_dropped: u64,
    pub channel_bytes_delivered: u64,
}

impl RunSummary {
    pub fn delivered_bps(&self) -> f64 {
        (self.channel_bytes_delivered * 8) as f64 / self.run_for.as_secs_f64()
    }
}

/// Paired configs for the two roles, wired at the fixed local ports.
pub fn paired_configs() -> (BenchConfig, BenchConfig) {
    let mut sender = BenchConfig::for_role(Role::Sender);
    let mut receiver = BenchConfig::for_role(Role::Receiver);
    sender.self_addr = receiver.peer_addr;
    receiver.self_addr = sender.peer_addr;
    (sender, receiver)
}

/// Run sender and receiver against each other over `link` for `run_for`,
/// then pull their stats. The role loops never terminate on their own; the
/// scenario aborts them once the clock runs out.
pub async fn throughput_run(
    link: LinkConfig,
    sender_cfg: BenchConfig,
    receiver_cfg: BenchConfig,
    run_for: Duration,
) -> RunSummary {
    log::info!("starting throughput run for {:?}", run_for);

    let core = SimulatedLinkCore::new(link);
    let sender_ep = Arc::new(core.join(sender_cfg.self_addr).await);
    let receiver_ep = Arc::new(core.join(receiver_cfg.self_addr).await);

    let sender = Sender::new(sender_ep, sender_cfg);
    let receiver = Receiver::new(receiver_ep, receiver_cfg);
    let sender_stats = sender.stats();
    let receiver_stats = receiver.stats();

    let receiver_task = tokio::spawn(receiver.run());
    let sender_task = tokio::spawn(sender.run());

    sleep(run_for).await;
    sender_task.abort();
    receiver_task.abort();

    let (_, dropped, _, bytes_delivered) = core.get_stats().await;
    RunSummary {
        run_for,
        datagrams_issued: sender_stats.datagrams_issued.load(Ordering::Relaxed),
        sends_gated: sender_stats.sends_gated.load(Ordering::Relaxed),
        send_failures: sender_stats.send_failures.load(Ordering::Relaxed),
        datagrams_counted: receiver_stats.datagrams_counted.load(Ordering::Relaxed),
        reports_emitted: receiver_stats.reports_emitted.load(Ordering::Relaxed),
        feedback_reports: sender_stats.feedback_reports.load(Ordering::Relaxed),
        channel_dropped: dropped,
        channel_bytes_delivered: bytes_delivered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinkPresets;

    #[tokio::test(start_paused = true)]
    async fn test_feedback_loop_closes_over_clean_channel() {
        let (mut sender_cfg, mut receiver_cfg) = paired_configs();
        for cfg in [&mut sender_cfg, &mut receiver_cfg] {
            cfg.burst_window = Duration::from_millis(500);
            cfg.idle_period = Duration::from_millis(200);
            cfg.report_window = Duration::from_millis(100);
            cfg.poll_interval = Duration::from_millis(5);
            cfg.send_spacing = Duration::from_millis(10);
        }

        let summary = throughput_run(
            LinkPresets::clean_channel(),
            sender_cfg,
            receiver_cfg,
            Duration::from_secs(2),
        )
        .await;

        assert!(summary.datagrams_issued > 0);
        assert_eq!(summary.send_failures, 0);
        assert!(summary.datagrams_counted > 0);
        assert!(summary.datagrams_counted <= summary.datagrams_issued);
        assert!(summary.reports_emitted >= 1);
        // the loop closed: the sender saw at least one responder report
        assert!(summary.feedback_reports >= 1);
        assert!(summary.feedback_reports <= summary.reports_emitted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_channel_produces_no_reports() {
        let (mut sender_cfg, mut receiver_cfg) = paired_configs();
        for cfg in [&mut sender_cfg, &mut receiver_cfg] {
            cfg.burst_window = Duration::from_millis(500);
            cfg.idle_period = Duration::from_millis(200);
            cfg.report_window = Duration::from_millis(100);
            cfg.poll_interval = Duration::from_millis(5);
            cfg.send_spacing = Duration::from_millis(10);
        }

        let mut link = LinkPresets::clean_channel();
        link.packet_loss = 1.0;

        let summary = throughput_run(link, sender_cfg, receiver_cfg, Duration::from_secs(2)).await;

        assert!(summary.datagrams_issued > 0);
        assert!(summary.send_failures > 0);
        assert_eq!(summary.datagrams_counted, 0);
        assert_eq!(summary.reports_emitted, 0);
        assert_eq!(summary.feedback_reports, 0);
    }
}
