//! two-node throughput benchmark over the simulated channel

use std::time::Duration;

use anyhow::Result;
use airgauge_sim::{scenarios, LinkPresets};
use colored::Colorize;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    println!("{}", "Airgauge Link Benchmark".bright_blue().bold());
    println!("{}", "=======================".bright_blue());
    println!();

    let conditions = vec![
        ("Clean Channel", LinkPresets::clean_channel()),
        ("Average Channel", LinkPresets::average_channel()),
        ("Congested Channel", LinkPresets::congested_channel()),
        ("Lossy Channel", LinkPresets::lossy_channel()),
    ];

    let run_for = Duration::from_secs(12);
    for (name, link) in conditions {
        println!("{}", format!("\n>>> Condition: {}", name).bright_green().bold());
        println!("Bandwidth: {} bps", link.bandwidth_bps);
        println!("Packet Loss: {}%", (link.packet_loss * 100.0) as u32);
        println!("Latency: {:?} (jitter {:?})", link.latency, link.latency_jitter);
        println!();

        let (sender_cfg, receiver_cfg) = scenarios::paired_configs();
        let summary = scenarios::throughput_run(link, sender_cfg, receiver_cfg, run_for).await;

        println!("Run time: {:?}", summary.run_for);
        println!("  Datagrams issued: {} ({} gated by credit)", summary.datagrams_issued, summary.sends_gated);
        println!("  Transmission failures: {}", summary.send_failures);
        println!("  Datagrams counted by receiver: {}", summary.datagrams_counted);
        println!("  Channel drops: {}", summary.channel_dropped);
        println!("  Feedback reports: {} emitted, {} observed by sender", summary.reports_emitted, summary.feedback_reports);
        println!("  Delivered throughput: {:.2} bps", summary.delivered_bps());

        println!("{}", "Condition complete!".bright_yellow());
        println!("{}", "-".repeat(50));
    }

    println!("\n{}", "All conditions complete!".bright_green().bold());
    Ok(())
}
