//! airgauge node: one side of the two-node link benchmark

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;

use airgauge_core::{BenchConfig, Receiver, Role, Sender};
use airgauge_link::{LinkConfig, UdpLink};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // role and addressing are resolved exactly once, before any
    // networking state exists
    let config = parse_args()?;
    info!(
        "role {}, bound to {}, peer {}",
        config.role, config.self_addr, config.peer_addr
    );

    let link = LinkConfig::default();
    let endpoint = Arc::new(
        UdpLink::bind(config.self_addr, &link)
            .await
            .context("failed to bind datagram socket")?,
    );

    match config.role {
        Role::Sender => Sender::new(endpoint, config).run().await,
        Role::Receiver => Receiver::new(endpoint, config).run().await,
    }

    Ok(())
}

fn parse_args() -> Result<BenchConfig> {
    let mut args = std::env::args().skip(1);
    let role: Role = match args.next() {
        Some(arg) => arg.parse()?,
        None => bail!("usage: airgauge <sender|receiver> [self_addr] [peer_addr]"),
    };

    let mut config = BenchConfig::for_role(role);
    if let Some(addr) = args.next() {
        config.self_addr = addr
            .parse::<SocketAddr>()
            .context("invalid self address")?;
    }
    if let Some(addr) = args.next() {
        config.peer_addr = addr
            .parse::<SocketAddr>()
            .context("invalid peer address")?;
    }
    Ok(config)
}
