use std::collections::HashMap;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use dialstack::config::{self, Config};
use dialstack::DialContext;

/// Resolve and connect to a host:port once, then report the connection.
#[derive(Debug, Parser)]
#[command(name = "dialstack", version)]
struct Args {
    /// Target in host:port form.
    address: String,

    /// YAML config file.
    #[arg(short, long)]
    config: Option<String>,

    /// tcp, tcp4, tcp6, udp, udp4 or udp6.
    #[arg(short, long, default_value = "tcp")]
    network: String,

    /// Override resolution: name=ip[,ip...]. Repeatable.
    #[arg(long = "host", value_name = "NAME=IPS")]
    hosts: Vec<String>,

    /// Overall dial timeout in milliseconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Fast-fallback delay in milliseconds; negative disables racing.
    #[arg(long, allow_hyphen_values = true)]
    fallback_delay: Option<i64>,
}

fn parse_host_overrides(specs: &[String]) -> Result<HashMap<String, Vec<String>>> {
    let mut hosts = HashMap::new();
    for spec in specs {
        let Some((name, ips)) = spec.split_once('=') else {
            anyhow::bail!("invalid --host '{}', expected NAME=IP[,IP]", spec);
        };
        let ips: Vec<String> = ips
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if name.is_empty() || ips.is_empty() {
            anyhow::bail!("invalid --host '{}', expected NAME=IP[,IP]", spec);
        }
        hosts.insert(name.to_string(), ips);
    }
    Ok(hosts)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log.level)),
        )
        .init();

    cfg.hosts.extend(parse_host_overrides(&args.hosts)?);
    if let Some(ms) = args.timeout {
        cfg.dialer.timeout_ms = Some(ms);
    }
    if let Some(ms) = args.fallback_delay {
        cfg.dialer.fallback_delay_ms = Some(ms);
    }
    cfg.validate()?;

    let dialer = cfg.build_dialer()?;

    let ctx = DialContext::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let start = Instant::now();
    let conn = dialer
        .dial_context(&ctx, &args.network, &args.address)
        .await?;
    info!(
        local = %conn.local_addr()?,
        peer = %conn.peer_addr()?,
        elapsed = ?start.elapsed(),
        "connected"
    );
    println!(
        "{} -> {} ({:?})",
        conn.local_addr()?,
        conn.peer_addr()?,
        start.elapsed()
    );
    Ok(())
}
