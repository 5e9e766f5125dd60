pub mod hosts;
pub mod resolver;

use std::net::IpAddr;

use anyhow::Result;
use async_trait::async_trait;

use crate::common::DialContext;

pub use hosts::{parse_hosts_file, OverrideResolver};
pub use resolver::SystemResolver;

/// Name-resolution capability used by the dialer.
///
/// Returns the host's addresses as IP literal strings, in the order they
/// should be tried.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn lookup_host(&self, ctx: &DialContext, host: &str) -> Result<Vec<String>>;
}

/// Observability hook for name resolution, carried on the [`DialContext`].
pub trait DnsTrace: Send + Sync {
    fn dns_start(&self, _host: &str) {}

    /// `addrs` holds the records that parsed as IP literals.
    fn dns_done(&self, _addrs: &[IpAddr], _err: Option<&anyhow::Error>) {}
}

/// Report a finished lookup to the context's trace hook, if any.
pub(crate) fn trace_done(ctx: &DialContext, result: &Result<Vec<String>>) {
    let Some(trace) = ctx.trace() else {
        return;
    };
    match result {
        Ok(records) => {
            let addrs: Vec<IpAddr> = records.iter().filter_map(|r| r.parse().ok()).collect();
            trace.dns_done(&addrs, None);
        }
        Err(e) => trace.dns_done(&[], Some(e)),
    }
}

pub(crate) fn trace_start(ctx: &DialContext, host: &str) {
    if let Some(trace) = ctx.trace() {
        trace.dns_start(host);
    }
}
