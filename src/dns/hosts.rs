use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::common::DialContext;

use super::{Resolver, SystemResolver};

/// Static host mapping consulted before a fallback resolver.
///
/// Entries are matched exactly. A non-empty entry is returned verbatim
/// without format validation; empty or missing entries fall through.
pub struct OverrideResolver {
    inner: Arc<dyn Resolver>,
    hosts: HashMap<String, Vec<String>>,
}

impl OverrideResolver {
    /// Falls back to the [`SystemResolver`].
    pub fn new(hosts: HashMap<String, Vec<String>>) -> Self {
        Self::with_fallback(hosts, Arc::new(SystemResolver))
    }

    pub fn with_fallback(hosts: HashMap<String, Vec<String>>, inner: Arc<dyn Resolver>) -> Self {
        Self { inner, hosts }
    }

    pub fn hosts(&self) -> &HashMap<String, Vec<String>> {
        &self.hosts
    }
}

#[async_trait]
impl Resolver for OverrideResolver {
    async fn lookup_host(&self, ctx: &DialContext, host: &str) -> Result<Vec<String>> {
        if let Some(records) = self.hosts.get(host).filter(|r| !r.is_empty()) {
            debug!(host = host, count = records.len(), "override hit");
            let result = Ok(records.clone());
            super::trace_start(ctx, host);
            super::trace_done(ctx, &result);
            return result;
        }
        self.inner.lookup_host(ctx, host).await
    }
}

/// Parse `/etc/hosts` syntax into an override map.
///
/// Addresses for a name keep their line order. Lines whose first field is
/// not an IP literal are skipped.
pub fn parse_hosts_file(content: &str) -> HashMap<String, Vec<String>> {
    let mut hosts: HashMap<String, Vec<String>> = HashMap::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut parts = line.split_whitespace();
        let Some(addr) = parts.next() else {
            continue;
        };
        if addr.parse::<std::net::IpAddr>().is_err() {
            warn!(line = lineno + 1, addr = addr, "skipping hosts entry");
            continue;
        }
        for hostname in parts {
            hosts
                .entry(hostname.to_string())
                .or_default()
                .push(addr.to_string());
        }
    }
    hosts
}
