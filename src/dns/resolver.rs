use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::common::DialContext;

use super::Resolver;

/// 系统 DNS 解析器（使用 tokio::net::lookup_host）
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup_host(&self, ctx: &DialContext, host: &str) -> Result<Vec<String>> {
        super::trace_start(ctx, host);
        let result = tokio::select! {
            biased;
            err = ctx.done() => Err(anyhow::Error::new(err)),
            res = tokio::net::lookup_host((host, 0)) => res
                .map(|addrs| addrs.map(|a| a.ip().to_string()).collect::<Vec<_>>())
                .map_err(anyhow::Error::from),
        };
        let result = result.and_then(|addrs| {
            if addrs.is_empty() {
                anyhow::bail!("no such host");
            }
            Ok(addrs)
        });
        super::trace_done(ctx, &result);
        if let Ok(addrs) = &result {
            debug!(host = host, count = addrs.len(), "system DNS resolved");
        }
        result
    }
}
