//! Outbound dialer with pluggable name resolution and dual-stack racing.
//!
//! A dial resolves the target host, splits the candidates by address family
//! and either walks them serially or races the two families against each
//! other (RFC 6555 fast fallback):
//!
//! - Resolve via the configured [`Resolver`] (literal IPs skip it)
//! - Partition by the family of the first resolved address
//! - Serial attempts per family, sharing the remaining deadline
//! - Delayed fallback family start, first connection wins

pub mod deadline;
pub mod network;
pub mod partition;
pub mod race;
pub mod serial;
pub mod socket;

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::debug;

use crate::common::addr::{join_host_port, parse_port, split_host_port};
use crate::common::{DialContext, DialError};
use crate::dns::{Resolver, SystemResolver};

pub use network::Network;
pub use socket::{Conn, Connect, ControlFn, SocketConnector};

use socket::context_error;

/// Fast-fallback delay used when none is configured.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(300);

/// Keep-alive probe interval used when none is configured.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Dialer configuration. Absent and zero values mean "use the default".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DialerConfig {
    /// Maximum time a dial may take, in milliseconds. Split across
    /// candidate addresses when a host has several.
    #[serde(rename = "timeout")]
    pub timeout_ms: Option<u64>,

    /// Absolute point after which dials fail.
    #[serde(skip)]
    pub deadline: Option<Instant>,

    /// Local address to bind before connecting: an IP or IP:port.
    #[serde(rename = "bind-address")]
    pub bind_address: Option<String>,

    /// Milliseconds to give the primary family before starting the
    /// fallback family. Zero means 300 ms, negative disables racing.
    #[serde(rename = "fallback-delay")]
    pub fallback_delay_ms: Option<i64>,

    /// TCP keep-alive interval in seconds. Zero means 15 s, negative disables.
    #[serde(rename = "keep-alive")]
    pub keep_alive_secs: Option<i64>,
}

impl DialerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn dual_stack(&self) -> bool {
        self.fallback_delay_ms.unwrap_or(0) >= 0
    }

    pub fn fallback_delay(&self) -> Duration {
        match self.fallback_delay_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms as u64),
            _ => DEFAULT_FALLBACK_DELAY,
        }
    }

    pub fn keep_alive(&self) -> Option<Duration> {
        match self.keep_alive_secs {
            Some(secs) if secs < 0 => None,
            Some(secs) if secs > 0 => Some(Duration::from_secs(secs as u64)),
            _ => Some(DEFAULT_KEEP_ALIVE),
        }
    }

    pub fn local_addr(&self) -> Result<Option<SocketAddr>, DialError> {
        let Some(bind) = self.bind_address.as_deref() else {
            return Ok(None);
        };
        if let Ok(ip) = bind.parse::<IpAddr>() {
            return Ok(Some(SocketAddr::new(ip, 0)));
        }
        bind.parse::<SocketAddr>()
            .map(Some)
            .map_err(|_| DialError::InvalidAddress {
                addr: bind.to_string(),
                reason: "invalid bind address",
            })
    }
}

/// Connects to `host:port` targets.
#[derive(Clone)]
pub struct Dialer {
    config: DialerConfig,
    resolver: Arc<dyn Resolver>,
    connector: Arc<SocketConnector>,
}

impl Dialer {
    /// A dialer that resolves through the system resolver.
    pub fn new(config: DialerConfig) -> Result<Self, DialError> {
        Self::with_resolver(config, Arc::new(SystemResolver))
    }

    pub fn with_resolver(
        config: DialerConfig,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self, DialError> {
        let connector = SocketConnector {
            local_addr: config.local_addr()?,
            keep_alive: config.keep_alive(),
            control: None,
        };
        Ok(Self {
            config,
            resolver,
            connector: Arc::new(connector),
        })
    }

    /// Install a hook run on every socket before it is bound or connected.
    pub fn with_control<F>(mut self, control: F) -> Self
    where
        F: Fn(Network, &str, &socket2::Socket) -> io::Result<()> + Send + Sync + 'static,
    {
        let connector = SocketConnector {
            local_addr: self.connector.local_addr,
            keep_alive: self.connector.keep_alive,
            control: Some(Arc::new(control)),
        };
        self.connector = Arc::new(connector);
        self
    }

    pub fn config(&self) -> &DialerConfig {
        &self.config
    }

    /// Dial under a background context.
    pub async fn dial(&self, network: &str, address: &str) -> Result<Conn, DialError> {
        self.dial_context(&DialContext::new(), network, address).await
    }

    /// Connect to `address` on `network`.
    ///
    /// Once connected, later expiry or cancellation of `ctx` does not
    /// affect the returned connection. When the host resolves to several
    /// addresses, the remaining time is split across the attempts.
    pub async fn dial_context(
        &self,
        ctx: &DialContext,
        network: &str,
        address: &str,
    ) -> Result<Conn, DialError> {
        let network: Network = network.parse()?;
        let ctx = self.effective_context(ctx);

        let (host, port) = split_host_port(address)?;
        let port = parse_port(address, port)?;

        let addrs = self.resolve(&ctx, network, host, port).await?;

        let (primaries, fallbacks) = if self.config.dual_stack() && network.is_dual_stack() {
            partition::partition(addrs)
        } else {
            (addrs, Vec::new())
        };

        debug!(
            network = %network,
            address = address,
            primaries = primaries.len(),
            fallbacks = fallbacks.len(),
            "dialing"
        );

        if fallbacks.is_empty() {
            serial::dial_serial(self.connector.as_ref(), &ctx, network, &primaries).await
        } else {
            race::dial_parallel(
                self.connector.clone(),
                &ctx,
                network,
                primaries,
                fallbacks,
                self.config.fallback_delay(),
            )
            .await
        }
    }

    /// Fold the configured timeout and deadline into the caller's context.
    fn effective_context(&self, ctx: &DialContext) -> DialContext {
        let mut ctx = ctx.child();
        if let Some(timeout) = self.config.timeout() {
            ctx = ctx.with_timeout(timeout);
        }
        if let Some(deadline) = self.config.deadline {
            ctx = ctx.with_deadline(deadline);
        }
        ctx
    }

    async fn resolve(
        &self,
        ctx: &DialContext,
        network: Network,
        host: &str,
        port: u16,
    ) -> Result<Vec<String>, DialError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            if !network.accepts(&ip) {
                return Err(DialError::NoSuitableAddress {
                    network,
                    host: host.to_string(),
                });
            }
            return Ok(vec![join_host_port(host, port)]);
        }

        if let Some(err) = ctx.err() {
            return Err(context_error(err, network, &join_host_port(host, port)));
        }

        let records = self
            .resolver
            .lookup_host(ctx, host)
            .await
            .map_err(|source| DialError::Resolve {
                host: host.to_string(),
                source,
            })?;

        let resolved = records.len();
        let addrs: Vec<String> = records
            .iter()
            .filter(|r| {
                // Records that are not IP literals are left for the connect
                // step to reject.
                r.parse::<IpAddr>().map_or(true, |ip| network.accepts(&ip))
            })
            .map(|r| join_host_port(r, port))
            .collect();

        if addrs.is_empty() && resolved > 0 {
            return Err(DialError::NoSuitableAddress {
                network,
                host: host.to_string(),
            });
        }
        Ok(addrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::common::DialErrorKind;
    use crate::dns::OverrideResolver;

    fn override_dialer(
        config: DialerConfig,
        host: &str,
        records: &[&str],
    ) -> Dialer {
        let mut hosts = HashMap::new();
        hosts.insert(
            host.to_string(),
            records.iter().map(|r| r.to_string()).collect(),
        );
        Dialer::with_resolver(config, Arc::new(OverrideResolver::new(hosts))).unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = DialerConfig::default();
        assert!(config.timeout().is_none());
        assert!(config.deadline.is_none());
        assert!(config.dual_stack());
        assert_eq!(config.fallback_delay(), DEFAULT_FALLBACK_DELAY);
        assert_eq!(config.keep_alive(), Some(DEFAULT_KEEP_ALIVE));
        assert_eq!(config.local_addr().unwrap(), None);
    }

    #[test]
    fn config_negative_values_disable() {
        let config = DialerConfig {
            fallback_delay_ms: Some(-1),
            keep_alive_secs: Some(-1),
            ..Default::default()
        };
        assert!(!config.dual_stack());
        assert!(config.keep_alive().is_none());
    }

    #[test]
    fn config_explicit_values() {
        let config = DialerConfig {
            timeout_ms: Some(2500),
            fallback_delay_ms: Some(50),
            keep_alive_secs: Some(30),
            bind_address: Some("192.168.1.10:4000".into()),
            ..Default::default()
        };
        assert_eq!(config.timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.fallback_delay(), Duration::from_millis(50));
        assert_eq!(config.keep_alive(), Some(Duration::from_secs(30)));
        assert_eq!(
            config.local_addr().unwrap(),
            Some("192.168.1.10:4000".parse().unwrap())
        );
    }

    #[test]
    fn config_bind_address_ip_only() {
        let config = DialerConfig {
            bind_address: Some("::1".into()),
            ..Default::default()
        };
        assert_eq!(config.local_addr().unwrap(), Some("[::1]:0".parse().unwrap()));
    }

    #[test]
    fn invalid_bind_address_rejected() {
        let config = DialerConfig {
            bind_address: Some("eth0".into()),
            ..Default::default()
        };
        assert!(Dialer::new(config).is_err());
    }

    #[test]
    fn config_deserialize() {
        let yaml = r#"
timeout: 10000
bind-address: "192.168.1.1"
fallback-delay: -1
keep-alive: 60
"#;
        let config: DialerConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.bind_address.as_deref(), Some("192.168.1.1"));
        assert!(!config.dual_stack());
        assert_eq!(config.keep_alive(), Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn dial_localhost_literal() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let dialer = Dialer::new(DialerConfig::default()).unwrap();
        let conn = dialer.dial("tcp", &addr.to_string()).await.unwrap();
        assert_eq!(conn.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn dial_through_override() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let dialer = override_dialer(DialerConfig::default(), "example.com", &["127.0.0.1"]);
        let conn = dialer
            .dial("tcp", &format!("example.com:{}", addr.port()))
            .await
            .unwrap();
        assert_eq!(conn.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn malformed_target() {
        let dialer = Dialer::new(DialerConfig::default()).unwrap();
        let err = dialer.dial("tcp", "example.com").await.unwrap_err();
        assert!(matches!(err, DialError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn unknown_network() {
        let dialer = Dialer::new(DialerConfig::default()).unwrap();
        let err = dialer.dial("ip", "127.0.0.1:80").await.unwrap_err();
        assert!(matches!(err, DialError::UnknownNetwork(_)));
    }

    #[tokio::test]
    async fn pinned_network_without_matching_family() {
        let dialer = override_dialer(DialerConfig::default(), "v6only.test", &["::1"]);
        let err = dialer.dial("tcp4", "v6only.test:80").await.unwrap_err();
        assert!(matches!(err, DialError::NoSuitableAddress { .. }));

        let err = dialer.dial("tcp6", "127.0.0.1:80").await.unwrap_err();
        assert!(matches!(err, DialError::NoSuitableAddress { .. }));
    }

    #[tokio::test]
    async fn bad_override_record_is_connect_step_error() {
        let dialer = override_dialer(DialerConfig::default(), "broken.test", &["not-an-ip"]);
        let err = dialer.dial("tcp", "broken.test:80").await.unwrap_err();
        assert!(matches!(err, DialError::InvalidAddress { ref addr, .. } if addr == "not-an-ip:80"));
    }

    #[tokio::test]
    async fn racing_falls_back_across_families() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // The IPv6 documentation prefix is never reachable, so the IPv4
        // fallback has to win.
        let config = DialerConfig {
            timeout_ms: Some(5000),
            fallback_delay_ms: Some(50),
            ..Default::default()
        };
        let dialer = override_dialer(config, "dual.test", &["2001:db8::1", "127.0.0.1"]);
        let conn = dialer
            .dial("tcp", &format!("dual.test:{}", addr.port()))
            .await
            .unwrap();
        assert_eq!(conn.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn expired_config_deadline_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = DialerConfig {
            deadline: Some(Instant::now() - Duration::from_millis(1)),
            ..Default::default()
        };
        let dialer = Dialer::new(config).unwrap();
        let err = dialer.dial("tcp", &addr.to_string()).await.unwrap_err();
        assert!(err.is_timeout());
    }

    /// Never answers on its own; gives up only when the context ends.
    struct StalledResolver {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Resolver for StalledResolver {
        async fn lookup_host(&self, ctx: &DialContext, _host: &str) -> anyhow::Result<Vec<String>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(anyhow::Error::new(ctx.done().await))
        }
    }

    fn stalled_dialer() -> (Dialer, Arc<StalledResolver>) {
        let resolver = Arc::new(StalledResolver {
            calls: Default::default(),
        });
        let dialer = Dialer::with_resolver(DialerConfig::default(), resolver.clone()).unwrap();
        (dialer, resolver)
    }

    #[tokio::test]
    async fn cancelled_before_lookup_skips_resolver() {
        let (dialer, resolver) = stalled_dialer();
        let ctx = DialContext::new();
        ctx.cancel();

        let err = dialer
            .dial_context(&ctx, "tcp", "localhost:80")
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::Cancelled { ref addr, .. } if addr == "localhost:80"));
        assert_eq!(resolver.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_during_lookup_is_timeout() {
        let (dialer, resolver) = stalled_dialer();
        let ctx = DialContext::new().with_timeout(Duration::from_secs(1));

        let err = dialer
            .dial_context(&ctx, "tcp", "slow.test:80")
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::Resolve { .. }));
        assert!(err.is_timeout());
        assert_eq!(resolver.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_during_lookup_is_cancelled() {
        let (dialer, _) = stalled_dialer();
        let ctx = DialContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = dialer
            .dial_context(&ctx, "tcp", "slow.test:80")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DialErrorKind::Cancelled);
        assert!(!err.is_retryable());
    }
}
