//! Outbound connection establishment with pluggable name resolution.
//!
//! [`Dialer`] resolves a `host:port` target through a [`Resolver`] (for
//! example an [`OverrideResolver`] in front of the system resolver) and
//! connects to one of the resulting addresses, racing IPv6 against IPv4
//! when both are available.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use dialstack::{DialContext, Dialer, DialerConfig, OverrideResolver};
//!
//! # async fn run() -> Result<(), dialstack::DialError> {
//! let mut hosts = HashMap::new();
//! hosts.insert("example.com".to_string(), vec!["127.0.0.1".to_string()]);
//!
//! let dialer = Dialer::with_resolver(
//!     DialerConfig::default(),
//!     Arc::new(OverrideResolver::new(hosts)),
//! )?;
//! let conn = dialer
//!     .dial_context(&DialContext::new(), "tcp", "example.com:8080")
//!     .await?;
//! println!("connected to {:?}", conn.peer_addr());
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod config;
pub mod dialer;
pub mod dns;

pub use common::{ContextError, DialContext, DialError, DialErrorKind};
pub use dialer::{Conn, Connect, Dialer, DialerConfig, Network};
pub use dns::{DnsTrace, OverrideResolver, Resolver, SystemResolver};
