use std::net::{IpAddr, SocketAddr};

use crate::common::error::DialError;

/// 地址族标签，用于双栈分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(v6) if v6.to_ipv4_mapped().is_some() => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

/// Split "host:port", "[v6]:port" into host and port.
///
/// Follows the usual network-address rules: the host of an IPv6 literal must
/// be bracketed, a bare host without a port is rejected, and brackets are
/// only allowed around the whole host.
pub fn split_host_port(addr: &str) -> Result<(&str, &str), DialError> {
    let malformed = |reason: &'static str| DialError::InvalidAddress {
        addr: addr.to_string(),
        reason,
    };

    let colon = addr.rfind(':').ok_or_else(|| malformed("missing port in address"))?;

    let host = if addr.starts_with('[') {
        let end = addr
            .find(']')
            .ok_or_else(|| malformed("missing ']' in address"))?;
        if end + 1 == addr.len() {
            return Err(malformed("missing port in address"));
        }
        if end + 1 != colon {
            return Err(if addr[end + 1..].starts_with(':') {
                malformed("too many colons in address")
            } else {
                malformed("missing port in address")
            });
        }
        &addr[1..end]
    } else {
        let host = &addr[..colon];
        if host.contains(':') {
            return Err(malformed("too many colons in address"));
        }
        host
    };

    if host.contains('[') || host.contains(']') {
        return Err(malformed("unexpected bracket in address"));
    }
    let port = &addr[colon + 1..];
    if port.contains('[') || port.contains(']') {
        return Err(malformed("unexpected bracket in address"));
    }
    Ok((host, port))
}

/// Parse a numeric port. Service names are not looked up.
pub fn parse_port(addr: &str, port: &str) -> Result<u16, DialError> {
    port.parse::<u16>().map_err(|_| DialError::InvalidAddress {
        addr: addr.to_string(),
        reason: "invalid port",
    })
}

/// Inverse of [`split_host_port`]; hosts containing ':' get bracketed.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Family of a joined candidate address, `None` if it is not an IP literal.
pub fn family_of(addr: &str) -> Option<Family> {
    addr.parse::<SocketAddr>().ok().map(|sa| Family::of(&sa.ip()))
}

/// Whether a candidate address holds an IPv4 (or v4-mapped) literal.
pub fn is_ipv4(addr: &str) -> bool {
    family_of(addr) == Some(Family::V4)
}
