use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::common::{DialError, Family};

/// Transport kind accepted by the dialer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Tcp4 => "tcp4",
            Network::Tcp6 => "tcp6",
            Network::Udp => "udp",
            Network::Udp4 => "udp4",
            Network::Udp6 => "udp6",
        }
    }

    pub fn is_stream(self) -> bool {
        matches!(self, Network::Tcp | Network::Tcp4 | Network::Tcp6)
    }

    /// Only the family-agnostic stream network races address families.
    pub fn is_dual_stack(self) -> bool {
        self == Network::Tcp
    }

    /// The single family this network is pinned to, if any.
    pub fn family(self) -> Option<Family> {
        match self {
            Network::Tcp4 | Network::Udp4 => Some(Family::V4),
            Network::Tcp6 | Network::Udp6 => Some(Family::V6),
            Network::Tcp | Network::Udp => None,
        }
    }

    pub fn accepts(self, ip: &IpAddr) -> bool {
        self.family().map_or(true, |f| f == Family::of(ip))
    }
}

impl FromStr for Network {
    type Err = DialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            "udp" => Ok(Network::Udp),
            "udp4" => Ok(Network::Udp4),
            "udp6" => Ok(Network::Udp6),
            other => Err(DialError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
