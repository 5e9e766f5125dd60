use std::io;

use thiserror::Error;

use crate::common::ContextError;
use crate::dialer::Network;

#[derive(Error, Debug)]
pub enum DialError {
    #[error("address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: &'static str },

    #[error("dial {0}: unknown network")]
    UnknownNetwork(String),

    #[error("lookup {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("dial {network} {addr}: i/o timeout")]
    Timeout { network: Network, addr: String },

    #[error("dial {network} {addr}: operation was canceled")]
    Cancelled { network: Network, addr: String },

    #[error("dial {network} {addr}: {source}")]
    Connect {
        network: Network,
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("dial {network}: missing address")]
    MissingAddress { network: Network },

    #[error("dial {network} {host}: no suitable address found")]
    NoSuitableAddress { network: Network, host: String },
}

impl DialError {
    pub fn kind(&self) -> DialErrorKind {
        match self {
            DialError::InvalidAddress { .. } => DialErrorKind::InvalidAddress,
            DialError::UnknownNetwork(_) => DialErrorKind::UnknownNetwork,
            DialError::Resolve { source, .. } => match source.downcast_ref::<ContextError>() {
                Some(ContextError::Cancelled) => DialErrorKind::Cancelled,
                Some(ContextError::DeadlineExceeded) => DialErrorKind::Timeout,
                None => DialErrorKind::Resolve,
            },
            DialError::Timeout { .. } => DialErrorKind::Timeout,
            DialError::Cancelled { .. } => DialErrorKind::Cancelled,
            DialError::Connect { source, .. } => match source.kind() {
                io::ErrorKind::TimedOut => DialErrorKind::Timeout,
                _ => DialErrorKind::Connect,
            },
            DialError::MissingAddress { .. } => DialErrorKind::MissingAddress,
            DialError::NoSuitableAddress { .. } => DialErrorKind::NoSuitableAddress,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == DialErrorKind::Timeout
    }

    /// Whether retrying the whole dial later may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// The candidate address the error belongs to, if any.
    pub fn addr(&self) -> Option<&str> {
        match self {
            DialError::InvalidAddress { addr, .. }
            | DialError::Timeout { addr, .. }
            | DialError::Cancelled { addr, .. }
            | DialError::Connect { addr, .. } => Some(addr),
            _ => None,
        }
    }

    pub(crate) fn connect(network: Network, addr: &str, source: io::Error) -> Self {
        DialError::Connect {
            network,
            addr: addr.to_string(),
            source,
        }
    }
}

/// Lightweight error category for pattern matching without borrowing the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialErrorKind {
    InvalidAddress,
    UnknownNetwork,
    Resolve,
    Timeout,
    Cancelled,
    Connect,
    MissingAddress,
    NoSuitableAddress,
}

impl DialErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            DialErrorKind::Timeout | DialErrorKind::Resolve | DialErrorKind::Connect
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DialErrorKind::InvalidAddress => "INVALID_ADDRESS",
            DialErrorKind::UnknownNetwork => "UNKNOWN_NETWORK",
            DialErrorKind::Resolve => "DNS_FAILED",
            DialErrorKind::Timeout => "TIMEOUT",
            DialErrorKind::Cancelled => "CANCELLED",
            DialErrorKind::Connect => "CONNECT_FAILED",
            DialErrorKind::MissingAddress => "MISSING_ADDRESS",
            DialErrorKind::NoSuitableAddress => "NO_SUITABLE_ADDRESS",
        }
    }
}

impl From<DialError> for io::Error {
    fn from(e: DialError) -> Self {
        let kind = match e.kind() {
            DialErrorKind::InvalidAddress | DialErrorKind::UnknownNetwork => {
                io::ErrorKind::InvalidInput
            }
            DialErrorKind::Timeout => io::ErrorKind::TimedOut,
            DialErrorKind::Cancelled => io::ErrorKind::Interrupted,
            DialErrorKind::Connect => match &e {
                DialError::Connect { source, .. } => source.kind(),
                _ => io::ErrorKind::Other,
            },
            DialErrorKind::MissingAddress | DialErrorKind::NoSuitableAddress => {
                io::ErrorKind::AddrNotAvailable
            }
            DialErrorKind::Resolve => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_interrupted_by_context_takes_context_kind() {
        let cancelled = DialError::Resolve {
            host: "example.com".into(),
            source: anyhow::Error::new(ContextError::Cancelled),
        };
        assert_eq!(cancelled.kind(), DialErrorKind::Cancelled);
        assert!(!cancelled.is_retryable());

        let expired = DialError::Resolve {
            host: "example.com".into(),
            source: anyhow::Error::new(ContextError::DeadlineExceeded),
        };
        assert!(expired.is_timeout());

        let failed = DialError::Resolve {
            host: "example.com".into(),
            source: anyhow::anyhow!("no such host"),
        };
        assert_eq!(failed.kind(), DialErrorKind::Resolve);
    }

    #[test]
    fn timed_out_connect_classifies_as_timeout() {
        let err = DialError::connect(
            Network::Tcp,
            "10.0.0.1:80",
            io::Error::new(io::ErrorKind::TimedOut, "timed out"),
        );
        assert!(err.is_timeout());
        assert_eq!(err.addr(), Some("10.0.0.1:80"));
    }

    #[test]
    fn refused_connect_is_retryable_not_timeout() {
        let err = DialError::connect(
            Network::Tcp,
            "10.0.0.1:80",
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );
        assert_eq!(err.kind(), DialErrorKind::Connect);
        assert!(err.is_retryable());
        assert!(!err.is_timeout());
    }

    #[test]
    fn missing_address_is_distinct() {
        let err = DialError::MissingAddress {
            network: Network::Tcp,
        };
        assert_eq!(err.kind(), DialErrorKind::MissingAddress);
        assert_eq!(err.to_string(), "dial tcp: missing address");
        assert!(!err.is_retryable());
        assert!(err.addr().is_none());
    }

    #[test]
    fn resolve_keeps_source_message() {
        let err = DialError::Resolve {
            host: "nope.invalid".into(),
            source: anyhow::anyhow!("no such host"),
        };
        assert_eq!(err.to_string(), "lookup nope.invalid: no such host");
        assert_eq!(err.kind().as_str(), "DNS_FAILED");
    }

    #[test]
    fn into_io_error_preserves_kind() {
        let err: io::Error = DialError::Timeout {
            network: Network::Tcp,
            addr: "1.2.3.4:5".into(),
        }
        .into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        let err: io::Error = DialError::connect(
            Network::Tcp,
            "1.2.3.4:5",
            io::Error::from(io::ErrorKind::ConnectionRefused),
        )
        .into();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }
}
