//! Platform connect step: one socket, one candidate address.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use tokio::net::{TcpSocket, TcpStream, UdpSocket};
use tracing::trace;

use crate::common::{ContextError, DialContext, DialError};

use super::Network;

/// Hook run after the socket is created but before it is bound or connected.
///
/// Receives the concrete network (`tcp4`, `tcp6`, `udp4`, `udp6`) and the
/// candidate address being dialed.
pub type ControlFn = dyn Fn(Network, &str, &Socket) -> io::Result<()> + Send + Sync;

/// Opens a connection to a single candidate address.
///
/// Implementations must honor the context: a cancelled context yields
/// [`DialError::Cancelled`] and an expired one [`DialError::Timeout`].
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    type Conn: Send + 'static;

    async fn connect(
        &self,
        ctx: &DialContext,
        network: Network,
        addr: &str,
    ) -> Result<Self::Conn, DialError>;
}

/// An established connection. Dropping it closes the socket.
#[derive(Debug)]
pub enum Conn {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl Conn {
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Conn::Tcp(s) => s.peer_addr(),
            Conn::Udp(s) => s.peer_addr(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Conn::Tcp(s) => s.local_addr(),
            Conn::Udp(s) => s.local_addr(),
        }
    }

    pub fn into_tcp(self) -> Option<TcpStream> {
        match self {
            Conn::Tcp(s) => Some(s),
            Conn::Udp(_) => None,
        }
    }

    pub fn into_udp(self) -> Option<UdpSocket> {
        match self {
            Conn::Udp(s) => Some(s),
            Conn::Tcp(_) => None,
        }
    }
}

pub(crate) fn context_error(err: ContextError, network: Network, addr: &str) -> DialError {
    match err {
        ContextError::Cancelled => DialError::Cancelled {
            network,
            addr: addr.to_string(),
        },
        ContextError::DeadlineExceeded => DialError::Timeout {
            network,
            addr: addr.to_string(),
        },
    }
}

/// Real sockets via `socket2` handed over to tokio.
#[derive(Default)]
pub struct SocketConnector {
    pub(crate) local_addr: Option<SocketAddr>,
    pub(crate) keep_alive: Option<Duration>,
    pub(crate) control: Option<Arc<ControlFn>>,
}

impl SocketConnector {
    fn new_socket(&self, network: Network, target: SocketAddr) -> io::Result<Socket> {
        let domain = Domain::for_address(target);
        let socket = if network.is_stream() {
            Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?
        } else {
            Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?
        };
        socket.set_nonblocking(true)?;

        if let Some(control) = &self.control {
            (control.as_ref())(concrete(network, target), &target.to_string(), &socket)?;
        }

        if let Some(local) = self.local_addr {
            if local.is_ipv4() != target.is_ipv4() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("mismatched local address {} for {}", local, target),
                ));
            }
            socket.bind(&local.into())?;
        }
        Ok(socket)
    }

    async fn connect_tcp(&self, socket: Socket, target: SocketAddr) -> io::Result<TcpStream> {
        let socket = TcpSocket::from_std_stream(std::net::TcpStream::from(socket));
        let stream = socket.connect(target).await?;

        if let Some(idle) = self.keep_alive {
            let keepalive = TcpKeepalive::new().with_time(idle).with_interval(idle);
            SockRef::from(&stream).set_tcp_keepalive(&keepalive)?;
        }
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn connect_udp(&self, socket: Socket, target: SocketAddr) -> io::Result<UdpSocket> {
        if self.local_addr.is_none() {
            let any: SocketAddr = match target {
                SocketAddr::V4(_) => (std::net::Ipv4Addr::UNSPECIFIED, 0).into(),
                SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
            };
            socket.bind(&any.into())?;
        }
        socket.connect(&target.into())?;
        UdpSocket::from_std(std::net::UdpSocket::from(socket))
    }
}

#[async_trait]
impl Connect for SocketConnector {
    type Conn = Conn;

    async fn connect(
        &self,
        ctx: &DialContext,
        network: Network,
        addr: &str,
    ) -> Result<Conn, DialError> {
        let target: SocketAddr = addr.parse().map_err(|_| DialError::InvalidAddress {
            addr: addr.to_string(),
            reason: "not an IP address",
        })?;
        let target = unmap(target);
        if !network.accepts(&target.ip()) {
            return Err(DialError::NoSuitableAddress {
                network,
                host: addr.to_string(),
            });
        }

        let socket = self
            .new_socket(network, target)
            .map_err(|e| DialError::connect(network, addr, e))?;

        let conn = if network.is_stream() {
            tokio::select! {
                biased;
                err = ctx.done() => return Err(context_error(err, network, addr)),
                res = self.connect_tcp(socket, target) => res.map(Conn::Tcp),
            }
        } else {
            self.connect_udp(socket, target).map(Conn::Udp)
        };
        let conn = conn.map_err(|e| DialError::connect(network, addr, e))?;
        trace!(network = %network, addr = addr, "socket connected");
        Ok(conn)
    }
}

/// IPv4-mapped IPv6 candidates are dialed as plain IPv4.
fn unmap(target: SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V6(v6) => match v6.ip().to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(v4.into(), v6.port()),
            None => target,
        },
        SocketAddr::V4(_) => target,
    }
}

/// The family-pinned network name for a target, as passed to the control hook.
fn concrete(network: Network, target: SocketAddr) -> Network {
    match (network.is_stream(), target.is_ipv4()) {
        (true, true) => Network::Tcp4,
        (true, false) => Network::Tcp6,
        (false, true) => Network::Udp4,
        (false, false) => Network::Udp6,
    }
}
