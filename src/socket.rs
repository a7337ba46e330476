//! Address resolution and socket setup.
//!
//! The sending role actively connects to `host:port`; the receiving role
//! listens on `0.0.0.0:port`, accepts exactly one connection and closes the
//! listening socket. Resolution is IPv4 only: a dotted address is tried first
//! and name resolution is the fallback.

use std::io::{Error as IoError, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, info};

use crate::error::SetupError;
use crate::target::Target;

/// Backlog for the listening socket; only one peer is ever accepted.
const LISTEN_BACKLOG: i32 = 1;

/// Resolves a host to an IPv4 socket address.
///
/// # Errors
/// `SetupError::Resolve` if the host is neither a dotted IPv4 address nor a
/// name that resolves to at least one IPv4 address.
pub fn resolve_ipv4(host: &str, port: u16) -> Result<SocketAddrV4, SetupError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(SocketAddrV4::new(ip, port));
    }

    let resolved = (host, port).to_socket_addrs().map_err(|source| SetupError::Resolve {
        host: host.to_string(),
        source,
    })?;

    resolved
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| SetupError::Resolve {
            host: host.to_string(),
            source: IoError::new(ErrorKind::NotFound, "no IPv4 address for host"),
        })
}

fn new_stream_socket() -> Result<Socket, SetupError> {
    Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP)).map_err(SetupError::Socket)
}

/// Connects a TCP stream to the target (sending role).
///
/// # Errors
/// Resolution, socket creation and connect failures, each with the OS error.
pub fn connect(target: &Target) -> Result<TcpStream, SetupError> {
    let addr = resolve_ipv4(&target.host, target.port)?;
    let socket = new_stream_socket()?;

    socket
        .connect(&SockAddr::from(addr))
        .map_err(|source| SetupError::Connect {
            addr: addr.to_string(),
            source,
        })?;

    info!(peer = %addr, "connected");
    Ok(TcpStream::from(socket))
}

/// A bound, listening socket that has not accepted its peer yet.
#[derive(Debug)]
pub struct Listener {
    socket: Socket,
    local_addr: SocketAddr,
}

impl Listener {
    /// Address the listener is bound to. Useful when binding port 0.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Blocks until one peer connects, then closes the listening socket.
    ///
    /// # Errors
    /// `SetupError::Accept` with the OS error.
    pub fn accept_one(self) -> Result<(TcpStream, SocketAddr), SetupError> {
        let (conn, peer) = self.socket.accept().map_err(SetupError::Accept)?;
        let peer = peer
            .as_socket()
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)));

        info!(%peer, local = %self.local_addr, "accepted connection");
        Ok((TcpStream::from(conn), peer))
    }
}

/// Binds `0.0.0.0:port` with address reuse enabled and starts listening.
///
/// # Errors
/// Socket creation, `SO_REUSEADDR`, bind and listen failures.
pub fn bind_listener(port: u16) -> Result<Listener, SetupError> {
    let socket = new_stream_socket()?;
    socket.set_reuse_address(true).map_err(SetupError::SetOption)?;

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket
        .bind(&SockAddr::from(addr))
        .map_err(|source| SetupError::Bind { port, source })?;
    socket.listen(LISTEN_BACKLOG).map_err(SetupError::Listen)?;

    let local_addr = socket
        .local_addr()
        .map_err(SetupError::Listen)?
        .as_socket()
        .unwrap_or(SocketAddr::V4(addr));

    debug!(local = %local_addr, "listening");
    Ok(Listener { socket, local_addr })
}

/// Listens on `port` and returns the single accepted connection (receiving role).
///
/// # Errors
/// Any bind, listen or accept failure.
pub fn listen_accept(port: u16) -> Result<TcpStream, SetupError> {
    let (stream, _) = bind_listener(port)?.accept_one()?;
    Ok(stream)
}
