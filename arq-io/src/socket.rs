//! UDP socket transport
//!
//! Blocking UDP socket configured through socket2. A sending socket is
//! created with [`ArqSocket::connect`] and talks to a fixed peer; a listening
//! socket from [`ArqSocket::listen`] learns its peer from every datagram it
//! receives and replies there.

use arq_protocol::{Transport, TransportError};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;
use thiserror::Error;

/// Socket setup errors
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// UDP transport for a single transfer
pub struct ArqSocket {
    inner: UdpSocket,
    /// Where datagrams go; learned from the last sender unless fixed
    peer: Option<SocketAddr>,
    fixed_peer: bool,
}

impl ArqSocket {
    /// Create a socket bound to the given address
    pub fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;

        tracing::debug!("Bound UDP socket on {}", addr);

        Ok(ArqSocket {
            inner: socket.into(),
            peer: None,
            fixed_peer: false,
        })
    }

    /// Socket that sends to `remote` from an ephemeral local port
    pub fn connect(remote: SocketAddr) -> Result<Self, SocketError> {
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let mut socket = Self::bind(local)?;
        socket.peer = Some(remote);
        socket.fixed_peer = true;
        Ok(socket)
    }

    /// Socket that waits for a peer on `local`
    pub fn listen(local: SocketAddr) -> Result<Self, SocketError> {
        Self::bind(local)
    }

    /// Peer datagrams are sent to, if known
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Get the local address this socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.inner.local_addr()?)
    }
}

impl Transport for ArqSocket {
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        let peer = self.peer.ok_or(TransportError::NoPeer)?;
        self.inner.send_to(datagram, peer)?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.inner.recv_from(buf) {
            Ok((n, from)) => {
                if !self.fixed_peer && self.peer != Some(from) {
                    tracing::debug!("Peer is now {}", from);
                    self.peer = Some(from);
                }
                Ok(n)
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Err(TransportError::Timeout)
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.inner.set_read_timeout(timeout)?;
        Ok(())
    }
}
