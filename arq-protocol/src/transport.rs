//! Datagram transport abstraction
//!
//! The engines never touch sockets directly. Anything that can move whole
//! datagrams to a single peer can carry a transfer: a UDP socket, an
//! in-process channel, or a fault-injecting wrapper around either.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// No datagram arrived within the configured read timeout
    #[error("Receive timed out")]
    Timeout,

    /// The transport does not know where to send yet
    #[error("No peer address known")]
    NoPeer,

    /// The transport can never deliver another datagram
    #[error("Transport closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Whether this error is just an expired read timeout
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

/// A point-to-point datagram channel
pub trait Transport {
    /// Send one datagram to the peer
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError>;

    /// Receive one datagram into `buf`, returning its length
    ///
    /// Datagrams longer than `buf` are truncated. Blocks until a datagram
    /// arrives or the read timeout expires ([`TransportError::Timeout`]).
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Bound every subsequent `recv`; `None` blocks indefinitely
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        (**self).send(datagram)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).recv(buf)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        (**self).set_read_timeout(timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        (**self).send(datagram)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).recv(buf)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        (**self).set_read_timeout(timeout)
    }
}
