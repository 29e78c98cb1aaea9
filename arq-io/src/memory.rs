//! In-process datagram transport
//!
//! A pair of connected endpoints backed by crossbeam channels. Delivery is
//! reliable and ordered; wrap an endpoint in a [`Simulator`](crate::Simulator)
//! to add faults.
//!
//! Once the other endpoint is dropped, sends are discarded and receives
//! behave like a silent network: they wait out the read timeout and report
//! [`TransportError::Timeout`], or fail with [`TransportError::Closed`] when
//! no timeout is set.

use arq_protocol::{Transport, TransportError};
use crossbeam::channel::{self, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// One end of an in-memory datagram link
pub struct MemoryTransport {
    tx: channel::Sender<Vec<u8>>,
    rx: channel::Receiver<Vec<u8>>,
    read_timeout: Option<Duration>,
}

impl MemoryTransport {
    /// Create two connected endpoints
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let (a_tx, b_rx) = channel::unbounded();
        let (b_tx, a_rx) = channel::unbounded();

        (
            MemoryTransport {
                tx: a_tx,
                rx: a_rx,
                read_timeout: None,
            },
            MemoryTransport {
                tx: b_tx,
                rx: b_rx,
                read_timeout: None,
            },
        )
    }

    /// Datagrams waiting to be received
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Receive without blocking, if a datagram is already queued
    pub fn try_recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        match self.rx.try_recv() {
            Ok(datagram) => Ok(Some(Self::copy_out(datagram, buf))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn copy_out(datagram: Vec<u8>, buf: &mut [u8]) -> usize {
        let n = datagram.len().min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        n
    }

    fn disconnected(&self) -> TransportError {
        match self.read_timeout {
            Some(timeout) => {
                std::thread::sleep(timeout);
                TransportError::Timeout
            }
            None => TransportError::Closed,
        }
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        if self.tx.send(datagram.to_vec()).is_err() {
            tracing::trace!("Peer gone, dropping {} byte datagram", datagram.len());
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.read_timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(datagram) => Ok(Self::copy_out(datagram, buf)),
                Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout),
                Err(RecvTimeoutError::Disconnected) => Err(self.disconnected()),
            },
            None => match self.rx.recv() {
                Ok(datagram) => Ok(Self::copy_out(datagram, buf)),
                Err(_) => Err(self.disconnected()),
            },
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.read_timeout = timeout;
        Ok(())
    }
}
