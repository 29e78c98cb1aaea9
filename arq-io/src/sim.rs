//! Fault-injecting transport wrapper for deterministic testing.
//!
//! Real networks drop, reorder, and duplicate datagrams. [`Simulator`] wraps
//! any [`Transport`] and consults a fault plan for every outgoing datagram:
//!
//! | Fault       | Effect                                              |
//! |-------------|-----------------------------------------------------|
//! | `Deliver`   | Pass the datagram through.                          |
//! | `Drop`      | Discard it silently.                                |
//! | `Duplicate` | Deliver it twice.                                   |
//! | `Hold`      | Delay it until the next delivered datagram, so that |
//! |             | later traffic overtakes it.                         |
//!
//! The plan is a closure over the datagram's index and contents, so tests
//! decide exactly which packet or ack is lost. Wrap both endpoints to fault
//! both directions.

use arq_protocol::{Transport, TransportError};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// What happens to one outgoing datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Deliver,
    Drop,
    Duplicate,
    Hold,
}

type FaultPlan = Box<dyn FnMut(usize, &[u8]) -> Fault + Send>;

/// Record of every datagram offered to a [`Simulator`], before faults
///
/// Cloning shares the record, so a test can keep a handle while the
/// simulator moves into another thread.
#[derive(Debug, Clone, Default)]
pub struct SendLog {
    inner: Arc<Mutex<Vec<Bytes>>>,
}

impl SendLog {
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copy of every recorded datagram
    pub fn datagrams(&self) -> Vec<Bytes> {
        self.inner.lock().clone()
    }

    /// First byte of every recorded datagram
    pub fn seqs(&self) -> Vec<u8> {
        self.inner
            .lock()
            .iter()
            .filter_map(|d| d.first().copied())
            .collect()
    }

    fn push(&self, datagram: &[u8]) {
        self.inner.lock().push(Bytes::copy_from_slice(datagram));
    }
}

/// A fault-injecting wrapper around a transport
pub struct Simulator<T> {
    inner: T,
    plan: FaultPlan,
    held: Vec<Vec<u8>>,
    offered: usize,
    log: SendLog,
}

impl<T: Transport> Simulator<T> {
    /// Wrap `inner`, deciding each datagram's fate with `plan`
    pub fn new(inner: T, plan: impl FnMut(usize, &[u8]) -> Fault + Send + 'static) -> Self {
        Simulator {
            inner,
            plan: Box::new(plan),
            held: Vec::new(),
            offered: 0,
            log: SendLog::default(),
        }
    }

    /// Transparent pass-through
    pub fn passthrough(inner: T) -> Self {
        Self::new(inner, |_, _| Fault::Deliver)
    }

    /// Drop the datagrams at the given indices
    pub fn dropping(inner: T, indices: Vec<usize>) -> Self {
        Self::new(inner, move |i, _| {
            if indices.contains(&i) {
                Fault::Drop
            } else {
                Fault::Deliver
            }
        })
    }

    /// Shared handle to the send log
    pub fn log(&self) -> SendLog {
        self.log.clone()
    }

    /// Datagrams currently held back
    pub fn held(&self) -> usize {
        self.held.len()
    }

    fn deliver(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        self.inner.send(datagram)?;
        for held in std::mem::take(&mut self.held) {
            self.inner.send(&held)?;
        }
        Ok(())
    }
}

impl<T: Transport> Transport for Simulator<T> {
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        let index = self.offered;
        self.offered += 1;
        self.log.push(datagram);

        let fault = (self.plan)(index, datagram);
        if fault != Fault::Deliver {
            tracing::trace!("Simulated {:?} of datagram {}", fault, index);
        }

        match fault {
            Fault::Deliver => self.deliver(datagram),
            Fault::Drop => Ok(()),
            Fault::Duplicate => {
                self.inner.send(datagram)?;
                self.deliver(datagram)
            }
            Fault::Hold => {
                self.held.push(datagram.to_vec());
                Ok(())
            }
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.inner.recv(buf)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.inner.set_read_timeout(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTransport;

    fn drain(t: &mut MemoryTransport) -> Vec<u8> {
        let mut buf = [0u8; 8];
        let mut seen = Vec::new();
        while let Some(n) = t.try_recv(&mut buf).unwrap() {
            assert!(n > 0);
            seen.push(buf[0]);
        }
        seen
    }

    #[test]
    fn test_passthrough() {
        let (a, mut b) = MemoryTransport::pair();
        let mut sim = Simulator::passthrough(a);
        for seq in 0..3 {
            sim.send(&[seq]).unwrap();
        }
        assert_eq!(drain(&mut b), vec![0, 1, 2]);
        assert_eq!(sim.log().seqs(), vec![0, 1, 2]);
    }

    #[test]
    fn test_drop_and_duplicate() {
        let (a, mut b) = MemoryTransport::pair();
        let mut sim = Simulator::new(a, |i, _| match i {
            1 => Fault::Drop,
            2 => Fault::Duplicate,
            _ => Fault::Deliver,
        });
        for seq in 0..4 {
            sim.send(&[seq]).unwrap();
        }

        assert_eq!(drain(&mut b), vec![0, 2, 2, 3]);
        assert_eq!(sim.log().len(), 4);
    }

    #[test]
    fn test_hold_reorders() {
        let (a, mut b) = MemoryTransport::pair();
        let mut sim = Simulator::new(a, |_, d| if d[0] == 0 { Fault::Hold } else { Fault::Deliver });

        sim.send(&[0]).unwrap();
        assert_eq!(sim.held(), 1);
        sim.send(&[1]).unwrap();
        assert_eq!(sim.held(), 0);

        assert_eq!(drain(&mut b), vec![1, 0]);
    }

    #[test]
    fn test_log_is_shared() {
        let (a, _b) = MemoryTransport::pair();
        let mut sim = Simulator::dropping(a, vec![0]);
        let log = sim.log();
        assert!(log.is_empty());

        sim.send(&[7, 1]).unwrap();
        assert_eq!(log.datagrams(), vec![Bytes::from_static(&[7, 1])]);
    }
}
