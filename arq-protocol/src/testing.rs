//! Scripted transport for engine unit tests

use crate::transport::{Transport, TransportError};
use std::collections::VecDeque;
use std::time::Duration;

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>>>;

/// In-memory transport driven by a script
///
/// Every sent datagram is recorded and handed to the responder, whose replies
/// are queued for later `recv` calls. An empty inbox times out when a read
/// timeout is set and reports `Closed` otherwise.
pub(crate) struct ScriptedTransport {
    inbox: VecDeque<Vec<u8>>,
    responder: Responder,
    read_timeout: Option<Duration>,
    pub sent: Vec<Vec<u8>>,
    pub timeouts: usize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        ScriptedTransport {
            inbox: VecDeque::new(),
            responder: Box::new(|_| Vec::new()),
            read_timeout: None,
            sent: Vec::new(),
            timeouts: 0,
        }
    }

    pub fn with_responder(responder: impl FnMut(&[u8]) -> Vec<Vec<u8>> + 'static) -> Self {
        ScriptedTransport {
            responder: Box::new(responder),
            ..Self::new()
        }
    }

    pub fn push(&mut self, datagram: impl Into<Vec<u8>>) {
        self.inbox.push_back(datagram.into());
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Sequence numbers of every recorded datagram, in send order
    pub fn sent_seqs(&self) -> Vec<u8> {
        self.sent.iter().map(|d| d[0]).collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        self.sent.push(datagram.to_vec());
        let replies = (self.responder)(datagram);
        self.inbox.extend(replies);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.inbox.pop_front() {
            Some(datagram) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(n)
            }
            None if self.read_timeout.is_some() => {
                self.timeouts += 1;
                Err(TransportError::Timeout)
            }
            None => Err(TransportError::Closed),
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.read_timeout = timeout;
        Ok(())
    }
}
