//! ARQ I/O and transport implementations
//!
//! This crate provides the concrete [`Transport`](arq_protocol::Transport)
//! implementations the engines run over: a UDP socket, an in-process
//! channel pair, and a fault-injecting wrapper for testing.

pub mod memory;
pub mod sim;
pub mod socket;

pub use memory::MemoryTransport;
pub use sim::{Fault, SendLog, Simulator};
pub use socket::{ArqSocket, SocketError};
