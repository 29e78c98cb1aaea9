//! File transfer entry points
//!
//! Open the file, set up the transport and run one engine to completion.
//! Files are opened before any datagram moves, so a missing source never
//! reaches the wire.

use arq_io::{ArqSocket, SocketError};
use arq_protocol::{
    ArqConfig, ProgressFn, Receiver, ReceiverError, ReceiverStats, Sender, SenderError,
    SenderStats, Transport,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Transfer errors
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Socket setup failed: {0}")]
    Setup(#[from] SocketError),

    #[error("Cannot open {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Send failed: {0}")]
    Send(#[from] SenderError),

    #[error("Receive failed: {0}")]
    Receive(#[from] ReceiverError),
}

/// Send the file at `path` to a receiver listening on `remote`
pub fn send_file(
    path: impl AsRef<Path>,
    remote: SocketAddr,
    config: ArqConfig,
    progress: Option<ProgressFn>,
) -> Result<SenderStats, TransferError> {
    let path = path.as_ref();
    let file = open_source(path)?;
    let socket = ArqSocket::connect(remote)?;

    tracing::info!("Sending {} to {}", path.display(), remote);
    send_with(socket, file, config, progress)
}

/// Send the file at `path` over an existing transport
pub fn send_file_with<T: Transport>(
    transport: T,
    path: impl AsRef<Path>,
    config: ArqConfig,
    progress: Option<ProgressFn>,
) -> Result<SenderStats, TransferError> {
    let file = open_source(path.as_ref())?;
    send_with(transport, file, config, progress)
}

/// Receive one transfer on `local` into the file at `path`
pub fn receive_file(
    path: impl AsRef<Path>,
    local: SocketAddr,
    config: ArqConfig,
    progress: Option<ProgressFn>,
) -> Result<ReceiverStats, TransferError> {
    let socket = ArqSocket::listen(local)?;

    tracing::info!("Listening on {}", local);
    receive_file_with(socket, path, config, progress)
}

/// Receive one transfer over an existing transport into the file at `path`
pub fn receive_file_with<T: Transport>(
    transport: T,
    path: impl AsRef<Path>,
    config: ArqConfig,
    progress: Option<ProgressFn>,
) -> Result<ReceiverStats, TransferError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| TransferError::File {
        path: path.to_path_buf(),
        source,
    })?;

    let mut receiver = Receiver::new(transport, config)?;
    if let Some(progress) = progress {
        receiver = receiver.on_progress(progress);
    }

    let stats = receiver.receive(BufWriter::new(file))?;
    tracing::info!("Wrote {} bytes to {}", stats.bytes_received, path.display());
    Ok(stats)
}

fn open_source(path: &Path) -> Result<BufReader<File>, TransferError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TransferError::File {
            path: path.to_path_buf(),
            source,
        })
}

fn send_with<T: Transport>(
    transport: T,
    source: BufReader<File>,
    config: ArqConfig,
    progress: Option<ProgressFn>,
) -> Result<SenderStats, TransferError> {
    let mut sender = Sender::new(transport, config)?;
    if let Some(progress) = progress {
        sender = sender.on_progress(progress);
    }

    Ok(sender.send(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> ArqConfig {
        ArqConfig::default().with_ack_timeout(Duration::from_millis(20))
    }

    #[test]
    fn test_missing_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.bin");

        let err = send_file(&missing, "127.0.0.1:9".parse().unwrap(), fast_config(), None)
            .unwrap_err();
        match err {
            TransferError::File { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.bin");
        std::fs::write(&source, b"data").unwrap();

        let (a, _b) = arq_io::MemoryTransport::pair();
        let config = ArqConfig::default().with_window_size(0);
        let err = send_file_with(a, &source, config, None).unwrap_err();
        assert!(matches!(err, TransferError::Send(SenderError::Config(_))));
    }

    #[test]
    fn test_udp_loopback_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.bin");
        let dest = dir.path().join("out.bin");
        let data: Vec<u8> = (0..12_345u32).map(|i| (i * 7 % 251) as u8).collect();
        std::fs::write(&source, &data).unwrap();

        let listener = ArqSocket::listen("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let dest_clone = dest.clone();
        let handle = std::thread::spawn(move || {
            receive_file_with(listener, &dest_clone, fast_config(), None)
        });

        let sent = send_file(&source, addr, fast_config(), None).unwrap();
        let received = handle.join().unwrap().unwrap();

        assert_eq!(sent.bytes_sent, data.len() as u64);
        assert_eq!(received.bytes_received, data.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }
}
