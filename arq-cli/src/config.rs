//! Configuration file support for ARQ CLI tools
//!
//! ```toml
//! [protocol]
//! window_size = 10
//! data_size = 500
//! ack_timeout_ms = 100
//! max_silent_attempts = 100
//! max_start_seq = 100
//!
//! [transfer]
//! host = "127.0.0.1"
//! bind = "0.0.0.0"
//! progress = true
//! ```
//!
//! Every key is optional. Both peers must use the same `[protocol]` geometry.

use arq::protocol::ConfigError;
use arq::ArqConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Protocol parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSection {
    /// Packets per window
    pub window_size: u8,
    /// Payload bytes per packet
    pub data_size: usize,
    /// Sender wait per ack-gathering attempt
    pub ack_timeout_ms: u64,
    /// Consecutive silent attempts before the sender gives up
    pub max_silent_attempts: u32,
    /// Window base at which the sequence cursor wraps
    pub max_start_seq: u8,
}

impl Default for ProtocolSection {
    fn default() -> Self {
        let defaults = ArqConfig::default();
        ProtocolSection {
            window_size: defaults.window_size,
            data_size: defaults.data_size,
            ack_timeout_ms: defaults.ack_timeout.as_millis() as u64,
            max_silent_attempts: defaults.max_silent_attempts,
            max_start_seq: defaults.max_start_seq,
        }
    }
}

/// Endpoint and display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSection {
    /// Receiver host the sender targets
    pub host: String,
    /// Address the receiver binds
    pub bind: String,
    /// Show the running byte count
    pub progress: bool,
}

impl Default for TransferSection {
    fn default() -> Self {
        TransferSection {
            host: "127.0.0.1".to_string(),
            bind: "0.0.0.0".to_string(),
            progress: true,
        }
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub protocol: ProtocolSection,
    pub transfer: TransferSection,
}

impl CliConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigFileError> {
        let contents = fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigFileError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validated protocol configuration
    pub fn arq_config(&self) -> Result<ArqConfig, ConfigFileError> {
        let p = &self.protocol;
        let config = ArqConfig::new()
            .with_window_size(p.window_size)
            .with_data_size(p.data_size)
            .with_ack_timeout(Duration::from_millis(p.ack_timeout_ms))
            .with_max_silent_attempts(p.max_silent_attempts)
            .with_max_start_seq(p.max_start_seq);

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol() {
        let config = CliConfig::default().arq_config().unwrap();
        assert_eq!(config, ArqConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let config: CliConfig = toml::from_str(
            r#"
            [protocol]
            ack_timeout_ms = 20

            [transfer]
            host = "10.0.0.2"
            "#,
        )
        .unwrap();

        assert_eq!(config.protocol.window_size, 10);
        assert_eq!(config.transfer.host, "10.0.0.2");
        assert_eq!(config.transfer.bind, "0.0.0.0");
        assert_eq!(
            config.arq_config().unwrap().ack_timeout,
            Duration::from_millis(20)
        );
    }

    #[test]
    fn test_invalid_geometry() {
        let mut config = CliConfig::default();
        config.protocol.max_start_seq = 95;

        let err = config.arq_config().unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Invalid(ConfigError::MisalignedWrap { .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arq.toml");

        let mut config = CliConfig::default();
        config.protocol.ack_timeout_ms = 250;
        config.transfer.progress = false;
        config.to_file(&path).unwrap();

        assert_eq!(CliConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = CliConfig::from_file("/nonexistent/arq.toml").unwrap_err();
        assert!(matches!(err, ConfigFileError::Io(_)));
    }
}
