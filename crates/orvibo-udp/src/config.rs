// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint and device configuration.
//!
//! Supports both programmatic and file-based (TOML) configuration.
//!
//! ```toml
//! log_level = "debug"
//!
//! [transport]
//! bind_address = "0.0.0.0"
//! queue_size = 64
//!
//! [device]
//! broadcast_address = "192.168.1.255"
//! discovery_timeout_ms = 7000
//! ```

use crate::error::ConfigError;
use crate::exchange::ExchangeParams;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

/// Largest payload a UDP/IPv4 datagram can carry.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// UDP port Orvibo sockets listen on.
pub const ORVIBO_PORT: u16 = 10_000;

/// Socket and mailbox settings shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Local address to bind (default: 0.0.0.0)
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Mailbox capacity in datagrams (0 = unbounded)
    #[serde(default)]
    pub queue_size: usize,

    /// Receive buffer size; longer datagrams are truncated by the OS
    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,

    /// Set SO_REUSEADDR before binding
    #[serde(default = "default_true")]
    pub reuse_address: bool,

    /// Set SO_BROADCAST so discovery can target broadcast addresses
    #[serde(default = "default_true")]
    pub allow_broadcast: bool,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_max_datagram_size() -> usize {
    MAX_UDP_PAYLOAD
}

fn default_true() -> bool {
    true
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            queue_size: 0,
            max_datagram_size: MAX_UDP_PAYLOAD,
            reuse_address: true,
            allow_broadcast: true,
        }
    }
}

impl TransportConfig {
    /// Set the mailbox capacity.
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_datagram_size == 0 {
            return Err(ConfigError::Invalid(
                "max_datagram_size must be > 0".into(),
            ));
        }
        if self.max_datagram_size > MAX_UDP_PAYLOAD {
            return Err(ConfigError::Invalid(format!(
                "max_datagram_size must be <= {}",
                MAX_UDP_PAYLOAD
            )));
        }
        Ok(())
    }
}

/// Timeouts, retries and addressing for Orvibo device commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device UDP port (default: 10000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Local port commands are sent from (default: 10000, 0 = ephemeral)
    #[serde(default = "default_port")]
    pub local_port: u16,

    /// Destination of discovery broadcasts
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: Ipv4Addr,

    /// Per-attempt discovery budget in milliseconds
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_ms: u64,

    /// Discovery attempts
    #[serde(default = "default_retries")]
    pub discovery_retries: u32,

    /// Per-attempt command budget in milliseconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,

    /// Command attempts
    #[serde(default = "default_retries")]
    pub command_retries: u32,

    /// Age after which a subscription is renewed before the next command
    #[serde(default = "default_resubscribe_after")]
    pub resubscribe_after_secs: u64,
}

fn default_port() -> u16 {
    ORVIBO_PORT
}

fn default_broadcast_address() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}

fn default_discovery_timeout() -> u64 {
    5_000
}

fn default_command_timeout() -> u64 {
    3_000
}

fn default_retries() -> u32 {
    3
}

fn default_resubscribe_after() -> u64 {
    60
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: ORVIBO_PORT,
            local_port: ORVIBO_PORT,
            broadcast_address: Ipv4Addr::BROADCAST,
            discovery_timeout_ms: 5_000,
            discovery_retries: 3,
            command_timeout_ms: 3_000,
            command_retries: 3,
            resubscribe_after_secs: 60,
        }
    }
}

impl DeviceConfig {
    /// Exchange parameters for discovery broadcasts.
    pub fn discovery_params(&self) -> ExchangeParams {
        ExchangeParams::new(
            Duration::from_millis(self.discovery_timeout_ms),
            self.discovery_retries,
        )
    }

    /// Exchange parameters for subscribe and state change commands.
    pub fn command_params(&self) -> ExchangeParams {
        ExchangeParams::new(
            Duration::from_millis(self.command_timeout_ms),
            self.command_retries,
        )
    }

    /// Maximum subscription age.
    pub fn resubscribe_after(&self) -> Duration {
        Duration::from_secs(self.resubscribe_after_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be > 0".into()));
        }
        if self.discovery_timeout_ms == 0 || self.command_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be > 0".into()));
        }
        if self.discovery_retries == 0 || self.command_retries == 0 {
            return Err(ConfigError::Invalid("retries must be > 0".into()));
        }
        if self.resubscribe_after_secs == 0 {
            return Err(ConfigError::Invalid(
                "resubscribe_after_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrviboConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub device: DeviceConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OrviboConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            transport: TransportConfig::default(),
            device: DeviceConfig::default(),
        }
    }
}

impl OrviboConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transport.validate()?;
        self.device.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = OrviboConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.device.port, 10_000);
        assert_eq!(config.transport.queue_size, 0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: OrviboConfig = toml::from_str(
            r#"
            [device]
            broadcast_address = "192.168.25.255"
            command_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(
            config.device.broadcast_address,
            Ipv4Addr::new(192, 168, 25, 255)
        );
        assert_eq!(config.device.command_retries, 5);
        assert_eq!(config.device.discovery_retries, 3);
        assert_eq!(config.transport, TransportConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_datagram_size() {
        let mut config = OrviboConfig::default();
        config.transport.max_datagram_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = OrviboConfig::default();
        config.device.discovery_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_params_conversion() {
        let device = DeviceConfig::default();
        let params = device.command_params();
        assert_eq!(params.timeout, Duration::from_secs(3));
        assert_eq!(params.retries, 3);
        assert_eq!(device.discovery_params().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_file_round_trip() {
        let mut config = OrviboConfig::default();
        config.log_level = "debug".into();
        config.transport.queue_size = 16;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = OrviboConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[device]\ncommand_timeout_ms = 0").unwrap();
        assert!(matches!(
            OrviboConfig::from_file(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }
}
