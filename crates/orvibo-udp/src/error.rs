// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types.
//!
//! Only resource problems surface as errors. Attempt timeouts, mailbox
//! overflow and transient socket errors are absorbed where they happen.

use std::io;
use thiserror::Error;

/// Errors raised by endpoints and exchanges.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The endpoint was closed, explicitly or because its transport was lost.
    #[error("Endpoint is closed")]
    Closed,

    /// No transport has been attached to the endpoint yet.
    #[error("Endpoint has no transport attached")]
    NotConnected,

    /// Host name resolution returned no usable address.
    #[error("Cannot resolve {host}:{port}")]
    Resolve { host: String, port: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EndpointError {
    /// True if this error means the endpoint is gone for good.
    pub fn is_closed(&self) -> bool {
        matches!(self, EndpointError::Closed)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the device command layer.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),
}

/// Result alias for endpoint operations.
pub type Result<T> = std::result::Result<T, EndpointError>;
