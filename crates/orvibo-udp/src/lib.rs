// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Async UDP transport for Orvibo home-automation devices.
//!
//! Orvibo devices speak a small, unauthenticated UDP protocol on the local
//! network. This crate provides the client side of it:
//!
//! - **Endpoints**: queue-backed UDP sockets that turn push delivery into
//!   `receive().await`, in [`LocalEndpoint`] (bound) and [`RemoteEndpoint`]
//!   (connected) flavors
//! - **Exchanges**: a send / wait / classify / retry loop shared by every
//!   command, driven by a caller-supplied [`Verdict`] classifier
//! - **Devices**: discovery and the S20 smart socket commands
//!
//! # Architecture
//!
//! ```text
//!  UdpTransport (tokio + socket2)
//!        |  connection_made / datagram_received / error_received / connection_lost
//!        v
//!  EndpointAdapter ---feed---> Endpoint [mailbox] ---receive---> exchange()
//!                                                                   |
//!                                               discover() / S20 ---+
//! ```
//!
//! # Example
//!
//! ```no_run
//! use orvibo_udp::{open_local_endpoint, ExchangeParams, TransportConfig, Verdict};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), orvibo_udp::EndpointError> {
//! let endpoint = open_local_endpoint("0.0.0.0", 0, &TransportConfig::default()).await?;
//! let outcome = endpoint
//!     .exchange(
//!         Some(b"PING"),
//!         "192.168.1.42:10000".parse().unwrap(),
//!         ExchangeParams::new(Duration::from_secs(1), 3),
//!         |d| {
//!             if d.payload.starts_with(b"PONG") {
//!                 Verdict::ReturnImmediately
//!             } else {
//!                 Verdict::ContinueWaiting
//!             }
//!         },
//!     )
//!     .await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use adapter::{DatagramHandler, EndpointAdapter};
pub use config::{DeviceConfig, OrviboConfig, TransportConfig};
pub use device::{discover, DiscoveredDevice, MacAddress, S20};
pub use endpoint::{
    open_datagram_endpoint, open_local_endpoint, open_remote_endpoint, Datagram, Endpoint,
    LocalEndpoint, RemoteEndpoint,
};
pub use error::{ConfigError, DeviceError, EndpointError};
pub use exchange::{ExchangeOutcome, ExchangeParams, Verdict};
pub use transport::{DatagramTransport, UdpTransport};
