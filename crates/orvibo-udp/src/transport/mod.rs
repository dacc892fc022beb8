// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Datagram transport abstraction.
//!
//! Endpoints only ever see a [`DatagramTransport`] handle; delivery in the
//! other direction goes through a [`DatagramHandler`](crate::adapter::DatagramHandler).
//! [`UdpTransport`] is the tokio implementation.

mod udp;

pub use udp::UdpTransport;

use std::io;
use std::net::SocketAddr;

/// Handle to a datagram socket, as seen by an endpoint.
pub trait DatagramTransport: Send + Sync {
    /// Send without blocking. `target == None` sends to the connected peer.
    fn send_to(&self, payload: &[u8], target: Option<SocketAddr>) -> io::Result<()>;

    /// Locally bound address.
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Stop delivery and release the socket. The handler then sees
    /// `connection_lost(None)`.
    fn close(&self);

    /// Release the socket immediately. No further handler callbacks.
    fn abort(&self);
}

/// Whether a receive error leaves the socket usable.
///
/// ICMP port-unreachable and friends surface as errors on the next
/// `recv_from`, but the socket itself is fine.
pub fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
