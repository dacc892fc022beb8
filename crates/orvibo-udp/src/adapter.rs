// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Glue between socket events and an [`Endpoint`].

use crate::endpoint::{Endpoint, Shared};
use crate::transport::DatagramTransport;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use tracing::warn;

/// Receiver of socket events.
///
/// Called from the transport's delivery task; implementations must not block.
pub trait DatagramHandler: Send + Sync {
    /// The socket is bound (or connected) and ready.
    fn connection_made(&self, transport: Arc<dyn DatagramTransport>);

    /// A datagram arrived.
    fn datagram_received(&self, payload: Vec<u8>, peer: SocketAddr);

    /// A non-fatal socket error, e.g. ICMP port unreachable.
    fn error_received(&self, error: io::Error);

    /// The socket is gone. `None` after a regular close.
    fn connection_lost(&self, error: Option<io::Error>);
}

/// Forwards socket events into an endpoint's mailbox.
///
/// Holds the endpoint weakly so that dropping the last user handle releases
/// the transport.
pub struct EndpointAdapter {
    endpoint: Weak<Shared>,
}

impl EndpointAdapter {
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            endpoint: endpoint.downgrade(),
        }
    }

    fn endpoint(&self) -> Option<Endpoint> {
        self.endpoint.upgrade().map(Endpoint::from_shared)
    }
}

impl DatagramHandler for EndpointAdapter {
    fn connection_made(&self, transport: Arc<dyn DatagramTransport>) {
        match self.endpoint() {
            Some(endpoint) => endpoint.attach(transport),
            None => transport.close(),
        }
    }

    fn datagram_received(&self, payload: Vec<u8>, peer: SocketAddr) {
        if let Some(endpoint) = self.endpoint() {
            endpoint.feed(payload, peer);
        }
    }

    fn error_received(&self, error: io::Error) {
        warn!("Endpoint received an error: {}", error);
    }

    fn connection_lost(&self, error: Option<io::Error>) {
        if let Some(error) = error {
            warn!("Endpoint lost the connection: {}", error);
        }
        if let Some(endpoint) = self.endpoint() {
            endpoint.close();
        }
    }
}
