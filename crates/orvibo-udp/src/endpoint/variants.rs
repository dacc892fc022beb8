// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local and remote endpoints, and the functions that open them.

use super::{Datagram, Endpoint};
use crate::adapter::EndpointAdapter;
use crate::config::TransportConfig;
use crate::error::{EndpointError, Result};
use crate::exchange::{ExchangeOutcome, ExchangeParams, Verdict};
use crate::transport::UdpTransport;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Endpoint bound to a local address. Listens and originates exchanges.
#[derive(Debug, Clone)]
pub struct LocalEndpoint {
    inner: Endpoint,
}

impl LocalEndpoint {
    pub fn from_endpoint(inner: Endpoint) -> Self {
        Self { inner }
    }

    /// Send a datagram to `target`.
    pub fn send(&self, payload: &[u8], target: SocketAddr) -> Result<()> {
        self.inner.send(payload, Some(target))
    }

    /// Wait for the next datagram and its source address.
    pub async fn receive(&self) -> Result<Datagram> {
        self.inner.receive().await
    }

    /// Request/response exchange with `target`.
    /// See [`Endpoint::exchange`].
    pub async fn exchange<F>(
        &self,
        request: Option<&[u8]>,
        target: SocketAddr,
        params: ExchangeParams,
        classify: F,
    ) -> Result<Option<ExchangeOutcome>>
    where
        F: FnMut(&Datagram) -> Verdict,
    {
        self.inner
            .exchange(request, Some(target), params, classify)
            .await
    }

    /// Listen-only exchange: one waiting pass, nothing sent.
    pub async fn listen<F>(
        &self,
        timeout: std::time::Duration,
        classify: F,
    ) -> Result<Option<ExchangeOutcome>>
    where
        F: FnMut(&Datagram) -> Verdict,
    {
        self.inner
            .exchange(None, None, ExchangeParams::new(timeout, 1), classify)
            .await
    }

    pub fn close(&self) {
        self.inner.close();
    }

    pub fn abort(&self) -> Result<()> {
        self.inner.abort()
    }

    pub fn address(&self) -> Result<SocketAddr> {
        self.inner.address()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// The underlying endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner
    }
}

/// Endpoint connected to a single peer. Sends and receives omit the address.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    inner: Endpoint,
}

impl RemoteEndpoint {
    pub fn from_endpoint(inner: Endpoint) -> Self {
        Self { inner }
    }

    /// Send a datagram to the peer.
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        self.inner.send(payload, None)
    }

    /// Wait for the next datagram from the peer.
    pub async fn receive(&self) -> Result<Vec<u8>> {
        Ok(self.inner.receive().await?.payload)
    }

    /// Request/response exchange with the peer.
    /// See [`Endpoint::exchange`].
    pub async fn exchange<F>(
        &self,
        request: Option<&[u8]>,
        params: ExchangeParams,
        classify: F,
    ) -> Result<Option<ExchangeOutcome>>
    where
        F: FnMut(&Datagram) -> Verdict,
    {
        self.inner.exchange(request, None, params, classify).await
    }

    pub fn close(&self) {
        self.inner.close();
    }

    pub fn abort(&self) -> Result<()> {
        self.inner.abort()
    }

    pub fn address(&self) -> Result<SocketAddr> {
        self.inner.address()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// The underlying endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| EndpointError::Resolve {
            host: host.to_string(),
            port,
        })
}

/// Open a datagram endpoint.
///
/// With `remote == false` the socket is bound to `host:port`; with
/// `remote == true` it is connected to `host:port` from an ephemeral port.
pub async fn open_datagram_endpoint(
    host: &str,
    port: u16,
    remote: bool,
    config: &TransportConfig,
) -> Result<Endpoint> {
    let addr = resolve(host, port).await?;
    let endpoint = Endpoint::new(config.queue_size);
    let adapter = Arc::new(EndpointAdapter::new(&endpoint));
    if remote {
        UdpTransport::connect(addr, adapter, config)?;
    } else {
        UdpTransport::bind(addr, adapter, config)?;
    }
    debug!(
        "Opened {} endpoint for {} (queue_size={})",
        if remote { "remote" } else { "local" },
        addr,
        config.queue_size
    );
    Ok(endpoint)
}

/// Open an endpoint bound to `host:port`. Port 0 picks an ephemeral port.
pub async fn open_local_endpoint(
    host: &str,
    port: u16,
    config: &TransportConfig,
) -> Result<LocalEndpoint> {
    open_datagram_endpoint(host, port, false, config)
        .await
        .map(LocalEndpoint::from_endpoint)
}

/// Open an endpoint connected to `host:port`.
pub async fn open_remote_endpoint(
    host: &str,
    port: u16,
    config: &TransportConfig,
) -> Result<RemoteEndpoint> {
    open_datagram_endpoint(host, port, true, config)
        .await
        .map(RemoteEndpoint::from_endpoint)
}
