// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! tokio UDP transport.
//!
//! The socket is built with `socket2` so SO_REUSEADDR and SO_BROADCAST can be
//! set before binding, then handed to tokio. A reader task pushes every
//! `recv_from` result into the registered [`DatagramHandler`].

use super::{is_transient, DatagramTransport};
use crate::adapter::DatagramHandler;
use crate::config::TransportConfig;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// UDP socket driven by a background reader task.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    /// Peer fixed by `connect`, for remote endpoints
    peer: Option<SocketAddr>,
    shutdown: Arc<Notify>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl UdpTransport {
    /// Bind to `local` and start delivering to `handler`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(
        local: SocketAddr,
        handler: Arc<dyn DatagramHandler>,
        config: &TransportConfig,
    ) -> io::Result<Arc<Self>> {
        let socket = build_socket(local, config)?;
        Self::start(socket, None, handler, config)
    }

    /// Bind an ephemeral port, connect to `peer` and start delivering to `handler`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(
        peer: SocketAddr,
        handler: Arc<dyn DatagramHandler>,
        config: &TransportConfig,
    ) -> io::Result<Arc<Self>> {
        let local = SocketAddr::new(local_ip_for(peer, config.bind_address), 0);
        let socket = build_socket(local, config)?;
        socket.connect(&peer.into())?;
        Self::start(socket, Some(peer), handler, config)
    }

    fn start(
        socket: Socket,
        peer: Option<SocketAddr>,
        handler: Arc<dyn DatagramHandler>,
        config: &TransportConfig,
    ) -> io::Result<Arc<Self>> {
        let socket = Arc::new(UdpSocket::from_std(socket.into())?);
        debug!(
            "UDP transport local={} peer={:?}",
            socket.local_addr()?,
            peer
        );

        let transport = Arc::new(Self {
            socket: socket.clone(),
            peer,
            shutdown: Arc::new(Notify::new()),
            reader: Mutex::new(None),
        });
        handler.connection_made(transport.clone());

        let reader = tokio::spawn(read_loop(
            socket,
            handler,
            transport.shutdown.clone(),
            config.max_datagram_size,
        ));
        *transport.reader.lock() = Some(reader);
        Ok(transport)
    }

    /// Peer this transport is connected to, if any.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl DatagramTransport for UdpTransport {
    fn send_to(&self, payload: &[u8], target: Option<SocketAddr>) -> io::Result<()> {
        match (target, self.peer) {
            (None, Some(_)) => self.socket.try_send(payload)?,
            (Some(target), Some(peer)) if target == peer => self.socket.try_send(payload)?,
            (Some(target), Some(peer)) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("socket is connected to {}, cannot send to {}", peer, target),
                ))
            }
            (Some(target), None) => self.socket.try_send_to(payload, target)?,
            (None, None) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "no target address on an unconnected socket",
                ))
            }
        };
        Ok(())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn close(&self) {
        self.shutdown.notify_one();
    }

    fn abort(&self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
    }
}

async fn read_loop(
    socket: Arc<UdpSocket>,
    handler: Arc<dyn DatagramHandler>,
    shutdown: Arc<Notify>,
    buf_size: usize,
) {
    let mut buf = vec![0u8; buf_size];
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                handler.connection_lost(None);
                break;
            }
            result = socket.recv_from(&mut buf) => match result {
                Ok((len, peer)) => handler.datagram_received(buf[..len].to_vec(), peer),
                Err(err) if is_transient(&err) => handler.error_received(err),
                Err(err) => {
                    handler.connection_lost(Some(err));
                    break;
                }
            }
        }
    }
}

fn build_socket(local: SocketAddr, config: &TransportConfig) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))?;
    if config.reuse_address {
        socket.set_reuse_address(true)?;
    }
    if config.allow_broadcast && local.is_ipv4() {
        socket.set_broadcast(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&local.into())?;
    Ok(socket)
}

/// Configured bind address when it matches the peer's family, else the wildcard.
fn local_ip_for(peer: SocketAddr, configured: IpAddr) -> IpAddr {
    match (peer, configured) {
        (SocketAddr::V4(_), IpAddr::V4(_)) | (SocketAddr::V6(_), IpAddr::V6(_)) => configured,
        (SocketAddr::V4(_), _) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        (SocketAddr::V6(_), _) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}
