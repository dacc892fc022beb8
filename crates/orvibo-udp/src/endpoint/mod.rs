// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Queue-backed UDP endpoints.
//!
//! An [`Endpoint`] turns the transport's push delivery into pull-style
//! `receive().await`. Inbound datagrams go through a bounded mailbox fed by
//! the [`EndpointAdapter`](crate::adapter::EndpointAdapter); the consuming
//! task drains it in arrival order.
//!
//! ```text
//!  socket --> UdpTransport reader --> EndpointAdapter::datagram_received
//!                                          |
//!                                          v  feed()
//!                                     [ Mailbox ] --> receive().await
//! ```

mod mailbox;
mod variants;

pub use variants::{
    open_datagram_endpoint, open_local_endpoint, open_remote_endpoint, LocalEndpoint,
    RemoteEndpoint,
};

use crate::error::{EndpointError, Result};
use crate::transport::DatagramTransport;
use mailbox::{Mailbox, Slot};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// One inbound datagram, immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Vec<u8>,
    pub peer: SocketAddr,
}

impl Datagram {
    pub fn new(payload: Vec<u8>, peer: SocketAddr) -> Self {
        Self { payload, peer }
    }

    pub fn into_parts(self) -> (Vec<u8>, SocketAddr) {
        (self.payload, self.peer)
    }
}

pub(crate) struct Shared {
    mailbox: Mailbox,
    closed: AtomicBool,
    transport: Mutex<Option<Arc<dyn DatagramTransport>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(transport) = self.transport.get_mut().take() {
            transport.close();
        }
    }
}

/// Queue-backed UDP endpoint.
///
/// Cheap to clone; all clones share one mailbox and one transport. The
/// transport is released once the endpoint is closed or every handle has
/// been dropped.
///
/// A mailbox is meant for one consumer at a time. Two exchanges racing on
/// the same endpoint will steal each other's datagrams.
#[derive(Clone)]
pub struct Endpoint {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("closed", &self.is_closed())
            .field("queued", &self.shared.mailbox.len())
            .field("capacity", &self.shared.mailbox.capacity())
            .finish()
    }
}

impl Endpoint {
    /// Create a detached endpoint; `queue_size == 0` means unbounded.
    pub fn new(queue_size: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                mailbox: Mailbox::new(queue_size),
                closed: AtomicBool::new(false),
                transport: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Bind the transport handle. Called once the socket is ready.
    pub fn attach(&self, transport: Arc<dyn DatagramTransport>) {
        if self.is_closed() {
            transport.close();
            return;
        }
        *self.shared.transport.lock() = Some(transport);
    }

    fn transport(&self) -> Option<Arc<dyn DatagramTransport>> {
        self.shared.transport.lock().clone()
    }

    /// Enqueue an inbound datagram.
    ///
    /// Never blocks: when the mailbox is full the datagram is dropped and a
    /// warning is logged.
    pub fn feed(&self, payload: Vec<u8>, peer: SocketAddr) {
        if self.is_closed() {
            debug!("Dropping datagram from {} on closed endpoint", peer);
            return;
        }
        if !self
            .shared
            .mailbox
            .push(Slot::Datagram(Datagram::new(payload, peer)))
        {
            warn!("Endpoint queue is full, dropping datagram from {}", peer);
        }
    }

    /// Send a datagram. `target == None` sends to the connected peer.
    pub fn send(&self, payload: &[u8], target: Option<SocketAddr>) -> Result<()> {
        if self.is_closed() {
            return Err(EndpointError::Closed);
        }
        let transport = self.transport().ok_or(EndpointError::NotConnected)?;
        transport.send_to(payload, target)?;
        Ok(())
    }

    /// Wait for the next datagram.
    ///
    /// Fails with [`EndpointError::Closed`] once the endpoint is closed and
    /// nothing buffered remains. Cancel-safe: dropping the future never
    /// loses a datagram.
    pub async fn receive(&self) -> Result<Datagram> {
        loop {
            let notified = self.shared.mailbox.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            match self.shared.mailbox.try_pop() {
                Some(Slot::Datagram(datagram)) => return Ok(datagram),
                Some(Slot::Closed) => return Err(EndpointError::Closed),
                None if self.is_closed() => return Err(EndpointError::Closed),
                None => notified.await,
            }
        }
    }

    /// Close the endpoint. Idempotent.
    ///
    /// A task blocked in [`receive`](Self::receive) wakes up and observes
    /// the closure.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.mailbox.push_closed_if_empty();
        // The marker only serves one receiver; the rest see `closed`.
        self.shared.mailbox.wake_all();
        let transport = self.shared.transport.lock().take();
        if let Some(transport) = transport {
            transport.close();
        }
        debug!("Endpoint closed");
    }

    /// Tear the transport down immediately, then close.
    pub fn abort(&self) -> Result<()> {
        if self.is_closed() {
            return Err(EndpointError::Closed);
        }
        if let Some(transport) = self.transport() {
            transport.abort();
        }
        self.close();
        Ok(())
    }

    /// Locally bound address.
    pub fn address(&self) -> Result<SocketAddr> {
        let transport = self.transport().ok_or(EndpointError::NotConnected)?;
        Ok(transport.local_addr()?)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Number of datagrams waiting in the mailbox.
    pub fn queued(&self) -> usize {
        self.shared.mailbox.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{LogCapture, RecordingTransport};
    use std::time::Duration;

    fn peer() -> SocketAddr {
        "192.168.25.42:10000".parse().unwrap()
    }

    fn attached(queue_size: usize) -> (Endpoint, Arc<RecordingTransport>) {
        let endpoint = Endpoint::new(queue_size);
        let transport = RecordingTransport::new();
        endpoint.attach(transport.clone());
        (endpoint, transport)
    }

    #[tokio::test]
    async fn test_receive_in_arrival_order() {
        let (endpoint, _) = attached(0);
        for i in 0..10u8 {
            endpoint.feed(vec![i], peer());
        }
        for i in 0..10u8 {
            let datagram = endpoint.receive().await.unwrap();
            assert_eq!(datagram.payload, vec![i]);
            assert_eq!(datagram.peer, peer());
        }
    }

    #[tokio::test]
    async fn test_empty_payload_is_not_closure() {
        let (endpoint, _) = attached(0);
        endpoint.feed(Vec::new(), peer());
        let datagram = endpoint.receive().await.unwrap();
        assert!(datagram.payload.is_empty());
        assert!(!endpoint.is_closed());
    }

    #[tokio::test]
    async fn test_send_goes_through_transport() {
        let (endpoint, transport) = attached(0);
        endpoint.send(b"PING", Some(peer())).unwrap();
        assert_eq!(transport.sent(), vec![(b"PING".to_vec(), Some(peer()))]);
    }

    #[tokio::test]
    async fn test_send_without_transport() {
        let endpoint = Endpoint::new(0);
        assert!(matches!(
            endpoint.send(b"PING", Some(peer())),
            Err(EndpointError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (endpoint, transport) = attached(0);
        endpoint.close();
        assert!(endpoint.send(b"PING", Some(peer())).unwrap_err().is_closed());
        assert!(transport.sent().is_empty());
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_close_wakes_pending_receive() {
        let (endpoint, _) = attached(0);
        let waiter = endpoint.clone();
        let handle = tokio::spawn(async move { waiter.receive().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        endpoint.close();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("receive must wake on close")
            .unwrap();
        assert!(matches!(result, Err(EndpointError::Closed)));
        assert!(matches!(endpoint.receive().await, Err(EndpointError::Closed)));
    }

    #[tokio::test]
    async fn test_buffered_datagrams_survive_close() {
        let (endpoint, _) = attached(0);
        endpoint.feed(b"one".to_vec(), peer());
        endpoint.feed(b"two".to_vec(), peer());
        endpoint.close();

        assert_eq!(endpoint.receive().await.unwrap().payload, b"one");
        assert_eq!(endpoint.receive().await.unwrap().payload, b"two");
        assert!(endpoint.receive().await.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (endpoint, transport) = attached(0);
        endpoint.close();
        endpoint.close();
        assert!(endpoint.is_closed());
        assert_eq!(transport.close_count(), 1);
        // A single close marker, not two.
        assert_eq!(endpoint.queued(), 1);
        assert!(endpoint.receive().await.unwrap_err().is_closed());
        assert_eq!(endpoint.queued(), 0);
    }

    #[tokio::test]
    async fn test_close_wakes_every_pending_receive() {
        let (endpoint, _) = attached(0);
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let waiter = endpoint.clone();
                tokio::spawn(async move { waiter.receive().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        endpoint.close();

        for waiter in waiters {
            let result = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("every pending receive must wake on close")
                .unwrap();
            assert!(matches!(result, Err(EndpointError::Closed)));
        }
    }

    #[tokio::test]
    async fn test_abort() {
        let (endpoint, transport) = attached(0);
        endpoint.abort().unwrap();
        assert!(transport.is_aborted());
        assert!(endpoint.is_closed());
        assert!(endpoint.abort().unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_capacity_one_drops_second_datagram() {
        let (endpoint, _) = attached(1);
        endpoint.feed(b"first".to_vec(), peer());
        endpoint.feed(b"second".to_vec(), peer());
        assert_eq!(endpoint.queued(), 1);

        assert_eq!(endpoint.receive().await.unwrap().payload, b"first");
        let next = tokio::time::timeout(Duration::from_millis(50), endpoint.receive()).await;
        assert!(next.is_err(), "second datagram must have been dropped");
    }

    #[test]
    fn test_overflow_logs_warning() {
        let (endpoint, _) = attached(1);
        let logs = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            endpoint.feed(b"first".to_vec(), peer());
            endpoint.feed(b"second".to_vec(), peer());
        });

        let output = logs.contents();
        assert_eq!(output.matches("WARN").count(), 1, "{}", output);
        assert!(output.contains("queue is full"), "{}", output);
        assert!(output.contains("192.168.25.42:10000"), "{}", output);
        assert_eq!(endpoint.queued(), 1);
    }

    #[tokio::test]
    async fn test_feed_after_close_is_ignored() {
        let (endpoint, _) = attached(0);
        endpoint.close();
        endpoint.feed(b"late".to_vec(), peer());
        assert!(endpoint.receive().await.unwrap_err().is_closed());
        assert!(endpoint.receive().await.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_address_from_transport() {
        let (endpoint, transport) = attached(0);
        assert_eq!(endpoint.address().unwrap(), transport.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_drop_releases_transport() {
        let (endpoint, transport) = attached(0);
        drop(endpoint);
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_attach_after_close_closes_transport() {
        let endpoint = Endpoint::new(0);
        endpoint.close();
        let transport = RecordingTransport::new();
        endpoint.attach(transport.clone());
        assert!(transport.is_closed());
    }
}
