// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory transport and log capture for unit tests.

use crate::transport::DatagramTransport;
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

type SendHook = Box<dyn Fn(&[u8], Option<SocketAddr>) + Send + Sync>;

/// Records every send; optionally reacts to sends through a hook.
pub(crate) struct RecordingTransport {
    sent: Mutex<Vec<(Vec<u8>, Option<SocketAddr>)>>,
    on_send: Mutex<Option<SendHook>>,
    closes: AtomicUsize,
    aborted: AtomicBool,
}

impl RecordingTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            on_send: Mutex::new(None),
            closes: AtomicUsize::new(0),
            aborted: AtomicBool::new(false),
        })
    }

    /// Run `hook` after every recorded send.
    pub(crate) fn on_send<F>(&self, hook: F)
    where
        F: Fn(&[u8], Option<SocketAddr>) + Send + Sync + 'static,
    {
        *self.on_send.lock() = Some(Box::new(hook));
    }

    pub(crate) fn sent(&self) -> Vec<(Vec<u8>, Option<SocketAddr>)> {
        self.sent.lock().clone()
    }

    pub(crate) fn send_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

impl DatagramTransport for RecordingTransport {
    fn send_to(&self, payload: &[u8], target: Option<SocketAddr>) -> io::Result<()> {
        self.sent.lock().push((payload.to_vec(), target));
        if let Some(hook) = self.on_send.lock().as_ref() {
            hook(payload, target);
        }
        Ok(())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], 10_000)))
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
