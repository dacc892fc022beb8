// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded FIFO between the transport's delivery path and the consuming task.

use super::Datagram;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// Queue element: a datagram, or the marker waking receivers on close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Slot {
    Datagram(Datagram),
    Closed,
}

/// Single-producer mailbox with drop-newest overflow.
pub(crate) struct Mailbox {
    slots: Mutex<VecDeque<Slot>>,
    /// `None` = unbounded
    capacity: Option<usize>,
    ready: Notify,
}

impl Mailbox {
    /// Create a mailbox; `capacity == 0` means unbounded.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(VecDeque::new()),
            capacity: (capacity > 0).then_some(capacity),
            ready: Notify::new(),
        }
    }

    /// Enqueue without blocking. Returns `false` when the mailbox is full.
    pub(crate) fn push(&self, slot: Slot) -> bool {
        {
            let mut slots = self.slots.lock();
            if self.capacity.is_some_and(|cap| slots.len() >= cap) {
                return false;
            }
            slots.push_back(slot);
        }
        self.ready.notify_one();
        true
    }

    /// Enqueue the close marker unless something is already waiting to be read.
    pub(crate) fn push_closed_if_empty(&self) {
        {
            let mut slots = self.slots.lock();
            if !slots.is_empty() {
                return;
            }
            slots.push_back(Slot::Closed);
        }
        self.ready.notify_one();
    }

    pub(crate) fn try_pop(&self) -> Option<Slot> {
        self.slots.lock().pop_front()
    }

    /// Future completing on the next push or [`wake_all`](Self::wake_all).
    /// Enable it before checking the queue so no wakeup is missed.
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.ready.notified()
    }

    /// Wake every task currently waiting, not just the next one.
    pub(crate) fn wake_all(&self) {
        self.ready.notify_waiters();
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub(crate) fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn datagram(byte: u8) -> Slot {
        let peer: SocketAddr = "127.0.0.1:10000".parse().unwrap();
        Slot::Datagram(Datagram::new(vec![byte], peer))
    }

    #[test]
    fn test_fifo_order() {
        let mailbox = Mailbox::new(0);
        for b in 0..5 {
            assert!(mailbox.push(datagram(b)));
        }
        for b in 0..5 {
            assert_eq!(mailbox.try_pop(), Some(datagram(b)));
        }
        assert!(mailbox.try_pop().is_none());
    }

    #[test]
    fn test_bounded_drops_newest() {
        let mailbox = Mailbox::new(2);
        assert!(mailbox.push(datagram(1)));
        assert!(mailbox.push(datagram(2)));
        assert!(!mailbox.push(datagram(3)));
        assert_eq!(mailbox.len(), 2);
        assert_eq!(mailbox.try_pop(), Some(datagram(1)));
        assert_eq!(mailbox.try_pop(), Some(datagram(2)));
    }

    #[test]
    fn test_closed_marker_only_when_empty() {
        let mailbox = Mailbox::new(1);
        assert!(mailbox.push(datagram(1)));
        mailbox.push_closed_if_empty();
        assert_eq!(mailbox.len(), 1);

        mailbox.try_pop();
        mailbox.push_closed_if_empty();
        assert_eq!(mailbox.try_pop(), Some(Slot::Closed));
        assert_eq!(mailbox.len(), 0);
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let mailbox = Mailbox::new(0);
        assert_eq!(mailbox.capacity(), None);
        for b in 0..=255u8 {
            assert!(mailbox.push(datagram(b)));
        }
        assert_eq!(mailbox.len(), 256);
    }

    #[tokio::test]
    async fn test_wait_wakes_on_push() {
        let mailbox = std::sync::Arc::new(Mailbox::new(0));
        let producer = mailbox.clone();
        let handle = tokio::spawn(async move {
            producer.push(datagram(7));
        });
        loop {
            let notified = mailbox.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(slot) = mailbox.try_pop() {
                assert_eq!(slot, datagram(7));
                break;
            }
            notified.await;
        }
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_wake_all_reaches_every_waiter() {
        let mailbox = std::sync::Arc::new(Mailbox::new(0));
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let mailbox = mailbox.clone();
            waiters.push(tokio::spawn(async move {
                mailbox.notified().await;
            }));
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        mailbox.wake_all();
        for waiter in waiters {
            tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
                .await
                .expect("waiter must wake")
                .unwrap();
        }
    }
}
