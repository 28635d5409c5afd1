// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! A thread-safe, typed FIFO message queue with urgent insertion,
//! blocking/non-blocking reads, and type-filtered reads.
//!
//! Used both for client requests flowing into the analyzer thread and for
//! sample batches flowing out of worker callbacks — the same queue type
//! carries both, discriminated by [`Tagged::Tag`].
//!
//! # Example
//!
//! ```rust
//! use suscan_inspector::mq::{MessageQueue, Tagged};
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct Packet(u32);
//!
//! impl Tagged for Packet {
//!     type Tag = u32;
//!     fn tag(&self) -> u32 { self.0 }
//! }
//!
//! let q: MessageQueue<Packet> = MessageQueue::new();
//! q.push(Packet(1));
//! q.push_urgent(Packet(2));
//! assert_eq!(q.read().unwrap().0, 2);
//! assert_eq!(q.read().unwrap().0, 1);
//! ```

mod freelist;

use freelist::{Freelist, Node};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

use crate::error::{Error, Result};

/// A message payload that can be filtered by type when reading from a
/// [`MessageQueue`].
pub trait Tagged: Send + 'static {
    type Tag: Copy + PartialEq + Send + 'static;
    fn tag(&self) -> Self::Tag;
}

struct Inner<T> {
    queue: VecDeque<Box<Node<T>>>,
    closed: bool,
}

/// Thread-safe FIFO of typed messages.
///
/// Backed by a `VecDeque` of recyclable boxed node shells rather than a
/// hand-rolled linked list; the node-shell recycling (the `freelist`
/// feature) is what the original design's message-node pool mapped to.
pub struct MessageQueue<T: Tagged> {
    inner: Mutex<Inner<T>>,
    cv: Condvar,
    freelist: Freelist<T>,
}

impl<T: Tagged> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tagged> MessageQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                closed: false,
            }),
            cv: Condvar::new(),
            freelist: Freelist::new(),
        }
    }

    #[cfg(feature = "freelist")]
    fn acquire_node(&self, payload: T) -> Box<Node<T>> {
        let mut node = self.freelist.acquire();
        node.slot = Some(payload);
        node
    }

    #[cfg(not(feature = "freelist"))]
    fn acquire_node(&self, payload: T) -> Box<Node<T>> {
        Node::filled(payload)
    }

    #[cfg(feature = "freelist")]
    fn release_node(&self, node: Box<Node<T>>) {
        self.freelist.release(node);
    }

    #[cfg(not(feature = "freelist"))]
    fn release_node(&self, node: Box<Node<T>>) {
        drop(node);
    }

    /// Append `payload` at the tail and wake any blocked readers. The only
    /// failure mode is a closed queue (after [`MessageQueue::finalize`]).
    pub fn push(&self, payload: T) -> Result<()> {
        let node = self.acquire_node(payload);
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::QueueClosed);
        }
        inner.queue.push_back(node);
        drop(inner);
        self.cv.notify_all();
        Ok(())
    }

    /// Prepend `payload` at the head: observed by any subsequent reader
    /// before every message already queued, but not reordered against
    /// pushes that happen later.
    pub fn push_urgent(&self, payload: T) -> Result<()> {
        let node = self.acquire_node(payload);
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::QueueClosed);
        }
        inner.queue.push_front(node);
        drop(inner);
        self.cv.notify_all();
        Ok(())
    }

    /// Block until any message is available, detach and return it.
    pub fn read(&self) -> Result<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(mut node) = inner.queue.pop_front() {
                let payload = node.slot.take().expect("queued node always carries a payload");
                drop(inner);
                self.release_node(node);
                return Ok(payload);
            }
            if inner.closed {
                return Err(Error::QueueClosed);
            }
            self.cv.wait(&mut inner);
        }
    }

    /// Block until a message of type `tag` is available, scanning past
    /// (and preserving the order of) any other messages in front of it.
    pub fn read_typed(&self, tag: T::Tag) -> Result<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(pos) = inner.queue.iter().position(|n| {
                n.slot.as_ref().expect("queued node always carries a payload").tag() == tag
            }) {
                let mut node = inner.queue.remove(pos).expect("position came from this deque");
                let payload = node.slot.take().expect("queued node always carries a payload");
                drop(inner);
                self.release_node(node);
                return Ok(payload);
            }
            if inner.closed {
                return Err(Error::QueueClosed);
            }
            self.cv.wait(&mut inner);
        }
    }

    /// Non-blocking variant of [`MessageQueue::read`].
    pub fn poll(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        let mut node = inner.queue.pop_front()?;
        let payload = node.slot.take().expect("queued node always carries a payload");
        drop(inner);
        self.release_node(node);
        Some(payload)
    }

    /// Non-blocking variant of [`MessageQueue::read_typed`].
    pub fn poll_typed(&self, tag: T::Tag) -> Option<T> {
        let mut inner = self.inner.lock();
        let pos = inner
            .queue
            .iter()
            .position(|n| n.slot.as_ref().expect("queued node always carries a payload").tag() == tag)?;
        let mut node = inner.queue.remove(pos).expect("position came from this deque");
        let payload = node.slot.take().expect("queued node always carries a payload");
        drop(inner);
        self.release_node(node);
        Some(payload)
    }

    /// Drain and destroy all remaining messages, then mark the queue
    /// permanently closed: every blocked and future reader wakes with
    /// [`Error::QueueClosed`] instead of hanging forever.
    pub fn finalize(&self) {
        let mut inner = self.inner.lock();
        inner.queue.clear();
        inner.closed = true;
        drop(inner);
        self.cv.notify_all();
    }

    /// Number of messages currently queued. For diagnostics only — racy
    /// the instant the lock is released.
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
