// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide freelist of boxed queue-node shells.
//!
//! Pooling the boxed node allocation (not the payload) lets a hot
//! push/pop cycle avoid the allocator entirely once the pool has warmed up.
//! Disabled by the `freelist` Cargo feature being turned off, in which case
//! every node is a fresh allocation — see `mq::MessageQueue`.

use crate::config::FREELIST_WARN_EVERY;
use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The boxed shell stored in a [`MessageQueue`](crate::mq::MessageQueue)'s
/// internal deque. Its payload is taken out on pop, leaving an empty shell
/// that can be recycled.
pub(crate) struct Node<T> {
    pub slot: Option<T>,
}

impl<T> Node<T> {
    pub fn filled(value: T) -> Box<Self> {
        Box::new(Self { slot: Some(value) })
    }
}

pub(crate) struct Freelist<T> {
    pool: SegQueue<Box<Node<T>>>,
    size: AtomicUsize,
    peak: AtomicUsize,
}

impl<T> Freelist<T> {
    pub fn new() -> Self {
        Self {
            pool: SegQueue::new(),
            size: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn acquire(&self) -> Box<Node<T>> {
        match self.pool.pop() {
            Some(node) => {
                self.size.fetch_sub(1, Ordering::Relaxed);
                node
            }
            None => Box::new(Node { slot: None }),
        }
    }

    pub fn release(&self, mut node: Box<Node<T>>) {
        node.slot = None;
        self.pool.push(node);
        let new_size = self.size.fetch_add(1, Ordering::Relaxed) + 1;
        let prev_peak = self.peak.fetch_max(new_size, Ordering::Relaxed);
        if new_size > prev_peak && new_size % FREELIST_WARN_EVERY == 0 {
            log::warn!("mq: message-node freelist reached a new peak of {new_size} pooled nodes");
        }
    }

    #[cfg(test)]
    pub fn pooled_count(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycled_node_is_reused() {
        let fl: Freelist<u32> = Freelist::new();
        let node = fl.acquire();
        assert_eq!(fl.pooled_count(), 0);
        fl.release(node);
        assert_eq!(fl.pooled_count(), 1);
        let _node = fl.acquire();
        assert_eq!(fl.pooled_count(), 0);
    }

    #[test]
    fn warns_only_on_new_peak_multiples() {
        let fl: Freelist<u32> = Freelist::new();
        // Release FREELIST_WARN_EVERY nodes; only the last release crosses
        // a new-peak multiple of the threshold.
        let mut nodes = Vec::new();
        for _ in 0..FREELIST_WARN_EVERY {
            nodes.push(fl.acquire());
        }
        for node in nodes {
            fl.release(node);
        }
        assert_eq!(fl.pooled_count(), FREELIST_WARN_EVERY);
    }
}
