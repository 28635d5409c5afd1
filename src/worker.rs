// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The worker pool collaborator and the per-inspector callback glue that
//! drives `feed_bulk` from pulled samples to emitted sample batches.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use suscan_inspector::dsp::Cf32;
//! use suscan_inspector::msg::AnalyzerMsg;
//! use suscan_inspector::mq::MessageQueue;
//! use suscan_inspector::worker::{SampleSource, ThreadWorkerPool, WorkerPool};
//!
//! struct Fixed(Vec<Cf32>);
//! impl SampleSource for Fixed {
//!     fn assert_samples(&mut self) -> suscan_inspector::Result<Option<Vec<Cf32>>> {
//!         if self.0.is_empty() { Ok(None) } else { Ok(Some(std::mem::take(&mut self.0))) }
//!     }
//!     fn advance(&mut self, _n: usize) {}
//! }
//!
//! let pool = ThreadWorkerPool::start(2);
//! let out: Arc<MessageQueue<AnalyzerMsg>> = Arc::new(MessageQueue::new());
//! drop(out);
//! drop(pool);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::dsp::Cf32;
use crate::error::Result;
use crate::inspector::LifecycleState;
use crate::msg::{AnalyzerMsg, SampleBatch};
use crate::mq::MessageQueue;
use crate::registry::InspectorSlot;

/// A consumer of the shared sample stream, bound to one inspector's
/// worker task. Out of scope as a concrete implementation (the real
/// consumer/source frontend lives in the host analyzer); this trait is
/// the seam the worker callback is written against.
///
/// The collaborator interface this seam stands in for also exposes a
/// `consumer_remove_task` deregistration call, invoked by the callback
/// right before detaching. That call has no counterpart here: returning
/// `false` from the scheduled task (see [`run_inspector_callback`]) is the
/// pool's entire detach signal, so there is nothing left for the source to
/// be explicitly told. A concrete `SampleSource` backed by a real consumer
/// still needs to deregister itself from that consumer on detach; this
/// trait does not carry a hook for it.
pub trait SampleSource: Send {
    /// Returns the samples currently available, or `None` if the consumer
    /// has nothing new (the task should detach until re-armed by the
    /// source).
    fn assert_samples(&mut self) -> Result<Option<Vec<Cf32>>>;

    /// Acknowledge that `n` leading samples of the last `assert_samples`
    /// result have been consumed.
    fn advance(&mut self, n: usize);
}

/// A pool that schedules per-inspector tasks. Out of scope as a concrete
/// production implementation; [`ThreadWorkerPool`] is a reference pool
/// sized for tests and small deployments.
pub trait WorkerPool: Send + Sync {
    /// Schedule `task` for repeated invocation. `task` returns `true` to be
    /// rescheduled, `false` to detach permanently.
    fn push_task(&self, task: WorkerTask) -> Result<()>;
}

pub type WorkerTask = Box<dyn FnMut() -> bool + Send>;

struct PoolState {
    tasks: VecDeque<WorkerTask>,
}

/// A small fixed-size thread pool pulling tasks from a shared queue,
/// re-enqueuing any task that returns `true`.
///
/// Lifecycle shape (stop flag + joined threads on drop) mirrors a
/// background routing thread that owns its own shutdown.
pub struct ThreadWorkerPool {
    state: Arc<Mutex<PoolState>>,
    cv: Arc<Condvar>,
    stop_flag: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl ThreadWorkerPool {
    pub fn start(num_threads: usize) -> Self {
        let state = Arc::new(Mutex::new(PoolState {
            tasks: VecDeque::new(),
        }));
        let cv = Arc::new(Condvar::new());
        let stop_flag = Arc::new(AtomicBool::new(false));

        let handles = (0..num_threads.max(1))
            .map(|_| {
                let state = Arc::clone(&state);
                let cv = Arc::clone(&cv);
                let stop_flag = Arc::clone(&stop_flag);
                thread::spawn(move || worker_loop(state, cv, stop_flag))
            })
            .collect();

        Self {
            state,
            cv,
            stop_flag,
            handles,
        }
    }

    pub fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.cv.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadWorkerPool {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.cv.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl WorkerPool for ThreadWorkerPool {
    fn push_task(&self, task: WorkerTask) -> Result<()> {
        let mut state = self.state.lock();
        state.tasks.push_back(task);
        drop(state);
        self.cv.notify_one();
        Ok(())
    }
}

fn worker_loop(state: Arc<Mutex<PoolState>>, cv: Arc<Condvar>, stop_flag: Arc<AtomicBool>) {
    loop {
        let mut guard = state.lock();
        let mut task = loop {
            if let Some(task) = guard.tasks.pop_front() {
                break task;
            }
            if stop_flag.load(Ordering::Relaxed) {
                return;
            }
            cv.wait(&mut guard);
        };
        drop(guard);

        let restart = task();

        if restart {
            let mut guard = state.lock();
            guard.tasks.push_back(task);
            drop(guard);
            cv.notify_one();
        }

        if stop_flag.load(Ordering::Relaxed) {
            return;
        }
    }
}

/// The per-inspector callback body invoked repeatedly by a [`WorkerPool`].
///
/// Contract: returns `true` to request rescheduling, `false` to detach.
/// Before returning `false` because the inspector observed `HALTING`, or
/// because of any DSP/queue failure, this transitions the inspector to
/// `HALTED` — the terminal state after which no other thread reads its
/// fields again.
pub fn run_inspector_callback(
    slot: &InspectorSlot,
    source: &mut dyn SampleSource,
    out_mq: &MessageQueue<AnalyzerMsg>,
) -> bool {
    if slot.state.load() == LifecycleState::Halting {
        slot.state.store(LifecycleState::Halted);
        return false;
    }

    let samples = match source.assert_samples() {
        Ok(Some(samples)) if !samples.is_empty() => samples,
        Ok(_) => return false,
        Err(e) => {
            log::warn!("worker: sample source failed, halting inspector: {e}");
            slot.state.store(LifecycleState::Halted);
            return false;
        }
    };

    let mut inspector = slot.inspector.lock();
    let inspector_id = inspector.params().inspector_id;
    let mut batch: Option<SampleBatch> = None;

    let mut remaining: &[Cf32] = &samples;
    while !remaining.is_empty() {
        let fed = match inspector.feed_bulk(remaining) {
            Ok(fed) => fed,
            Err(e) => {
                log::warn!("worker: feed_bulk failed, halting inspector: {e}");
                drop(inspector);
                slot.state.store(LifecycleState::Halted);
                return false;
            }
        };

        if inspector.sym_new_sample() {
            batch
                .get_or_insert_with(|| SampleBatch::new(inspector_id))
                .push(inspector.sym_sampler_output());
        }

        source.advance(fed);
        remaining = &remaining[fed..];
    }
    drop(inspector);

    if let Some(batch) = batch {
        if let Err(e) = out_mq.push(AnalyzerMsg::Samples(Box::new(batch))) {
            log::warn!("worker: failed to publish sample batch, halting inspector: {e}");
            slot.state.store(LifecycleState::Halted);
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::{FcControl, Inspector, InspectorParams};
    use crate::msg::RfChannel;
    use std::sync::Arc;

    struct FixedSource {
        remaining: Vec<Cf32>,
        served: bool,
    }

    impl SampleSource for FixedSource {
        fn assert_samples(&mut self) -> Result<Option<Vec<Cf32>>> {
            if self.served {
                return Ok(None);
            }
            self.served = true;
            Ok(Some(std::mem::take(&mut self.remaining)))
        }

        fn advance(&mut self, _n: usize) {}
    }

    fn channel() -> RfChannel {
        RfChannel {
            f_lo: -2500.0,
            f_hi: 2500.0,
            bw: 5000.0,
            fc: 0.0,
            noise_floor: -90.0,
        }
    }

    #[test]
    fn halting_state_transitions_to_halted_and_detaches() {
        let mut insp = Inspector::new(250_000.0, channel()).unwrap();
        insp.apply_params(InspectorParams::default()).unwrap();
        let slot = InspectorSlot {
            state: crate::inspector::AtomicInspectorState::new(LifecycleState::Halting),
            inspector: parking_lot::Mutex::new(insp),
        };
        let mut source = FixedSource {
            remaining: vec![],
            served: false,
        };
        let out: MessageQueue<AnalyzerMsg> = MessageQueue::new();

        let restart = run_inspector_callback(&slot, &mut source, &out);
        assert!(!restart);
        assert_eq!(slot.state.load(), LifecycleState::Halted);
    }

    #[test]
    fn running_with_no_samples_detaches_without_halting() {
        let mut insp = Inspector::new(250_000.0, channel()).unwrap();
        insp.apply_params(InspectorParams::default()).unwrap();
        let slot = InspectorSlot {
            state: crate::inspector::AtomicInspectorState::new(LifecycleState::Running),
            inspector: parking_lot::Mutex::new(insp),
        };
        let mut source = FixedSource {
            remaining: vec![],
            served: false,
        };
        let out: MessageQueue<AnalyzerMsg> = MessageQueue::new();

        let restart = run_inspector_callback(&slot, &mut source, &out);
        assert!(!restart);
        assert_eq!(slot.state.load(), LifecycleState::Running);
    }

    #[test]
    fn sample_batch_is_published_on_sampler_firing() {
        let mut insp = Inspector::new(250_000.0, channel()).unwrap();
        insp.apply_params(InspectorParams {
            baud: 1000.0,
            fc_ctrl: FcControl::Manual,
            inspector_id: 77,
            ..Default::default()
        })
        .unwrap();
        let slot = InspectorSlot {
            state: crate::inspector::AtomicInspectorState::new(LifecycleState::Running),
            inspector: parking_lot::Mutex::new(insp),
        };
        let mut source = FixedSource {
            remaining: vec![Cf32::new(1.0, 0.0); 300],
            served: false,
        };
        let out: MessageQueue<AnalyzerMsg> = MessageQueue::new();

        let restart = run_inspector_callback(&slot, &mut source, &out);
        assert!(restart);
        let published = out.poll().expect("a batch should have been published");
        let batch = published.into_samples().expect("published message is a sample batch");
        assert_eq!(batch.inspector_id, 77);
        assert!(!batch.is_empty());
    }

    #[test]
    fn thread_pool_reschedules_until_task_returns_false() {
        let pool = ThreadWorkerPool::start(1);
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter2 = Arc::clone(&counter);
        pool.push_task(Box::new(move || {
            let n = counter2.fetch_add(1, Ordering::Relaxed);
            n < 3
        }))
        .unwrap();

        // Give the pool a moment to drain the reschedule loop.
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::Relaxed), 4);
        pool.stop();
    }
}
