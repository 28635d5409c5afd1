// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The analyzer message-handler thread: dispatches `InspectorMsg` requests
//! arriving on the input queue (`OPEN`/`CLOSE`/`GET_INFO`/`GET_PARAMS`/
//! `PARAMS`) and writes the (possibly mutated) response to the output
//! queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use crate::inspector::Inspector;
use crate::msg::{AnalyzerMsg, BaudEstimate, InspectorMsg, InspectorMsgKind, MessageType};
use crate::mq::MessageQueue;
use crate::registry::Registry;
use crate::worker::{run_inspector_callback, SampleSource, WorkerPool, WorkerTask};

/// Constructs a fresh [`SampleSource`] for each newly opened inspector.
/// The concrete source (reading from the shared sample stream) is a host
/// responsibility; this crate only needs the factory seam.
pub type SourceFactory = Box<dyn Fn() -> Box<dyn SampleSource> + Send + Sync>;

/// Owns the handle table and is the sole mutator of inspector lifecycle
/// state except through the worker callback (see `crate::inspector::state`).
pub struct Analyzer {
    inner: Arc<Inner>,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

struct Inner {
    registry: Registry,
    pool: Arc<dyn WorkerPool>,
    samp_rate: f64,
    source_factory: SourceFactory,
    out_mq: Arc<MessageQueue<AnalyzerMsg>>,
}

impl Analyzer {
    /// Spawn the analyzer thread. It reads `INSPECTOR`-typed messages from
    /// `in_mq`, dispatches them, and writes responses to `out_mq`.
    pub fn start(
        samp_rate: f64,
        pool: Arc<dyn WorkerPool>,
        source_factory: SourceFactory,
        in_mq: Arc<MessageQueue<AnalyzerMsg>>,
        out_mq: Arc<MessageQueue<AnalyzerMsg>>,
    ) -> Self {
        let inner = Arc::new(Inner {
            registry: Registry::new(),
            pool,
            samp_rate,
            source_factory,
            out_mq,
        });
        let stop_flag = Arc::new(AtomicBool::new(false));

        let loop_inner = Arc::clone(&inner);
        let loop_stop_flag = Arc::clone(&stop_flag);
        let handle = thread::spawn(move || analyzer_loop(loop_inner, in_mq, loop_stop_flag));

        Self {
            inner,
            stop_flag,
            handle: Some(handle),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Analyzer {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn analyzer_loop(inner: Arc<Inner>, in_mq: Arc<MessageQueue<AnalyzerMsg>>, stop_flag: Arc<AtomicBool>) {
    loop {
        if stop_flag.load(Ordering::Relaxed) {
            return;
        }
        match in_mq.read_typed(MessageType::Inspector) {
            Ok(AnalyzerMsg::Inspector(msg)) => {
                let response = inner.dispatch(*msg);
                log::debug!(
                    "analyzer: dispatched req_id={} kind={:?}",
                    response.req_id,
                    response.kind
                );
                let _ = inner.out_mq.push(AnalyzerMsg::Inspector(Box::new(response)));
            }
            Ok(AnalyzerMsg::Samples(_)) => {
                // The input queue only ever carries control messages in
                // this design; a stray SAMPLES message cannot represent a
                // client protocol violation (it was never client-writable),
                // so it's dropped silently rather than surfaced as an error.
            }
            Err(_) => return,
        }
    }
}

impl Inner {
    /// Handle an `OPEN` request end to end: construct the inspector,
    /// register it, and push its worker task, rolling the handle back if
    /// the push fails.
    fn open(&self, channel: crate::msg::RfChannel) -> Result<(crate::inspector::InspectorHandle, u32), ()> {
        let inspector = Inspector::new(self.samp_rate, channel).map_err(|_| ())?;
        let (handle, slot) = self.registry.register(inspector);

        let mut source = (self.source_factory)();
        let out_mq = Arc::clone(&self.out_mq);
        let slot_for_task = Arc::clone(&slot);

        let task: WorkerTask =
            Box::new(move || run_inspector_callback(&slot_for_task, source.as_mut(), &out_mq));

        match self.pool.push_task(task) {
            Ok(()) => {
                let inspector_id = slot.inspector.lock().params().inspector_id;
                Ok((handle, inspector_id))
            }
            Err(()) => {
                self.registry.rollback(handle);
                Err(())
            }
        }
    }

    fn dispatch(&self, mut msg: InspectorMsg) -> InspectorMsg {
        let mut touched_inspector_id: Option<u32> = None;

        match msg.kind {
            InspectorMsgKind::Open => match msg.channel {
                Some(channel) => match self.open(channel) {
                    Ok((handle, inspector_id)) => {
                        msg.handle = Some(handle);
                        touched_inspector_id = Some(inspector_id);
                    }
                    Err(()) => msg = msg.into_wrong_handle(),
                },
                None => msg = msg.into_wrong_handle(),
            },

            InspectorMsgKind::GetInfo => match msg.handle.and_then(|h| self.registry.lookup(h)) {
                Some(slot) => {
                    let inspector = slot.inspector.lock();
                    let (fac, nln) = inspector.baud_estimate();
                    touched_inspector_id = Some(inspector.params().inspector_id);
                    drop(inspector);
                    msg.baud = BaudEstimate { fac, nln };
                    msg.kind = InspectorMsgKind::Info;
                }
                None => msg = msg.into_wrong_handle(),
            },

            InspectorMsgKind::GetParams => match msg.handle.and_then(|h| self.registry.lookup(h)) {
                Some(slot) => {
                    let params = slot.inspector.lock().params();
                    touched_inspector_id = Some(params.inspector_id);
                    msg.params = Some(params);
                    msg.kind = InspectorMsgKind::Params;
                }
                None => msg = msg.into_wrong_handle(),
            },

            InspectorMsgKind::Params => match msg.handle.and_then(|h| self.registry.lookup(h)) {
                Some(slot) => {
                    if let Some(params) = msg.params {
                        let mut inspector = slot.inspector.lock();
                        if inspector.apply_params(params).is_ok() {
                            touched_inspector_id = Some(params.inspector_id);
                        }
                    }
                }
                None => msg = msg.into_wrong_handle(),
            },

            InspectorMsgKind::Close => match msg.handle {
                Some(h) => match self.registry.close(h) {
                    Ok(inspector_id) => touched_inspector_id = Some(inspector_id),
                    Err(_) => msg = msg.into_wrong_handle(),
                },
                None => msg = msg.into_wrong_handle(),
            },

            InspectorMsgKind::Info | InspectorMsgKind::WrongHandle | InspectorMsgKind::WrongKind => {
                msg = msg.into_wrong_kind();
            }
        }

        if let Some(id) = touched_inspector_id {
            msg.inspector_id = id;
        }

        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::Cf32;
    use crate::msg::RfChannel;
    use crate::worker::ThreadWorkerPool;

    struct NoSamples;
    impl SampleSource for NoSamples {
        fn assert_samples(&mut self) -> crate::error::Result<Option<Vec<Cf32>>> {
            Ok(None)
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

    fn make_analyzer() -> (
        Analyzer,
        Arc<MessageQueue<AnalyzerMsg>>,
        Arc<MessageQueue<AnalyzerMsg>>,
    ) {
        let pool: Arc<dyn WorkerPool> = Arc::new(ThreadWorkerPool::start(1));
        let in_mq = Arc::new(MessageQueue::new());
        let out_mq = Arc::new(MessageQueue::new());
        let factory: SourceFactory = Box::new(|| Box::new(NoSamples));
        let analyzer = Analyzer::start(250_000.0, pool, factory, Arc::clone(&in_mq), Arc::clone(&out_mq));
        (analyzer, in_mq, out_mq)
    }

    #[test]
    fn open_then_close_round_trip() {
        // S1: open returns handle >= 0, close succeeds, second close is WRONG_HANDLE.
        let (analyzer, in_mq, out_mq) = make_analyzer();

        in_mq
            .push(AnalyzerMsg::Inspector(Box::new(InspectorMsg::open(1, channel(), 0))))
            .unwrap();
        let resp = out_mq.read_typed(MessageType::Inspector).unwrap();
        let resp = resp.into_inspector().unwrap();
        assert_eq!(resp.kind, InspectorMsgKind::Open);
        let handle = resp.handle.expect("OPEN response carries a handle");

        in_mq
            .push(AnalyzerMsg::Inspector(Box::new(InspectorMsg::close(2, handle))))
            .unwrap();
        let resp = out_mq.read_typed(MessageType::Inspector).unwrap().into_inspector().unwrap();
        assert_eq!(resp.kind, InspectorMsgKind::Close);

        in_mq
            .push(AnalyzerMsg::Inspector(Box::new(InspectorMsg::close(3, handle))))
            .unwrap();
        let resp = out_mq.read_typed(MessageType::Inspector).unwrap().into_inspector().unwrap();
        assert_eq!(resp.kind, InspectorMsgKind::WrongHandle);

        analyzer.stop();
    }

    #[test]
    fn params_round_trips_through_get_params() {
        let (analyzer, in_mq, out_mq) = make_analyzer();

        in_mq
            .push(AnalyzerMsg::Inspector(Box::new(InspectorMsg::open(1, channel(), 0))))
            .unwrap();
        let resp = out_mq.read_typed(MessageType::Inspector).unwrap().into_inspector().unwrap();
        let handle = resp.handle.unwrap();

        let params = crate::inspector::InspectorParams {
            inspector_id: 99,
            baud: 1200.0,
            fc_off: 100.0,
            fc_phi: 0.3,
            sym_phase: 0.1,
            fc_ctrl: crate::inspector::FcControl::Costas2,
        };
        in_mq
            .push(AnalyzerMsg::Inspector(Box::new(InspectorMsg::set_params(2, handle, params))))
            .unwrap();
        let resp = out_mq.read_typed(MessageType::Inspector).unwrap().into_inspector().unwrap();
        assert_eq!(resp.kind, InspectorMsgKind::Params);

        in_mq
            .push(AnalyzerMsg::Inspector(Box::new(InspectorMsg::get_params(3, handle))))
            .unwrap();
        let resp = out_mq.read_typed(MessageType::Inspector).unwrap().into_inspector().unwrap();
        assert_eq!(resp.kind, InspectorMsgKind::Params);
        assert_eq!(resp.params, Some(params));

        analyzer.stop();
    }

    #[test]
    fn get_info_on_unknown_handle_is_wrong_handle() {
        let (analyzer, in_mq, out_mq) = make_analyzer();
        in_mq
            .push(AnalyzerMsg::Inspector(Box::new(InspectorMsg::get_info(
                1,
                crate::inspector::InspectorHandle(999),
            ))))
            .unwrap();
        let resp = out_mq.read_typed(MessageType::Inspector).unwrap().into_inspector().unwrap();
        assert_eq!(resp.kind, InspectorMsgKind::WrongHandle);
        analyzer.stop();
    }
}
