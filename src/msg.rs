// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The typed request/response envelope exchanged between clients and the
//! analyzer thread, and the sample batch payload emitted by worker
//! callbacks.

use crate::dsp::types::Cf32;
use crate::inspector::{FcControl, InspectorHandle, InspectorParams};

/// Discriminates the two payload families carried on a queue: control
/// messages addressed to/from the analyzer, and batched demodulated
/// samples flowing out of worker callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Inspector,
    Samples,
}

/// Request/response kind for [`InspectorMsg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorMsgKind {
    Open,
    Close,
    GetInfo,
    Info,
    GetParams,
    Params,
    WrongHandle,
    WrongKind,
}

/// RF channel descriptor supplied on `OPEN`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RfChannel {
    pub f_lo: f64,
    pub f_hi: f64,
    pub bw: f64,
    pub fc: f64,
    pub noise_floor: f64,
}

/// Baud estimates returned on `INFO`, one per channel detector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BaudEstimate {
    /// Estimate from the autocorrelation-based detector.
    pub fac: f64,
    /// Estimate from the nonlinear-difference-based detector.
    pub nln: f64,
}

/// The tagged envelope passed between a client and the analyzer thread.
#[derive(Debug, Clone)]
pub struct InspectorMsg {
    pub kind: InspectorMsgKind,
    pub req_id: u32,
    pub handle: Option<InspectorHandle>,
    pub channel: Option<RfChannel>,
    pub params: Option<InspectorParams>,
    pub baud: BaudEstimate,
    pub inspector_id: u32,
    /// Copy of the offending request kind, populated only when responding
    /// with `WrongKind`.
    pub status: Option<InspectorMsgKind>,
}

impl InspectorMsg {
    pub fn new(kind: InspectorMsgKind, req_id: u32) -> Self {
        Self {
            kind,
            req_id,
            handle: None,
            channel: None,
            params: None,
            baud: BaudEstimate::default(),
            inspector_id: 0,
            status: None,
        }
    }

    pub fn open(req_id: u32, channel: RfChannel, inspector_id: u32) -> Self {
        Self {
            channel: Some(channel),
            inspector_id,
            ..Self::new(InspectorMsgKind::Open, req_id)
        }
    }

    pub fn close(req_id: u32, handle: InspectorHandle) -> Self {
        Self {
            handle: Some(handle),
            ..Self::new(InspectorMsgKind::Close, req_id)
        }
    }

    pub fn get_info(req_id: u32, handle: InspectorHandle) -> Self {
        Self {
            handle: Some(handle),
            ..Self::new(InspectorMsgKind::GetInfo, req_id)
        }
    }

    pub fn get_params(req_id: u32, handle: InspectorHandle) -> Self {
        Self {
            handle: Some(handle),
            ..Self::new(InspectorMsgKind::GetParams, req_id)
        }
    }

    pub fn set_params(req_id: u32, handle: InspectorHandle, params: InspectorParams) -> Self {
        Self {
            handle: Some(handle),
            params: Some(params),
            ..Self::new(InspectorMsgKind::Params, req_id)
        }
    }

    /// Turn this message into a `WrongKind` response, stashing the original
    /// kind in `status`.
    pub fn into_wrong_kind(mut self) -> Self {
        self.status = Some(self.kind);
        self.kind = InspectorMsgKind::WrongKind;
        self
    }

    pub fn into_wrong_handle(mut self) -> Self {
        self.kind = InspectorMsgKind::WrongHandle;
        self
    }
}

/// One batch of demodulated symbol samples for a single inspector.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    pub inspector_id: u32,
    pub samples: Vec<Cf32>,
}

impl SampleBatch {
    pub fn new(inspector_id: u32) -> Self {
        Self {
            inspector_id,
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: Cf32) {
        self.samples.push(sample);
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The concrete payload carried by this crate's message queues: either a
/// control envelope or a batch of demodulated samples.
#[derive(Debug, Clone)]
pub enum AnalyzerMsg {
    Inspector(Box<InspectorMsg>),
    Samples(Box<SampleBatch>),
}

impl crate::mq::Tagged for AnalyzerMsg {
    type Tag = MessageType;
    fn tag(&self) -> MessageType {
        self.message_type()
    }
}

impl AnalyzerMsg {
    pub fn message_type(&self) -> MessageType {
        match self {
            AnalyzerMsg::Inspector(_) => MessageType::Inspector,
            AnalyzerMsg::Samples(_) => MessageType::Samples,
        }
    }

    pub fn into_inspector(self) -> Option<Box<InspectorMsg>> {
        match self {
            AnalyzerMsg::Inspector(m) => Some(m),
            AnalyzerMsg::Samples(_) => None,
        }
    }

    pub fn into_samples(self) -> Option<Box<SampleBatch>> {
        match self {
            AnalyzerMsg::Samples(s) => Some(s),
            AnalyzerMsg::Inspector(_) => None,
        }
    }
}

/// Re-exported so `msg`'s callers don't need to know about `inspector`'s
/// internal layout just to read `fc_ctrl` off a `PARAMS` message.
pub type FcCtrl = FcControl;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_kind_stashes_status() {
        let m = InspectorMsg::new(InspectorMsgKind::Open, 7).into_wrong_kind();
        assert_eq!(m.kind, InspectorMsgKind::WrongKind);
        assert_eq!(m.status, Some(InspectorMsgKind::Open));
    }

    #[test]
    fn message_type_matches_payload() {
        let inspector = AnalyzerMsg::Inspector(Box::new(InspectorMsg::new(
            InspectorMsgKind::GetInfo,
            1,
        )));
        assert_eq!(inspector.message_type(), MessageType::Inspector);

        let samples = AnalyzerMsg::Samples(Box::new(SampleBatch::new(1)));
        assert_eq!(samples.message_type(), MessageType::Samples);
    }
}
