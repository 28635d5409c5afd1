// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side request helpers: an async (fire-and-forget, returns the
//! `req_id`) and a sync (blocks for the matching response) variant of each
//! `OPEN`/`CLOSE`/`GET_INFO`/`GET_PARAMS`/`PARAMS` request.
//!
//! A [`Client`] is meant to be paired with one dedicated response queue; if
//! several clients share an `out_mq`, one client's sync call may legitimately
//! observe another's response first, which this code treats as staleness and
//! skips past (see [`Client::wait_for`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use suscan_inspector::client::Client;
//! use suscan_inspector::msg::{AnalyzerMsg, RfChannel};
//! use suscan_inspector::mq::MessageQueue;
//!
//! let in_mq = Arc::new(MessageQueue::<AnalyzerMsg>::new());
//! let out_mq = Arc::new(MessageQueue::<AnalyzerMsg>::new());
//! let client = Client::new(in_mq, out_mq);
//!
//! let channel = RfChannel { f_lo: -2500.0, f_hi: 2500.0, bw: 5000.0, fc: 0.0, noise_floor: -90.0 };
//! let _req_id = client.open_async(channel, 0);
//! ```

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::inspector::{InspectorHandle, InspectorParams};
use crate::msg::{AnalyzerMsg, BaudEstimate, InspectorMsg, InspectorMsgKind, MessageType, RfChannel};
use crate::mq::MessageQueue;

/// A thin request/response wrapper around a pair of queues, matching the
/// analyzer thread's expectations in `crate::analyzer`.
pub struct Client {
    in_mq: Arc<MessageQueue<AnalyzerMsg>>,
    out_mq: Arc<MessageQueue<AnalyzerMsg>>,
}

impl Client {
    pub fn new(in_mq: Arc<MessageQueue<AnalyzerMsg>>, out_mq: Arc<MessageQueue<AnalyzerMsg>>) -> Self {
        Self { in_mq, out_mq }
    }

    fn fresh_req_id() -> u32 {
        rand::random::<u32>()
    }

    fn send(&self, msg: InspectorMsg) -> Result<u32> {
        let req_id = msg.req_id;
        self.in_mq.push(AnalyzerMsg::Inspector(Box::new(msg)))?;
        Ok(req_id)
    }

    /// Block until a response carrying `req_id` arrives, skipping (and
    /// warning about) any response meant for a different in-flight request
    /// sharing this client's `out_mq`.
    fn wait_for(&self, req_id: u32) -> Result<InspectorMsg> {
        loop {
            let msg = self
                .out_mq
                .read_typed(MessageType::Inspector)?
                .into_inspector()
                .expect("read_typed(Inspector) always yields an InspectorMsg");
            if msg.req_id == req_id {
                return Ok(*msg);
            }
            log::warn!(
                "client: discarding response for req_id={} while waiting for req_id={}",
                msg.req_id,
                req_id
            );
        }
    }

    fn expect_kind(msg: InspectorMsg, expected: InspectorMsgKind) -> Result<InspectorMsg> {
        match msg.kind {
            k if k == expected => Ok(msg),
            InspectorMsgKind::WrongHandle => Err(Error::InvalidHandle),
            got => Err(Error::ProtocolMismatch { expected, got }),
        }
    }

    // ------------------------------------------------------------------
    // OPEN
    // ------------------------------------------------------------------

    pub fn open_async(&self, channel: RfChannel, inspector_id: u32) -> Result<u32> {
        let req_id = Self::fresh_req_id();
        self.send(InspectorMsg::open(req_id, channel, inspector_id))
    }

    pub fn open(&self, channel: RfChannel, inspector_id: u32) -> Result<InspectorHandle> {
        let req_id = self.open_async(channel, inspector_id)?;
        let resp = self.wait_for(req_id)?;
        let resp = Self::expect_kind(resp, InspectorMsgKind::Open)?;
        resp.handle.ok_or(Error::InvalidHandle)
    }

    // ------------------------------------------------------------------
    // CLOSE
    // ------------------------------------------------------------------

    pub fn close_async(&self, handle: InspectorHandle) -> Result<u32> {
        let req_id = Self::fresh_req_id();
        self.send(InspectorMsg::close(req_id, handle))
    }

    pub fn close(&self, handle: InspectorHandle) -> Result<()> {
        let req_id = self.close_async(handle)?;
        let resp = self.wait_for(req_id)?;
        Self::expect_kind(resp, InspectorMsgKind::Close).map(|_| ())
    }

    // ------------------------------------------------------------------
    // GET_INFO
    // ------------------------------------------------------------------

    pub fn get_info_async(&self, handle: InspectorHandle) -> Result<u32> {
        let req_id = Self::fresh_req_id();
        self.send(InspectorMsg::get_info(req_id, handle))
    }

    pub fn get_info(&self, handle: InspectorHandle) -> Result<BaudEstimate> {
        let req_id = self.get_info_async(handle)?;
        let resp = self.wait_for(req_id)?;
        let resp = Self::expect_kind(resp, InspectorMsgKind::Info)?;
        Ok(resp.baud)
    }

    // ------------------------------------------------------------------
    // GET_PARAMS / PARAMS
    // ------------------------------------------------------------------

    pub fn get_params_async(&self, handle: InspectorHandle) -> Result<u32> {
        let req_id = Self::fresh_req_id();
        self.send(InspectorMsg::get_params(req_id, handle))
    }

    pub fn get_params(&self, handle: InspectorHandle) -> Result<InspectorParams> {
        let req_id = self.get_params_async(handle)?;
        let resp = self.wait_for(req_id)?;
        let resp = Self::expect_kind(resp, InspectorMsgKind::Params)?;
        resp.params.ok_or(Error::InvalidParams("PARAMS response carried no params"))
    }

    pub fn set_params_async(&self, handle: InspectorHandle, params: InspectorParams) -> Result<u32> {
        let req_id = Self::fresh_req_id();
        self.send(InspectorMsg::set_params(req_id, handle, params))
    }

    pub fn set_params(&self, handle: InspectorHandle, params: InspectorParams) -> Result<()> {
        let req_id = self.set_params_async(handle, params)?;
        let resp = self.wait_for(req_id)?;
        Self::expect_kind(resp, InspectorMsgKind::Params).map(|_| ())
    }
}
