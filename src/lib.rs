// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # suscan-inspector - channel inspector subsystem for an SDR spectrum analyzer
//!
//! A per-channel demodulation pipeline (baseband shift, AGC, optional Costas
//! carrier recovery, symbol-time sampling), the inspector lifecycle state
//! machine that governs it, and the message queue that schedules analyzer
//! and worker threads against it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use suscan_inspector::analyzer::{Analyzer, SourceFactory};
//! use suscan_inspector::client::Client;
//! use suscan_inspector::dsp::Cf32;
//! use suscan_inspector::msg::{AnalyzerMsg, RfChannel};
//! use suscan_inspector::mq::MessageQueue;
//! use suscan_inspector::worker::{SampleSource, ThreadWorkerPool, WorkerPool};
//!
//! struct NoSamples;
//! impl SampleSource for NoSamples {
//!     fn assert_samples(&mut self) -> suscan_inspector::Result<Option<Vec<Cf32>>> {
//!         Ok(None)
//!     }
//!     fn advance(&mut self, _n: usize) {}
//! }
//!
//! fn main() {
//!     let pool: Arc<dyn WorkerPool> = Arc::new(ThreadWorkerPool::start(2));
//!     let in_mq = Arc::new(MessageQueue::<AnalyzerMsg>::new());
//!     let out_mq = Arc::new(MessageQueue::<AnalyzerMsg>::new());
//!     let factory: SourceFactory = Box::new(|| Box::new(NoSamples));
//!
//!     let analyzer = Analyzer::start(250_000.0, pool, factory, Arc::clone(&in_mq), Arc::clone(&out_mq));
//!     let client = Client::new(in_mq, out_mq);
//!
//!     let channel = RfChannel { f_lo: -2500.0, f_hi: 2500.0, bw: 5000.0, fc: 0.0, noise_floor: -90.0 };
//!     let handle = client.open(channel, 1).unwrap();
//!     client.close(handle).unwrap();
//!     analyzer.stop();
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                             Client API                              |
//! |   open/close/get_info/get_params/set_params (sync + async)          |
//! +---------------------------------------------------------------------+
//! |                          Analyzer Thread                            |
//! |   reads INSPECTOR-typed requests, dispatches, writes responses       |
//! +---------------------------------------------------------------------+
//! |   Registry (handle table)   |   WorkerPool (per-inspector tasks)     |
//! +---------------------------------------------------------------------+
//! |                         Inspector (DSP pipeline)                    |
//! |   baud detectors -> NCO mix -> AGC -> Costas -> symbol sampler       |
//! +---------------------------------------------------------------------+
//! |                          MessageQueue<T>                            |
//! |   FIFO + urgent insertion + blocking/non-blocking + typed reads      |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`analyzer::Analyzer`] | Owns the handle table and worker pool; runs the message-handler thread |
//! | [`client::Client`] | Request/response helper pairing an input and output queue |
//! | [`inspector::Inspector`] | The per-channel demodulation pipeline |
//! | [`registry::Registry`] | The handle table and lifecycle transitions |
//! | [`mq::MessageQueue`] | Thread-safe typed FIFO with urgent insertion and blocking reads |
//! | [`worker::WorkerPool`] | Schedules and reschedules per-inspector callbacks |
//!
//! ## Modules Overview
//!
//! - [`analyzer`] - message-handler thread and request dispatch
//! - [`client`] - sync/async request helpers
//! - [`inspector`] - the DSP pipeline and its lifecycle state
//! - [`registry`] - the handle table
//! - [`worker`] - the worker pool collaborator and callback glue
//! - [`mq`] - the message queue primitive
//! - [`msg`] - the wire-level message types
//! - [`dsp`] - channel detectors, AGC, Costas loop, NCO
//! - [`config`] - derivation constants for the DSP pipeline
//! - [`error`] - the crate-wide error type

pub mod analyzer;
pub mod client;
pub mod config;
pub mod dsp;
pub mod error;
pub mod inspector;
pub mod mq;
pub mod msg;
pub mod registry;
pub mod worker;

pub use error::{Error, Result};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
