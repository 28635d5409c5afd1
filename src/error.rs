// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! # Example
//!
//! ```rust,no_run
//! use suscan_inspector::{Error, Result};
//!
//! fn demo() -> Result<()> {
//!     Err(Error::InvalidHandle)
//! }
//!
//! match demo() {
//!     Err(Error::InvalidHandle) => println!("no such inspector"),
//!     Err(e) => println!("other error: {}", e),
//!     Ok(()) => {}
//! }
//! ```

use crate::msg::InspectorMsgKind;

#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Registry / Handle Errors
    // ========================================================================
    /// Handle does not name a live, `RUNNING` inspector.
    InvalidHandle,
    /// Inspector is already transitioning to `HALTED`; a second `CLOSE` is a no-op at the wire
    /// level (reported as `WrongHandle`) but distinguishable here for in-process callers.
    AlreadyClosing,
    /// The registry ran out of room before resizing, or resizing itself failed.
    AllocationFailure,

    // ========================================================================
    // Message Errors
    // ========================================================================
    /// A message kind byte did not map to any known `InspectorMsgKind`.
    InvalidKind(u8),
    /// A `PARAMS` message carried a parameter the pipeline cannot apply.
    InvalidParams(&'static str),
    /// A synchronous client call received a response of the wrong kind.
    ProtocolMismatch {
        expected: InspectorMsgKind,
        got: InspectorMsgKind,
    },
    /// A synchronous client call received a response with a mismatched `req_id`.
    StaleResponse,

    // ========================================================================
    // DSP Errors
    // ========================================================================
    /// A collaborator (detector, AGC, Costas loop) failed to accept a sample.
    DspFailure(&'static str),

    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// The queue has been finalized; no further reads will ever succeed.
    QueueClosed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidHandle => write!(f, "invalid or non-running inspector handle"),
            Error::AlreadyClosing => write!(f, "inspector is already halting"),
            Error::AllocationFailure => write!(f, "registry allocation failed"),
            Error::InvalidKind(b) => write!(f, "unrecognized inspector message kind: {}", b),
            Error::InvalidParams(msg) => write!(f, "invalid inspector params: {}", msg),
            Error::ProtocolMismatch { expected, got } => {
                write!(f, "expected response kind {:?}, got {:?}", expected, got)
            }
            Error::StaleResponse => write!(f, "response req_id did not match request"),
            Error::DspFailure(msg) => write!(f, "DSP pipeline failure: {}", msg),
            Error::QueueClosed => write!(f, "message queue is closed"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for API results using the public [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
