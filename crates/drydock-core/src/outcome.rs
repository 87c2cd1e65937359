//! Check verdict types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reference to a trace rendering kept on disk for a bounded time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedTrace {
    /// Retrieval path handed to the submitter (e.g. `/download/<id>`)
    pub location: String,

    /// How long the rendering stays available before it is deleted
    pub ttl: Duration,
}

/// Verdict of one sandboxed checker run
///
/// Produced exactly once per run. Every sub-step failure is folded into one
/// of these variants before the orchestrator returns; no raw process,
/// filesystem, or parse error crosses this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The checker ran to completion and found a substantive issue. This is
    /// a legitimate result, not a system fault.
    Violation {
        /// Parsed report produced by the checker
        report: serde_json::Value,
        /// Trace rendering, when one was produced and retained
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trace: Option<RetainedTrace>,
    },

    /// The checker ran cleanly and found no issue
    Completed { output: String },

    /// The submitted program or options caused the run to fail
    Error { message: String },

    /// The run exhausted its time budget
    Timeout { message: String },

    /// The run was killed for exceeding its memory ceiling
    OutOfMemory { message: String },

    /// A server-side fault, not the submitter's
    Internal { message: String },
}

impl CheckOutcome {
    /// Short status label, mainly for logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Violation { .. } => "violation",
            Self::Completed { .. } => "completed",
            Self::Error { .. } => "error",
            Self::Timeout { .. } => "timeout",
            Self::OutOfMemory { .. } => "out-of-memory",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether the checker itself ran to completion (violation or clean)
    #[must_use]
    pub const fn checker_ran(&self) -> bool {
        matches!(self, Self::Violation { .. } | Self::Completed { .. })
    }
}
