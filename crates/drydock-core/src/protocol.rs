//! Wire protocol for daemon communication
//!
//! Length-prefixed (u32 big-endian) msgpack frames over a Unix socket.

use crate::outcome::CheckOutcome;
use serde::{Deserialize, Serialize};

/// One file of a submission, relative to the run workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedFile {
    pub path: String,
    pub contents: Vec<u8>,
}

/// Request to check a submitted program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Entry file declaration; literal filename or a JSON-encoded path
    /// segment array, depending on the source
    pub main: String,

    /// Declared submitting client ("web-ide" or "vscode"); required
    pub source: Option<String>,

    /// Client version, required for vscode submissions
    pub version: Option<String>,

    /// The submitted program files
    pub files: Vec<SubmittedFile>,

    /// Raw pass-through options string
    pub options: Option<String>,
}

/// Request types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Check a submission
    Check(CheckRequest),
    /// Get queue status
    Status,
    /// Ping
    Ping,
}

/// Response types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Verdict for a checked submission
    Check(CheckOutcome),
    /// Queue status
    Status {
        capacity: usize,
        in_flight: usize,
        queued: usize,
    },
    /// Pong
    Pong,
    /// Protocol-level error
    Error { message: String },
}

/// Encode a message to msgpack
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec(msg)
}

/// Decode a message from msgpack
pub fn decode<'a, T: Deserialize<'a>>(data: &'a [u8]) -> Result<T, rmp_serde::decode::Error> {
    rmp_serde::from_slice(data)
}
