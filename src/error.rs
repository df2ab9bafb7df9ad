//! Error types for the controller adapter.
//!
//! [`Error`] covers everything an adapter operation can fail with. Its
//! `Display` output is what the MCP layer hands back to the agent, so the
//! messages are written for a human reader.

use thiserror::Error;

use crate::snapshot::DeviceKind;

/// Errors returned by [`Adapter`](crate::adapter::Adapter) and
/// [`ControllerClient`](crate::client::ControllerClient) methods.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport error (connection refused, timeout, DNS failure, etc.).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The controller answered with a non-2xx status.
    #[error("Controller error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    /// The snapshot body was not valid JSON.
    #[error("Invalid snapshot from controller: {0}")]
    Decode(#[from] serde_json::Error),

    /// The requested command could not be encoded.
    #[error("Invalid command: {0}")]
    Command(#[from] CommandError),
}

impl Error {
    /// Returns `true` if the controller rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Status { status: 401, .. })
    }
}

/// Errors raised while building a [`CommandBatch`](crate::command::CommandBatch).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The id falls outside the range the controller assigns to this kind.
    #[error("{kind} id {id} is out of range [{min}, {max}]")]
    IdOutOfRange {
        kind: DeviceKind,
        id: u32,
        min: u32,
        max: u32,
    },

    /// Only PCA and PWM outputs have a settable level.
    #[error("{0} outputs do not support a level")]
    LevelUnsupported(DeviceKind),

    /// A raw command component could not be parsed.
    #[error("malformed command component '{0}' (expected key=value)")]
    Malformed(String),

    /// Nothing to send.
    #[error("command is empty")]
    Empty,
}
