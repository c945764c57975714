//! Typed errors surfaced by the engine (§7).

use thiserror::Error;

/// Errors the engine can report to its host application.
#[derive(Debug, Error)]
pub enum LlapError {
    /// The underlying serial port failed on read or write.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The writer or reader observed the port closed mid-operation.
    #[error("serial port closed")]
    PortClosed,

    /// The encoded device + body prefix would not fit in a 12-byte frame.
    #[error("frame too long for device {device} body {body:?}")]
    FrameTooLong { device: String, body: String },

    /// An `EngineConfig` TOML file or string failed to parse.
    #[error("invalid engine config: {0}")]
    Config(#[from] toml::de::Error),

    /// The writer or retry handler did not join within the shutdown grace period.
    #[error("shutdown timed out waiting for workers to drain")]
    ShutdownTimedOut,
}
