//! Crate-wide error taxonomy.
//!
//! Every fallible operation in this crate returns one of these variants;
//! nothing is silently downgraded except the documented partial-to-full
//! auto-escalation performed by `DriverState::needs_full_refresh`.

use thiserror::Error;

/// The error type returned by every fallible operation in this crate.
#[derive(Error, Debug)]
pub enum EpdError {
    /// `wait_ready` exceeded the operation-specific timeout bound.
    #[error("timed out waiting for panel ready during {operation}")]
    Timeout {
        /// Name of the operation that was waiting.
        operation: &'static str,
    },

    /// The requested capability isn't available on this transport/hardware.
    #[error("unsupported: {feature}")]
    Unsupported {
        /// The unavailable feature or capability.
        feature: &'static str,
    },

    /// A caller-supplied argument violates a documented precondition.
    #[error("invalid argument: {what}")]
    InvalidArgument {
        /// Description of the violated precondition.
        what: &'static str,
    },

    /// The operation cannot proceed given the current driver state.
    #[error("not ready: {reason}")]
    NotReady {
        /// Why the driver isn't ready for this operation.
        reason: &'static str,
    },

    /// A BF2 font file failed to parse.
    #[error("bad font: {reason}")]
    BadFont {
        /// Description of the parse failure.
        reason: String,
    },

    /// An underlying I/O failure (font file access, SPI bus configuration).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, EpdError>;
