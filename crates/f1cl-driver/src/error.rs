//! Error types for custom-logic driver operations

use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, ClError>;

/// Errors that can occur while talking to the custom logic
#[derive(Debug, Error)]
pub enum ClError {
    /// The register window could not be bound
    #[error("Attach failed: {reason}")]
    Attach {
        /// Reason for failure
        reason: String,
    },

    /// A single register access failed
    #[error("Register I/O failed at {offset:#x}: {reason}")]
    Io {
        /// Byte offset of the register
        offset: usize,
        /// Reason for failure
        reason: String,
    },

    /// Completion was not signalled within the poll budget
    #[error("Timeout waiting for completion after {attempts} polls ({elapsed_ms}ms)")]
    Timeout {
        /// Status reads performed
        attempts: u64,
        /// Time spent polling in milliseconds
        elapsed_ms: u64,
    },

    /// Releasing the register window failed
    #[error("Detach failed: {reason}")]
    Detach {
        /// Reason for failure
        reason: String,
    },

    /// Operand length is not the fixed input block size
    #[error("Invalid input length: got {actual} bytes, expected {expected}")]
    InvalidInputLength {
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// The loaded image could not be inspected
    #[error("Image not ready: {reason}")]
    ImageNotReady {
        /// Reason for failure
        reason: String,
    },

    /// The loaded image reports an unexpected PCI identity
    #[error("Image identity mismatch: expected {expected}, found {found}")]
    IdentityMismatch {
        /// Configured `vendor:device`
        expected: String,
        /// Reported `vendor:device`
        found: String,
    },

    /// No matching device for the requested slot
    #[error("No custom-logic device in slot {slot}")]
    DeviceNotFound {
        /// Requested slot index
        slot: usize,
    },

    /// A configuration value could not be parsed
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for failure
        reason: String,
    },
}

impl ClError {
    /// Create an attach error
    pub fn attach(reason: impl Into<String>) -> Self {
        Self::Attach {
            reason: reason.into(),
        }
    }

    /// Create a register I/O error
    pub fn io(offset: usize, reason: impl Into<String>) -> Self {
        Self::Io {
            offset,
            reason: reason.into(),
        }
    }

    /// Create a detach error
    pub fn detach(reason: impl Into<String>) -> Self {
        Self::Detach {
            reason: reason.into(),
        }
    }

    /// Create an image-not-ready error
    pub fn image_not_ready(reason: impl Into<String>) -> Self {
        Self::ImageNotReady {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this error came from releasing the port
    pub const fn is_detach(&self) -> bool {
        matches!(self, Self::Detach { .. })
    }
}
