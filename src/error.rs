//! Error taxonomy for discovery, grouping and rendering.
//!
//! Per-device problems (`InvalidFormat`, `NotFound`) are handled where they
//! happen: the device gets skipped or loses its properties. Everything else
//! bubbles up to `main` and ends the run with exit code 1.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed BDF or group id text.
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),

    /// Attribute file, symlink or database record is missing.
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// A group or the group table is full. The host has more devices than
    /// we were built to handle, so skipping would silently lie.
    #[error("capacity exceeded: more than {limit} {what}")]
    CapacityExceeded { what: &'static str, limit: usize },

    /// Buffer capacity cannot even hold the terminator byte.
    #[error("buffer capacity {0} is too small")]
    CapacityTooSmall(usize),

    #[error("out of memory")]
    OutOfMemory,

    /// JSON output did not fit even in the largest buffer we allow.
    #[error("JSON output exceeds {max} bytes")]
    BufferExhausted { max: usize },

    /// The enumeration root itself could not be read.
    #[error("cannot enumerate {what}: {reason}")]
    Enumerate { what: String, reason: String },

    /// stdout refused our output.
    #[error("cannot write output: {0}")]
    Output(String),

    /// Bad command-line usage.
    #[error("{0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn enumerate(what: impl Into<String>, reason: impl core::fmt::Display) -> Self {
        Error::Enumerate {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that only affect a single device.
    pub fn is_per_device(&self) -> bool {
        matches!(self, Error::InvalidFormat(_) | Error::NotFound(_))
    }
}
