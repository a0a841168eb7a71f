//! Acquisition error taxonomy.
//!
//! Every error in this crate is fatal to the current cycle: the coordinator
//! drops the cycle, resets downstream filter state, and keeps running.

use cf_core::ChannelId;
use thiserror::Error;

/// Result type for acquisition operations.
pub type DaqResult<T> = Result<T, DaqError>;

/// Why a conversion result could not be used.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FaultReason {
    /// Bus-level failure reported by the device driver.
    #[error("bus error: {0}")]
    Bus(String),

    /// Raw code outside the converter's 24-bit range.
    #[error("code {code} out of range on channel {channel}")]
    CodeOutOfRange { channel: ChannelId, code: i32 },

    /// The two converters' results for one mux slot drifted apart further
    /// than the configured clock-domain bound.
    #[error("inter-device skew {skew_us} us exceeds limit {max_us} us")]
    SkewExceeded { skew_us: u64, max_us: u64 },
}

/// Errors produced by a sampling cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DaqError {
    /// A device missed the per-conversion deadline.
    #[error("conversion timeout on converter {device} after {elapsed_ms} ms")]
    AcquisitionTimeout { device: usize, elapsed_ms: u64 },

    /// Bus error, bad code, or clock-domain violation.
    #[error("acquisition fault on converter {device}: {reason}")]
    AcquisitionFault { device: usize, reason: FaultReason },

    /// The source was constructed with an unusable device/channel layout.
    #[error("invalid acquisition setup: {what}")]
    InvalidSetup { what: &'static str },
}
