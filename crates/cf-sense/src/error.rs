//! Conversion errors.
//!
//! Unlike acquisition faults, these are channel-scoped: a sensor that
//! reads outside its valid domain invalidates only its own channel for
//! the cycle.

use cf_core::ChannelId;
use thiserror::Error;

/// Result type for conversion operations.
pub type SenseResult<T> = Result<T, SenseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SenseError {
    /// The reading left the sensor's valid domain — a disconnected or
    /// shorted sensor, or a drifted bridge.
    #[error("calibration out of range on channel {channel}: {what}")]
    CalibrationOutOfRange {
        channel: ChannelId,
        what: &'static str,
    },

    /// Arithmetic produced a non-finite intermediate.
    #[error("non-finite {what} on channel {channel}")]
    NonFinite {
        channel: ChannelId,
        what: &'static str,
    },

    /// A calibration record is internally inconsistent.
    #[error("invalid calibration: {what}")]
    InvalidCalibration { what: &'static str },
}
