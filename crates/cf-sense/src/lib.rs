//! cf-sense: deflection-bridge to temperature conversion.
//!
//! Each measurement channel is a platinum RTD in the lower arm of a
//! single-active-arm deflection bridge. The converter reads the bridge
//! imbalance; this crate recovers the sensor resistance from that
//! deflection, applies the inverted Callendar–Van Dusen characteristic to
//! get a temperature, and attaches an uncertainty estimate derived from
//! the converter's noise floor.

pub mod bridge;
pub mod calibration;
pub mod convert;
pub mod error;
pub mod rtd;

pub use calibration::{AdcScaling, ChannelCalibration};
pub use convert::{TemperatureSample, convert, synthesize_code};
pub use error::{SenseError, SenseResult};
