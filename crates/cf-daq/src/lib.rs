//! cf-daq: synchronized dual-ADC sample acquisition.
//!
//! Two 8-channel 24-bit converters hang off one shared serial bus and must
//! be time-multiplexed: this crate issues non-blocking conversion starts to
//! both devices before blocking on either result, which bounds the
//! inter-device timestamp skew to roughly one conversion latency. A cycle
//! either yields one raw sample per configured channel or fails whole;
//! partial cycles are never handed downstream.

pub mod device;
pub mod emulated;
pub mod error;
pub mod sample;
pub mod source;

pub use device::{AdcDevice, DeviceFault};
pub use emulated::EmulatedAdc;
pub use error::{DaqError, DaqResult, FaultReason};
pub use sample::{CODE_MAX, RawSample};
pub use source::{SampleSource, SourceConfig};
