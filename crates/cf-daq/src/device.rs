//! Converter device abstraction.
//!
//! The register-level driver for a concrete ADC part lives outside this
//! crate; the sample source only needs start-conversion / read-result
//! primitives keyed by the converter-local input number.

use std::time::Duration;
use thiserror::Error;

/// Fault reported by a device driver, without device identity; the sample
/// source attaches the converter index when mapping into [`crate::DaqError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceFault {
    /// The conversion did not complete within the allowed time.
    #[error("conversion deadline missed")]
    Timeout,

    /// Transfer-level failure (framing, checksum, dropped ready signal).
    #[error("bus failure: {0}")]
    Bus(String),
}

/// One multi-channel delta-sigma converter on the shared bus.
///
/// Implementations are synchronous: `begin_conversion` must return without
/// waiting for the conversion (it only programs the mux and issues the sync
/// command), while `read_code` blocks until data-ready or `timeout`.
pub trait AdcDevice {
    /// Program the input multiplexer and start a conversion. Non-blocking.
    fn begin_conversion(&mut self, input: u8) -> Result<(), DeviceFault>;

    /// Block until the in-flight conversion completes, then return its
    /// 24-bit two's-complement code.
    fn read_code(&mut self, input: u8, timeout: Duration) -> Result<i32, DeviceFault>;

    /// Number of usable inputs on this converter (at most 8).
    fn input_count(&self) -> u8;
}
