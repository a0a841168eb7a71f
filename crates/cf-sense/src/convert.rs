//! Raw code to calibrated temperature.

use std::time::Instant;

use cf_core::units::constants::T0_CELSIUS_K;
use cf_core::{ChannelId, Real};
use cf_daq::RawSample;

use crate::bridge;
use crate::calibration::{AdcScaling, ChannelCalibration};
use crate::error::{SenseError, SenseResult};
use crate::rtd;

/// One calibrated temperature reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureSample {
    pub channel: ChannelId,
    /// Absolute temperature [K].
    pub kelvin: Real,
    /// One-sigma estimate from the converter noise floor [K].
    pub uncertainty_k: Real,
    /// Acquisition completion time, copied from the raw sample.
    pub taken_at: Instant,
}

impl TemperatureSample {
    /// Temperature on the Celsius scale [°C].
    pub fn celsius(&self) -> Real {
        self.kelvin - T0_CELSIUS_K
    }
}

/// Sensor temperature [°C] for a raw code, without the valid-range check
/// or the residual temperature offset. `None` when the reading cannot be
/// solved at all (railed bridge, negative resistance, non-finite result).
fn theta_unchecked(code: Real, cal: &ChannelCalibration, adc: &AdcScaling) -> Option<Real> {
    let v_d = (code - cal.zero_offset_counts) * adc.volts_per_count();
    let r = bridge::resistance(
        v_d,
        cal.excitation_v,
        cal.reference_ratio,
        cal.series_resistance_ohm,
    )?;
    let r_sensor = r - cal.wiring_offset_ohm;
    if r_sensor <= 0.0 {
        return None;
    }
    let theta = rtd::temperature_c(r_sensor / cal.r0_ohm);
    theta.is_finite().then_some(theta)
}

/// Convert one raw sample into a calibrated temperature sample.
///
/// Fails with [`SenseError::CalibrationOutOfRange`] when the reading falls
/// outside the sensor's valid domain; this marks only the affected channel
/// invalid for the cycle.
pub fn convert(
    raw: &RawSample,
    cal: &ChannelCalibration,
    adc: &AdcScaling,
) -> SenseResult<TemperatureSample> {
    let code = raw.code as Real;
    let theta = theta_unchecked(code, cal, adc).ok_or(SenseError::CalibrationOutOfRange {
        channel: cal.channel,
        what: "bridge reading unsolvable (open or shorted sensor)",
    })?;

    let (lo, hi) = cal.valid_range_c;
    if theta < lo || theta > hi {
        return Err(SenseError::CalibrationOutOfRange {
            channel: cal.channel,
            what: "temperature outside sensor valid range",
        });
    }

    // Noise-band half-width, evaluated directly rather than through an
    // analytic derivative; falls back to a one-sided estimate against the
    // domain edge.
    let hi_side = theta_unchecked(code + adc.noise_counts, cal, adc);
    let lo_side = theta_unchecked(code - adc.noise_counts, cal, adc);
    let uncertainty_k = match (hi_side, lo_side) {
        (Some(h), Some(l)) => 0.5 * (h - l).abs(),
        (Some(h), None) => (h - theta).abs(),
        (None, Some(l)) => (theta - l).abs(),
        (None, None) => 0.0,
    };

    let kelvin = theta - cal.temperature_offset_k + T0_CELSIUS_K;
    if !kelvin.is_finite() {
        return Err(SenseError::NonFinite {
            channel: cal.channel,
            what: "temperature",
        });
    }

    Ok(TemperatureSample {
        channel: cal.channel,
        kelvin,
        uncertainty_k,
        taken_at: raw.taken_at,
    })
}

/// Raw code that would convert to the given temperature [°C].
///
/// Exact inverse of [`convert`] up to code quantization, for temperatures
/// at or above 0 °C pre-offset (the forward characteristic omits the
/// sub-zero term). Used to engineer synthetic readings for calibration
/// verification and bench rigs.
pub fn synthesize_code(theta_c: Real, cal: &ChannelCalibration, adc: &AdcScaling) -> i32 {
    let pre_offset = theta_c + cal.temperature_offset_k;
    let r = rtd::resistance_norm(pre_offset) * cal.r0_ohm + cal.wiring_offset_ohm;
    let v_d = bridge::deflection(
        r,
        cal.excitation_v,
        cal.reference_ratio,
        cal.series_resistance_ohm,
    );
    (v_d / adc.volts_per_count() + cal.zero_offset_counts).round() as i32
}
