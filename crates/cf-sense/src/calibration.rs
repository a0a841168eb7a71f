//! Per-channel calibration data and converter scaling.

use cf_core::ChannelId;
use cf_core::Real;
use cf_daq::CODE_MAX;

use crate::error::{SenseError, SenseResult};

/// Scaling shared by every channel of a converter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcScaling {
    /// Reference voltage between the converter's VREFP/VREFN pins.
    pub vref_v: Real,
    /// Programmable gain setting (1, 2, 4, 8, ...).
    pub gain: Real,
    /// RMS input noise expressed in counts; feeds the per-sample
    /// uncertainty estimate.
    pub noise_counts: Real,
}

impl AdcScaling {
    /// Input volts represented by one count at the configured gain.
    pub fn volts_per_count(&self) -> Real {
        self.vref_v * 2.0 / (self.gain * CODE_MAX as Real)
    }

    pub fn validate(&self) -> SenseResult<()> {
        if !(self.vref_v.is_finite() && self.vref_v > 0.0) {
            return Err(SenseError::InvalidCalibration {
                what: "reference voltage must be positive",
            });
        }
        if !(self.gain.is_finite() && self.gain >= 1.0) {
            return Err(SenseError::InvalidCalibration {
                what: "gain must be at least 1",
            });
        }
        if !(self.noise_counts.is_finite() && self.noise_counts >= 0.0) {
            return Err(SenseError::InvalidCalibration {
                what: "noise counts must be non-negative",
            });
        }
        Ok(())
    }
}

impl Default for AdcScaling {
    fn default() -> Self {
        // 2.5 V reference with gain 8: full scale spans 625 mV, which
        // comfortably covers the bridge deflection over the operating range.
        Self {
            vref_v: 2.5,
            gain: 8.0,
            noise_counts: 16.0,
        }
    }
}

/// Everything needed to turn one channel's raw code into a temperature.
///
/// Loaded once at startup from configuration and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCalibration {
    pub channel: ChannelId,
    /// Bridge excitation voltage [V].
    pub excitation_v: Real,
    /// Series (bias) resistor in the sensor arm [Ohm].
    pub series_resistance_ohm: Real,
    /// Reference divider ratio, upper arm over lower arm.
    pub reference_ratio: Real,
    /// RTD resistance at 0 °C [Ohm] (nominally 1000 for a Pt1000).
    pub r0_ohm: Real,
    /// Wiring resistance in series with the sensor [Ohm].
    pub wiring_offset_ohm: Real,
    /// Raw-code offset captured from a no-load calibration run.
    pub zero_offset_counts: Real,
    /// Residual temperature offset, e.g. sensor self-heating [K].
    pub temperature_offset_k: Real,
    /// Temperatures outside this window [°C] mark the channel invalid.
    pub valid_range_c: (Real, Real),
}

impl ChannelCalibration {
    /// Field-level sanity checks.
    pub fn validate(&self) -> SenseResult<()> {
        let positive = [
            (self.excitation_v, "excitation voltage"),
            (self.series_resistance_ohm, "series resistance"),
            (self.reference_ratio, "reference ratio"),
            (self.r0_ohm, "base resistance"),
        ];
        for (value, what) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SenseError::InvalidCalibration { what });
            }
        }
        if !self.wiring_offset_ohm.is_finite() || self.wiring_offset_ohm < 0.0 {
            return Err(SenseError::InvalidCalibration {
                what: "wiring offset must be non-negative",
            });
        }
        if !self.zero_offset_counts.is_finite() || !self.temperature_offset_k.is_finite() {
            return Err(SenseError::InvalidCalibration {
                what: "offsets must be finite",
            });
        }
        let (lo, hi) = self.valid_range_c;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(SenseError::InvalidCalibration {
                what: "valid range must be ordered",
            });
        }
        Ok(())
    }
}
