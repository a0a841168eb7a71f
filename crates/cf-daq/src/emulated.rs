//! Emulated converter for tests and bench demos.

use std::collections::HashMap;
use std::time::Duration;

use crate::device::{AdcDevice, DeviceFault};

/// Deterministic in-memory stand-in for one converter.
///
/// Inputs report fixed codes set by the test; a planned fault can be armed
/// to fire on the n-th read, and an artificial read delay exercises the
/// skew bound in the sample source.
pub struct EmulatedAdc {
    codes: HashMap<u8, i32>,
    pending: Option<u8>,
    read_delay: Option<Duration>,
    fault_plan: Option<(usize, DeviceFault)>,
    reads: usize,
}

impl EmulatedAdc {
    pub fn new() -> Self {
        Self {
            codes: HashMap::new(),
            pending: None,
            read_delay: None,
            fault_plan: None,
            reads: 0,
        }
    }

    /// Build with fixed codes per input; unset inputs read as zero
    /// (a floating input near mid-scale).
    pub fn from_codes(codes: &[(u8, i32)]) -> Self {
        let mut adc = Self::new();
        for &(input, code) in codes {
            adc.codes.insert(input, code);
        }
        adc
    }

    /// Replace the code reported by one input.
    pub fn set_code(&mut self, input: u8, code: i32) {
        self.codes.insert(input, code);
    }

    /// Arm a one-shot fault that fires on read number `after_reads`
    /// (0-based); later reads succeed again.
    pub fn fail_after(&mut self, after_reads: usize, fault: DeviceFault) {
        self.fault_plan = Some((after_reads, fault));
    }

    /// Delay every read, simulating a slow conversion.
    pub fn set_read_delay(&mut self, delay: Duration) {
        self.read_delay = Some(delay);
    }
}

impl Default for EmulatedAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl AdcDevice for EmulatedAdc {
    fn begin_conversion(&mut self, input: u8) -> Result<(), DeviceFault> {
        self.pending = Some(input);
        Ok(())
    }

    fn read_code(&mut self, input: u8, _timeout: Duration) -> Result<i32, DeviceFault> {
        if self.pending != Some(input) {
            return Err(DeviceFault::Bus(format!(
                "read on input {input} with no conversion in flight"
            )));
        }
        self.pending = None;

        if let Some((after, _)) = &self.fault_plan {
            if self.reads >= *after {
                let (_, fault) = self.fault_plan.take().expect("plan present");
                self.reads += 1;
                return Err(fault);
            }
        }
        self.reads += 1;

        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }
        Ok(self.codes.get(&input).copied().unwrap_or(0))
    }

    fn input_count(&self) -> u8 {
        8
    }
}
