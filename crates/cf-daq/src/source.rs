//! Dual-converter synchronized sample source.

use std::time::{Duration, Instant};

use cf_core::ChannelId;
use tracing::{trace, warn};

use crate::device::{AdcDevice, DeviceFault};
use crate::error::{DaqError, DaqResult, FaultReason};
use crate::sample::RawSample;

/// Timing bounds for one sampling cycle.
#[derive(Debug, Clone, Copy)]
pub struct SourceConfig {
    /// Per-conversion deadline. The worst case for a slow output data rate
    /// with self-calibration enabled is over a second, so this is generous.
    pub conversion_timeout: Duration,
    /// Maximum spread between the two converters' completion times within
    /// one mux slot.
    pub max_skew: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            conversion_timeout: Duration::from_secs(2),
            max_skew: Duration::from_millis(10),
        }
    }
}

/// Drives up to two converters through one multiplexed sampling cycle.
///
/// Channels are grouped by mux slot; within a slot both converters get
/// their start command before either result is read, so neither conversion
/// idles on the bus while the other is collected.
pub struct SampleSource<A: AdcDevice> {
    devices: Vec<A>,
    channels: Vec<ChannelId>,
    config: SourceConfig,
}

impl<A: AdcDevice> SampleSource<A> {
    /// Build a source over `devices`, sampling exactly `channels` each cycle.
    pub fn new(devices: Vec<A>, mut channels: Vec<ChannelId>, config: SourceConfig) -> DaqResult<Self> {
        if devices.is_empty() || devices.len() > 2 {
            return Err(DaqError::InvalidSetup {
                what: "expected one or two converters",
            });
        }
        if channels.is_empty() {
            return Err(DaqError::InvalidSetup {
                what: "no channels configured",
            });
        }
        channels.sort();
        if channels.windows(2).any(|w| w[0] == w[1]) {
            return Err(DaqError::InvalidSetup {
                what: "duplicate channel configured",
            });
        }
        for ch in &channels {
            let dev = ch.device() as usize;
            if dev >= devices.len() {
                return Err(DaqError::InvalidSetup {
                    what: "channel references a missing converter",
                });
            }
            if ch.input() as u8 >= devices[dev].input_count() {
                return Err(DaqError::InvalidSetup {
                    what: "channel references a missing input",
                });
            }
        }
        Ok(Self {
            devices,
            channels,
            config,
        })
    }

    /// The channels sampled each cycle, in flat index order.
    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    /// Run one full sampling cycle.
    ///
    /// Returns exactly one sample per configured channel, or the first
    /// error encountered; on error the cycle is unusable as a whole.
    pub fn next_cycle(&mut self) -> DaqResult<Vec<RawSample>> {
        let mut samples = Vec::with_capacity(self.channels.len());

        for input in 0..8u8 {
            let slot: Vec<ChannelId> = self
                .channels
                .iter()
                .copied()
                .filter(|ch| ch.input() as u8 == input)
                .collect();
            if slot.is_empty() {
                continue;
            }

            // Start both conversions before reading either; a read on one
            // converter must not stall the other's in-flight conversion.
            for ch in &slot {
                let dev = ch.device() as usize;
                self.devices[dev]
                    .begin_conversion(input)
                    .map_err(|fault| map_fault(dev, fault, Duration::ZERO))?;
            }

            let mut first_done: Option<Instant> = None;
            for ch in &slot {
                let dev = ch.device() as usize;
                let started = Instant::now();
                let code = self.devices[dev]
                    .read_code(input, self.config.conversion_timeout)
                    .map_err(|fault| map_fault(dev, fault, started.elapsed()))?;
                let taken_at = Instant::now();

                let sample = RawSample {
                    channel: *ch,
                    code,
                    taken_at,
                };
                if !sample.code_in_range() {
                    warn!(channel = %ch, code, "conversion code outside 24-bit range");
                    return Err(DaqError::AcquisitionFault {
                        device: dev,
                        reason: FaultReason::CodeOutOfRange {
                            channel: *ch,
                            code,
                        },
                    });
                }

                if let Some(first) = first_done {
                    let skew = taken_at.duration_since(first);
                    if skew > self.config.max_skew {
                        warn!(input, skew_us = skew.as_micros() as u64, "inter-device skew limit exceeded");
                        return Err(DaqError::AcquisitionFault {
                            device: dev,
                            reason: FaultReason::SkewExceeded {
                                skew_us: skew.as_micros() as u64,
                                max_us: self.config.max_skew.as_micros() as u64,
                            },
                        });
                    }
                } else {
                    first_done = Some(taken_at);
                }

                samples.push(sample);
            }
        }

        // Acquisition walks mux slots; downstream wants flat channel order.
        samples.sort_by_key(|s| s.channel);
        trace!(n = samples.len(), "cycle acquired");
        Ok(samples)
    }

    /// Average raw codes over `cycles` no-load cycles, per channel.
    ///
    /// Used for zero-offset capture before a measurement session: the
    /// averaged codes become the `zero_offset_counts` calibration entries.
    pub fn capture_offsets(&mut self, cycles: usize) -> DaqResult<Vec<(ChannelId, f64)>> {
        if cycles == 0 {
            return Err(DaqError::InvalidSetup {
                what: "offset capture needs at least one cycle",
            });
        }
        let mut sums = vec![0.0_f64; self.channels.len()];
        for _ in 0..cycles {
            let batch = self.next_cycle()?;
            for (slot, sample) in sums.iter_mut().zip(batch.iter()) {
                *slot += sample.code as f64;
            }
        }
        Ok(self
            .channels
            .iter()
            .copied()
            .zip(sums.into_iter().map(|s| s / cycles as f64))
            .collect())
    }
}

fn map_fault(device: usize, fault: DeviceFault, elapsed: Duration) -> DaqError {
    match fault {
        DeviceFault::Timeout => DaqError::AcquisitionTimeout {
            device,
            elapsed_ms: elapsed.as_millis() as u64,
        },
        DeviceFault::Bus(message) => DaqError::AcquisitionFault {
            device,
            reason: FaultReason::Bus(message),
        },
    }
}
