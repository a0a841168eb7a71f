//! The cycle-serial acquisition/compute loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cf_core::{ChannelId, Real};
use cf_daq::{AdcDevice, SampleSource};
use cf_sense::{AdcScaling, ChannelCalibration, convert};
use tracing::{info, warn};

use crate::bus::ResultBus;
use crate::engine::{CycleResult, EngineConfig, FlowSetting, HeatBalanceEngine};
use crate::error::{PipelineError, PipelineResult};
use crate::filter::{FilterBank, FilterMode};
use crate::health::PipelineHealth;
use crate::topology::{self, ChannelReading, StagePosition};

/// Pipeline-level settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target cycle rate [Hz], bounded above by the converters' actual
    /// throughput: the loop paces itself with sleep-to-deadline and never
    /// outruns the hardware.
    pub cycle_rate_hz: Real,
    pub filter: FilterMode,
    pub adc: AdcScaling,
    pub engine: EngineConfig,
    /// Published results retained for a lagging consumer.
    pub bus_capacity: usize,
}

/// Owns every stage of the pipeline and drives it one cycle at a time.
///
/// Strictly cycle-serial: no cycle overlaps another, so the filter bank
/// needs no synchronization. The shutdown flag is honored between cycles
/// only, guaranteeing no partial cycle is ever published.
pub struct Coordinator<A: AdcDevice> {
    source: SampleSource<A>,
    calibrations: HashMap<ChannelId, ChannelCalibration>,
    stages: Vec<StagePosition>,
    filter: FilterBank,
    engine: HeatBalanceEngine,
    adc: AdcScaling,
    cycle_rate_hz: Real,
    bus: ResultBus,
    health: Arc<PipelineHealth>,
    shutdown: Arc<AtomicBool>,
    sequence: u64,
}

impl<A: AdcDevice> Coordinator<A> {
    pub fn new(
        source: SampleSource<A>,
        calibrations: Vec<ChannelCalibration>,
        stages: Vec<StagePosition>,
        config: PipelineConfig,
    ) -> PipelineResult<Self> {
        if !(config.cycle_rate_hz.is_finite() && config.cycle_rate_hz > 0.0) {
            return Err(PipelineError::InvalidSetup {
                what: "cycle rate must be positive",
            });
        }
        if config.filter.window() == 0 {
            return Err(PipelineError::InvalidSetup {
                what: "filter window must be at least one sample",
            });
        }
        if let FilterMode::Ewma { alpha, .. } = config.filter {
            if !(alpha.is_finite() && alpha > 0.0 && alpha <= 1.0) {
                return Err(PipelineError::InvalidSetup {
                    what: "smoothing factor must be in (0, 1]",
                });
            }
        }
        config
            .adc
            .validate()
            .map_err(|_| PipelineError::InvalidSetup {
                what: "converter scaling rejected",
            })?;

        topology::validate_chain(&stages)?;

        let mut by_channel = HashMap::new();
        for cal in calibrations {
            cal.validate().map_err(|_| PipelineError::InvalidSetup {
                what: "channel calibration rejected",
            })?;
            if !source.channels().contains(&cal.channel) {
                return Err(PipelineError::InvalidSetup {
                    what: "calibrated channel is not sampled",
                });
            }
            if by_channel.insert(cal.channel, cal).is_some() {
                return Err(PipelineError::InvalidSetup {
                    what: "duplicate calibration for one channel",
                });
            }
        }
        for stage in &stages {
            if !by_channel.contains_key(&stage.inlet) || !by_channel.contains_key(&stage.outlet) {
                return Err(PipelineError::InvalidSetup {
                    what: "stage references an uncalibrated channel",
                });
            }
        }

        let engine = HeatBalanceEngine::new(config.engine)?;
        if let FlowSetting::Measured { channel, .. } = &engine.config().flow {
            if !source.channels().contains(channel) {
                return Err(PipelineError::InvalidSetup {
                    what: "flow channel is not sampled",
                });
            }
        }

        let temperature_channels: Vec<ChannelId> = by_channel.keys().copied().collect();
        Ok(Self {
            source,
            filter: FilterBank::new(config.filter, &temperature_channels),
            calibrations: by_channel,
            stages,
            engine,
            adc: config.adc,
            cycle_rate_hz: config.cycle_rate_hz,
            bus: ResultBus::new(config.bus_capacity),
            health: Arc::new(PipelineHealth::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            sequence: 0,
        })
    }

    /// Handle to the published-result queue.
    pub fn bus(&self) -> ResultBus {
        self.bus.clone()
    }

    pub fn health(&self) -> Arc<PipelineHealth> {
        Arc::clone(&self.health)
    }

    /// Flag checked between cycles; set it to stop [`Coordinator::run`].
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// The filter fill level of one channel (diagnostics and tests).
    pub fn filter_fill(&self, channel: ChannelId) -> usize {
        self.filter.fill(channel)
    }

    /// Acquire and compute one cycle.
    fn cycle(&mut self) -> PipelineResult<CycleResult> {
        let raw = self.source.next_cycle()?;
        let flow_l_per_s = self
            .engine
            .config()
            .flow
            .volumetric_l_per_s(&raw, &self.adc)?;

        let mut readings = Vec::with_capacity(raw.len());
        let mut invalid_channels = Vec::new();
        for sample in &raw {
            // Channels without calibration (e.g. the flow meter) are not
            // temperature channels.
            let Some(cal) = self.calibrations.get(&sample.channel) else {
                continue;
            };
            match convert(sample, cal, &self.adc) {
                Ok(mut temperature) => {
                    temperature.kelvin = self.filter.update(temperature.channel, temperature.kelvin);
                    readings.push(ChannelReading {
                        channel: temperature.channel,
                        sample: Some(temperature),
                    });
                }
                Err(err) => {
                    // Channel-level failure: the cycle continues with this
                    // channel flagged, and its filter window is not fed.
                    warn!(channel = %sample.channel, %err, "channel invalid this cycle");
                    invalid_channels.push(sample.channel.index());
                    readings.push(ChannelReading {
                        channel: sample.channel,
                        sample: None,
                    });
                }
            }
        }

        let temps = topology::route(&readings, &self.stages)?;
        let result = self.engine.compute(
            self.sequence,
            &self.stages,
            &temps,
            flow_l_per_s,
            invalid_channels,
        );
        self.sequence += 1;
        Ok(result)
    }

    /// Run one full iteration: acquire, compute, publish or drop.
    pub fn tick(&mut self) {
        match self.cycle() {
            Ok(result) => {
                let tolerance = self.engine.config().consistency_tolerance_mk;
                let violations = result
                    .stages
                    .iter()
                    .filter(|s| s.consistency_error_mk.is_some_and(|e| e > tolerance))
                    .count() as u64;
                self.health.record_violations(violations);
                self.health
                    .record_invalid_channels(result.invalid_channels.len() as u64);
                self.health.record_published();
                self.bus.publish(result);
            }
            Err(err) => {
                self.health.record_dropped();
                match &err {
                    PipelineError::Acquisition(_) => {
                        // Post-fault samples have unknown continuity with
                        // the pre-fault window; start fresh.
                        self.filter.reset();
                        warn!(%err, "cycle dropped, filter state cleared");
                    }
                    _ => warn!(%err, "cycle dropped"),
                }
            }
        }
    }

    /// Run until the shutdown flag is raised.
    pub fn run(&mut self) {
        let period = Duration::from_secs_f64(1.0 / self.cycle_rate_hz);
        info!(
            stages = self.stages.len(),
            channels = self.calibrations.len(),
            rate_hz = self.cycle_rate_hz,
            "acquisition loop started"
        );
        while !self.shutdown.load(Ordering::Relaxed) {
            let started = Instant::now();
            self.tick();
            if let Some(remaining) = period.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }
        info!("acquisition loop stopped");
    }
}

/// A running pipeline on its own thread.
pub struct PipelineHandle {
    pub bus: ResultBus,
    pub health: Arc<PipelineHealth>,
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl PipelineHandle {
    /// Ask the loop to stop after its current cycle.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop the loop and wait for the thread to finish.
    pub fn shutdown(self) {
        self.request_shutdown();
        let _ = self.handle.join();
    }
}

/// Move the coordinator onto a dedicated acquisition thread.
pub fn spawn<A>(mut coordinator: Coordinator<A>) -> PipelineHandle
where
    A: AdcDevice + Send + 'static,
{
    let bus = coordinator.bus();
    let health = coordinator.health();
    let shutdown = coordinator.shutdown_flag();
    let handle = thread::spawn(move || coordinator.run());
    PipelineHandle {
        bus,
        health,
        shutdown,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_coolant::Coolant;
    use cf_daq::{DeviceFault, EmulatedAdc, SourceConfig};

    fn ch(i: u16) -> ChannelId {
        ChannelId::from_index(i)
    }

    fn pt1000(channel: u16) -> ChannelCalibration {
        ChannelCalibration {
            channel: ch(channel),
            excitation_v: 5.0,
            series_resistance_ohm: 9962.0,
            reference_ratio: 9.0918,
            r0_ohm: 1000.0,
            wiring_offset_ohm: 0.0,
            zero_offset_counts: 0.0,
            temperature_offset_k: 0.0,
            valid_range_c: (-10.0, 90.0),
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            cycle_rate_hz: 500.0,
            filter: FilterMode::Sma { window: 4 },
            adc: AdcScaling::default(),
            engine: EngineConfig {
                flow: FlowSetting::Constant {
                    rate_l_per_min: 0.5,
                },
                coolant: Coolant::default(),
                consistency_tolerance_mk: 5.0,
            },
            bus_capacity: 16,
        }
    }

    /// Two stages on channels 0-1-2 at 20.000 / 20.050 / 20.120 degC.
    fn rig(device: EmulatedAdc) -> Coordinator<EmulatedAdc> {
        let cals: Vec<ChannelCalibration> = (0..3).map(pt1000).collect();
        let stages = vec![
            StagePosition {
                index: 0,
                name: "hs_1".into(),
                inlet: ch(0),
                outlet: ch(1),
            },
            StagePosition {
                index: 1,
                name: "hs_2".into(),
                inlet: ch(1),
                outlet: ch(2),
            },
        ];
        let source = SampleSource::new(
            vec![device],
            vec![ch(0), ch(1), ch(2)],
            SourceConfig::default(),
        )
        .unwrap();
        Coordinator::new(source, cals, stages, config()).unwrap()
    }

    fn device_at(temps_c: [f64; 3]) -> EmulatedAdc {
        let adc = AdcScaling::default();
        let codes: Vec<(u8, i32)> = temps_c
            .iter()
            .enumerate()
            .map(|(i, &t)| (i as u8, cf_sense::synthesize_code(t, &pt1000(i as u16), &adc)))
            .collect();
        EmulatedAdc::from_codes(&codes)
    }

    #[test]
    fn tick_publishes_expected_powers() {
        let mut coordinator = rig(device_at([20.000, 20.050, 20.120]));
        let bus = coordinator.bus();
        coordinator.tick();

        let result = bus.try_recv().expect("one result published");
        assert!(result.consistent);
        let p0 = result.stages[0].power_w.unwrap();
        let p1 = result.stages[1].power_w.unwrap();
        assert!((p0 - 1.744).abs() < 0.01, "p0 = {p0}");
        assert!((p1 - 2.442).abs() < 0.01, "p1 = {p1}");
        assert_eq!(coordinator.health().snapshot().cycles_published, 1);
    }

    #[test]
    fn acquisition_fault_drops_cycle_and_clears_filters() {
        let mut device = device_at([20.000, 20.050, 20.120]);
        // Three reads per cycle: fault on the first read of cycle 2.
        device.fail_after(3, DeviceFault::Bus("checksum".into()));
        let mut coordinator = rig(device);
        let bus = coordinator.bus();

        coordinator.tick();
        assert_eq!(coordinator.filter_fill(ch(0)), 1);

        coordinator.tick();
        let health = coordinator.health().snapshot();
        assert_eq!(health.cycles_dropped, 1);
        assert_eq!(coordinator.filter_fill(ch(0)), 0);
        assert_eq!(coordinator.filter_fill(ch(2)), 0);

        // Recovery: the next cycle publishes again from a fresh window.
        coordinator.tick();
        assert_eq!(coordinator.filter_fill(ch(0)), 1);
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn invalid_channel_flags_without_dropping() {
        let adc = AdcScaling::default();
        let mut device = device_at([20.000, 20.050, 20.120]);
        // Channel 2 reads far outside its valid range: a detached sensor.
        device.set_code(2, cf_sense::synthesize_code(89.9, &pt1000(2), &adc) + 2_000_000);
        let mut coordinator = rig(device);
        let bus = coordinator.bus();

        coordinator.tick();
        let result = bus.try_recv().unwrap();
        assert_eq!(result.invalid_channels, vec![2]);
        assert!(result.stages[0].valid);
        assert!(!result.stages[1].valid);
        let health = coordinator.health().snapshot();
        assert_eq!(health.cycles_published, 1);
        assert_eq!(health.invalid_channel_events, 1);
    }

    #[test]
    fn setup_rejects_uncalibrated_stage_channel() {
        let cals = vec![pt1000(0), pt1000(1)];
        let stages = vec![StagePosition {
            index: 0,
            name: "hs_1".into(),
            inlet: ch(0),
            outlet: ch(2),
        }];
        let source = SampleSource::new(
            vec![device_at([20.0, 20.0, 20.0])],
            vec![ch(0), ch(1), ch(2)],
            SourceConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            Coordinator::new(source, cals, stages, config()),
            Err(PipelineError::InvalidSetup { .. })
        ));
    }

    #[test]
    fn spawned_pipeline_publishes_and_shuts_down() {
        let coordinator = rig(device_at([20.000, 20.050, 20.120]));
        let handle = spawn(coordinator);

        let result = handle
            .bus
            .recv_timeout(Duration::from_secs(5))
            .expect("pipeline produced a result");
        assert!(result.consistent);

        handle.shutdown();
    }
}
