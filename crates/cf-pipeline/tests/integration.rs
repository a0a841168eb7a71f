//! End-to-end pipeline test over an emulated dual-converter rig.

use std::time::Duration;

use cf_coolant::Coolant;
use cf_core::{ChannelId, Tolerances, nearly_equal};
use cf_daq::{DeviceFault, EmulatedAdc, SampleSource, SourceConfig};
use cf_pipeline::{
    Coordinator, EngineConfig, FilterMode, FlowSetting, PipelineConfig, StagePosition,
};
use cf_sense::{AdcScaling, ChannelCalibration, synthesize_code};

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

/// Three heat sources across two converters: sensors 0..2 on converter 0,
/// sensor 8 (flat index of converter 1 input 0) closing the chain.
fn stages() -> Vec<StagePosition> {
    let sensors = [ch(0), ch(1), ch(2), ch(8)];
    (0..3)
        .map(|index| StagePosition {
            index,
            name: format!("hs_{}", index + 1),
            inlet: sensors[index],
            outlet: sensors[index + 1],
        })
        .collect()
}

fn rig(temps_c: [f64; 4], filter: FilterMode) -> Coordinator<EmulatedAdc> {
    let adc = AdcScaling::default();
    let channels = [0_u16, 1, 2, 8];
    let cals: Vec<ChannelCalibration> = channels.iter().map(|&i| pt1000(i)).collect();

    let mut dev_a = EmulatedAdc::new();
    let mut dev_b = EmulatedAdc::new();
    for (id, t) in channels.iter().zip(temps_c) {
        let cal = pt1000(*id);
        let code = synthesize_code(t, &cal, &adc);
        let channel = ch(*id);
        if channel.device() == 0 {
            dev_a.set_code(channel.input() as u8, code);
        } else {
            dev_b.set_code(channel.input() as u8, code);
        }
    }

    let source = SampleSource::new(
        vec![dev_a, dev_b],
        channels.iter().map(|&i| ch(i)).collect(),
        SourceConfig::default(),
    )
    .unwrap();

    let config = PipelineConfig {
        cycle_rate_hz: 1000.0,
        filter,
        adc,
        engine: EngineConfig {
            flow: FlowSetting::Constant {
                rate_l_per_min: 0.5,
            },
            coolant: Coolant::default(),
            consistency_tolerance_mk: 5.0,
        },
        bus_capacity: 64,
    };
    Coordinator::new(source, cals, stages(), config).unwrap()
}

#[test]
fn steady_rig_converges_and_balances() {
    let temps = [20.000, 20.050, 20.120, 20.170];
    let mut coordinator = rig(temps, FilterMode::Sma { window: 8 });
    let bus = coordinator.bus();

    for _ in 0..8 {
        coordinator.tick();
    }

    // Constant input: after a full window the smoothed output equals the
    // single-sample conversion, so every published cycle agrees.
    let mut last = None;
    while let Some(result) = bus.try_recv() {
        last = Some(result);
    }
    let result = last.expect("published results");

    assert!(result.consistent);
    assert!(result.invalid_channels.is_empty());
    let powers: Vec<f64> = result
        .stages
        .iter()
        .map(|s| s.power_w.expect("valid stage"))
        .collect();
    assert!((powers[0] - 1.744).abs() < 0.01, "p0 = {}", powers[0]);
    assert!((powers[1] - 2.442).abs() < 0.01, "p1 = {}", powers[1]);
    assert!((powers[2] - 1.744).abs() < 0.01, "p2 = {}", powers[2]);

    let sum: f64 = powers.iter().sum();
    assert!(nearly_equal(
        result.cumulative_power_w,
        sum,
        Tolerances::default()
    ));

    let health = coordinator.health().snapshot();
    assert_eq!(health.cycles_published, 8);
    assert_eq!(health.cycles_dropped, 0);
    assert_eq!(health.consistency_violations, 0);
}

#[test]
fn fault_on_second_converter_drops_cycle_then_recovers() {
    let temps = [20.000, 20.050, 20.120, 20.170];
    let adc = AdcScaling::default();

    let mut dev_a = EmulatedAdc::new();
    for i in 0..3u8 {
        dev_a.set_code(i, synthesize_code(temps[i as usize], &pt1000(i as u16), &adc));
    }
    let mut dev_b = EmulatedAdc::new();
    dev_b.set_code(0, synthesize_code(temps[3], &pt1000(8), &adc));
    // Converter 1 serves one channel per cycle; its third read is cycle 3.
    dev_b.fail_after(2, DeviceFault::Bus("dropped ready signal".into()));

    let channels = vec![ch(0), ch(1), ch(2), ch(8)];
    let source = SampleSource::new(vec![dev_a, dev_b], channels, SourceConfig::default()).unwrap();
    let config = PipelineConfig {
        cycle_rate_hz: 1000.0,
        filter: FilterMode::Sma { window: 4 },
        adc,
        engine: EngineConfig {
            flow: FlowSetting::Constant {
                rate_l_per_min: 0.5,
            },
            coolant: Coolant::default(),
            consistency_tolerance_mk: 5.0,
        },
        bus_capacity: 64,
    };
    let mut coordinator = Coordinator::new(
        source,
        (0..3u16).map(pt1000).chain([pt1000(8)]).collect(),
        stages(),
        config,
    )
    .unwrap();
    let bus = coordinator.bus();

    coordinator.tick();
    coordinator.tick();
    assert_eq!(coordinator.filter_fill(ch(0)), 2);

    coordinator.tick(); // converter 1 faults: cycle dropped, filters cleared
    let health = coordinator.health().snapshot();
    assert_eq!(health.cycles_published, 2);
    assert_eq!(health.cycles_dropped, 1);
    assert_eq!(coordinator.filter_fill(ch(0)), 0);
    assert_eq!(coordinator.filter_fill(ch(8)), 0);

    coordinator.tick(); // recovered
    assert_eq!(coordinator.health().snapshot().cycles_published, 3);
    assert_eq!(coordinator.filter_fill(ch(0)), 1);
    assert_eq!(bus.len(), 3);
}

#[test]
fn ewma_rig_tracks_a_step_within_the_bus() {
    let temps = [20.000, 20.050, 20.120, 20.170];
    let mut coordinator = rig(
        temps,
        FilterMode::Ewma {
            window: 8,
            alpha: 0.5,
        },
    );
    let bus = coordinator.bus();

    for _ in 0..12 {
        coordinator.tick();
    }
    // Constant input converges regardless of smoothing mode.
    let mut last = None;
    while let Some(result) = bus.try_recv() {
        last = Some(result);
    }
    let result = last.unwrap();
    let p0 = result.stages[0].power_w.unwrap();
    assert!((p0 - 1.744).abs() < 0.01, "p0 = {p0}");
}

#[test]
fn slow_consumer_loses_oldest_results_only() {
    let temps = [20.000, 20.050, 20.120, 20.170];
    let adc = AdcScaling::default();
    let mut dev_a = EmulatedAdc::new();
    for i in 0..3u8 {
        dev_a.set_code(i, synthesize_code(temps[i as usize], &pt1000(i as u16), &adc));
    }
    let mut dev_b = EmulatedAdc::new();
    dev_b.set_code(0, synthesize_code(temps[3], &pt1000(8), &adc));

    let channels = vec![ch(0), ch(1), ch(2), ch(8)];
    let source = SampleSource::new(vec![dev_a, dev_b], channels, SourceConfig::default()).unwrap();
    let config = PipelineConfig {
        cycle_rate_hz: 1000.0,
        filter: FilterMode::Sma { window: 2 },
        adc,
        engine: EngineConfig {
            flow: FlowSetting::Constant {
                rate_l_per_min: 0.5,
            },
            coolant: Coolant::default(),
            consistency_tolerance_mk: 5.0,
        },
        bus_capacity: 4,
    };
    let mut coordinator = Coordinator::new(
        source,
        (0..3u16).map(pt1000).chain([pt1000(8)]).collect(),
        stages(),
        config,
    )
    .unwrap();
    let bus = coordinator.bus();

    for _ in 0..10 {
        coordinator.tick();
    }

    // Capacity 4: sequences 6..=9 remain, 0..=5 were discarded unread.
    assert_eq!(bus.dropped(), 6);
    assert_eq!(bus.recv_timeout(Duration::from_millis(10)).unwrap().sequence, 6);
    let mut seen = vec![];
    while let Some(result) = bus.try_recv() {
        seen.push(result.sequence);
    }
    assert_eq!(seen, vec![7, 8, 9]);
}
