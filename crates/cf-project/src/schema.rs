//! Project file schema.
//!
//! All fields carry explicit unit suffixes; the schema is deliberately
//! flat so a rig file diffs cleanly under version control.

use cf_coolant::Coolant;
use cf_pipeline::FilterMode;
use serde::{Deserialize, Serialize};

/// Schema version accepted by this build.
pub const LATEST_VERSION: u32 = 1;

fn default_bus_capacity() -> usize {
    256
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub version: u32,
    pub adc: AdcConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    pub cycle_rate_hz: f64,
    pub filter: FilterMode,
    pub consistency_tolerance_mk: f64,
    pub flow: FlowConfig,
    pub coolant: Coolant,
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
    pub channels: Vec<ChannelConfig>,
    pub stages: Vec<StageConfig>,
}

/// Converter scaling shared by all channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdcConfig {
    pub vref_v: f64,
    pub gain: f64,
    pub noise_counts: f64,
}

/// Bus timing bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub conversion_timeout_ms: u64,
    pub max_skew_us: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            conversion_timeout_ms: 2000,
            max_skew_us: 10_000,
        }
    }
}

/// Flow rate source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowConfig {
    Constant {
        rate_l_per_min: f64,
    },
    Measured {
        channel: u16,
        sensitivity_l_per_s_per_v: f64,
        #[serde(default)]
        zero_offset_counts: f64,
    },
}

/// One temperature channel and its bridge calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Flat channel index: converter * 8 + input.
    pub id: u16,
    pub name: String,
    pub excitation_v: f64,
    pub series_resistance_ohm: f64,
    pub reference_ratio: f64,
    pub r0_ohm: f64,
    #[serde(default)]
    pub wiring_offset_ohm: f64,
    #[serde(default)]
    pub zero_offset_counts: f64,
    #[serde(default)]
    pub temperature_offset_k: f64,
    pub valid_range_c: (f64, f64),
}

/// One heat source slot in the series coolant path, in flow order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub inlet: u16,
    pub outlet: u16,
}

impl Project {
    /// A ready-to-run two-stage example rig, also used by the bench demo.
    pub fn example() -> Self {
        let channel = |id: u16, name: &str, series: f64, r0: f64, wiring: f64| ChannelConfig {
            id,
            name: name.to_string(),
            excitation_v: 5.0,
            series_resistance_ohm: series,
            reference_ratio: 9.0918,
            r0_ohm: r0,
            wiring_offset_ohm: wiring,
            zero_offset_counts: 0.0,
            temperature_offset_k: 0.0,
            valid_range_c: (-10.0, 90.0),
        };
        Self {
            version: LATEST_VERSION,
            adc: AdcConfig {
                vref_v: 2.5,
                gain: 8.0,
                noise_counts: 16.0,
            },
            acquisition: AcquisitionConfig::default(),
            cycle_rate_hz: 10.0,
            filter: FilterMode::Sma { window: 16 },
            consistency_tolerance_mk: 5.0,
            flow: FlowConfig::Constant {
                rate_l_per_min: 0.5,
            },
            coolant: Coolant::default(),
            bus_capacity: default_bus_capacity(),
            channels: vec![
                channel(0, "Cold Inlet", 9962.00, 1000.000, 0.428),
                channel(1, "Heat Source 1", 9960.10, 1000.055, 0.355),
                channel(2, "Heat Source 2", 9980.48, 999.954, 0.350),
            ],
            stages: vec![
                StageConfig {
                    name: "Heat Source 1".to_string(),
                    inlet: 0,
                    outlet: 1,
                },
                StageConfig {
                    name: "Heat Source 2".to_string(),
                    inlet: 1,
                    outlet: 2,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_round_trips_through_yaml() {
        let project = Project::example();
        let yaml = serde_yaml::to_string(&project).unwrap();
        let back: Project = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(project, back);
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let yaml = r#"
version: 1
adc: { vref_v: 2.5, gain: 8, noise_counts: 16 }
cycle_rate_hz: 10.0
filter: { mode: sma, window: 16 }
consistency_tolerance_mk: 5.0
flow: { type: constant, rate_l_per_min: 0.5 }
coolant: { type: water }
channels:
  - id: 0
    name: Cold Inlet
    excitation_v: 5.0
    series_resistance_ohm: 9962.0
    reference_ratio: 9.0918
    r0_ohm: 1000.0
    valid_range_c: [-10.0, 90.0]
  - id: 1
    name: Heat Source 1
    excitation_v: 5.0
    series_resistance_ohm: 9960.0
    reference_ratio: 9.0918
    r0_ohm: 1000.0
    valid_range_c: [-10.0, 90.0]
stages:
  - { name: Heat Source 1, inlet: 0, outlet: 1 }
"#;
        let project: Project = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(project.bus_capacity, 256);
        assert_eq!(project.acquisition.conversion_timeout_ms, 2000);
        assert_eq!(project.channels[0].wiring_offset_ohm, 0.0);
        assert_eq!(project.coolant, Coolant::Water);
    }

    #[test]
    fn measured_flow_parses() {
        let yaml = r#"{ type: measured, channel: 7, sensitivity_l_per_s_per_v: 0.02371 }"#;
        let flow: FlowConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            flow,
            FlowConfig::Measured {
                channel: 7,
                sensitivity_l_per_s_per_v: 0.02371,
                zero_offset_counts: 0.0,
            }
        );
    }
}
