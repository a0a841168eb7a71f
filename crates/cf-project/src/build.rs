//! Project schema to runtime pipeline parts.

use std::time::Duration;

use cf_core::ChannelId;
use cf_daq::SourceConfig;
use cf_pipeline::{EngineConfig, FlowSetting, PipelineConfig, StagePosition};
use cf_sense::{AdcScaling, ChannelCalibration};

use crate::schema::{AdcConfig, ChannelConfig, FlowConfig, Project};
use crate::{ProjectResult, validate_project};

/// Everything the pipeline coordinator needs, built from one project.
#[derive(Debug, Clone)]
pub struct RigParts {
    pub calibrations: Vec<ChannelCalibration>,
    pub stages: Vec<StagePosition>,
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    /// Every channel the sample source must read, including a measured
    /// flow channel when configured.
    pub channels: Vec<ChannelId>,
}

pub(crate) fn scaling(adc: &AdcConfig) -> AdcScaling {
    AdcScaling {
        vref_v: adc.vref_v,
        gain: adc.gain,
        noise_counts: adc.noise_counts,
    }
}

pub(crate) fn calibration(channel: &ChannelConfig) -> ChannelCalibration {
    ChannelCalibration {
        channel: ChannelId::from_index(channel.id),
        excitation_v: channel.excitation_v,
        series_resistance_ohm: channel.series_resistance_ohm,
        reference_ratio: channel.reference_ratio,
        r0_ohm: channel.r0_ohm,
        wiring_offset_ohm: channel.wiring_offset_ohm,
        zero_offset_counts: channel.zero_offset_counts,
        temperature_offset_k: channel.temperature_offset_k,
        valid_range_c: channel.valid_range_c,
    }
}

pub(crate) fn stage_positions(project: &Project) -> Vec<StagePosition> {
    project
        .stages
        .iter()
        .enumerate()
        .map(|(index, stage)| StagePosition {
            index,
            name: stage.name.clone(),
            inlet: ChannelId::from_index(stage.inlet),
            outlet: ChannelId::from_index(stage.outlet),
        })
        .collect()
}

fn flow_setting(flow: &FlowConfig) -> FlowSetting {
    match flow {
        FlowConfig::Constant { rate_l_per_min } => FlowSetting::Constant {
            rate_l_per_min: *rate_l_per_min,
        },
        FlowConfig::Measured {
            channel,
            sensitivity_l_per_s_per_v,
            zero_offset_counts,
        } => FlowSetting::Measured {
            channel: ChannelId::from_index(*channel),
            sensitivity_l_per_s_per_v: *sensitivity_l_per_s_per_v,
            zero_offset_counts: *zero_offset_counts,
        },
    }
}

/// Validate a project and build the pipeline's constructor arguments.
pub fn build_coordinator_parts(project: &Project) -> ProjectResult<RigParts> {
    validate_project(project)?;

    let mut channels: Vec<ChannelId> = project
        .channels
        .iter()
        .map(|c| ChannelId::from_index(c.id))
        .collect();
    if let FlowConfig::Measured { channel, .. } = &project.flow {
        channels.push(ChannelId::from_index(*channel));
    }
    channels.sort();

    Ok(RigParts {
        calibrations: project.channels.iter().map(calibration).collect(),
        stages: stage_positions(project),
        pipeline: PipelineConfig {
            cycle_rate_hz: project.cycle_rate_hz,
            filter: project.filter,
            adc: scaling(&project.adc),
            engine: EngineConfig {
                flow: flow_setting(&project.flow),
                coolant: project.coolant.clone(),
                consistency_tolerance_mk: project.consistency_tolerance_mk,
            },
            bus_capacity: project.bus_capacity,
        },
        source: SourceConfig {
            conversion_timeout: Duration::from_millis(project.acquisition.conversion_timeout_ms),
            max_skew: Duration::from_micros(project.acquisition.max_skew_us),
        },
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_builds_complete_parts() {
        let project = Project::example();
        let parts = build_coordinator_parts(&project).unwrap();

        assert_eq!(parts.calibrations.len(), 3);
        assert_eq!(parts.stages.len(), 2);
        assert_eq!(parts.channels.len(), 3);
        assert_eq!(parts.stages[0].outlet, parts.stages[1].inlet);
        assert_eq!(parts.source.conversion_timeout, Duration::from_secs(2));
    }

    #[test]
    fn measured_flow_adds_its_channel_to_the_scan() {
        let mut project = Project::example();
        project.flow = FlowConfig::Measured {
            channel: 7,
            sensitivity_l_per_s_per_v: 0.02371,
            zero_offset_counts: 0.0,
        };
        let parts = build_coordinator_parts(&project).unwrap();
        assert_eq!(parts.channels.len(), 4);
        assert!(parts.channels.contains(&ChannelId::from_index(7)));
    }

    #[test]
    fn invalid_project_does_not_build() {
        let mut project = Project::example();
        project.stages.clear();
        assert!(build_coordinator_parts(&project).is_err());
    }
}
