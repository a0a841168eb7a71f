//! Project validation.
//!
//! A project that passes here can be handed to the pipeline without
//! further checks failing: every cross-reference resolves, the series
//! chain is intact, and every channel's characteristic is monotonic over
//! its valid range.

use std::collections::HashSet;

use cf_pipeline::topology::{self, RouterError};
use cf_sense::rtd;
use thiserror::Error;

use crate::schema::{FlowConfig, LATEST_VERSION, Project};
use crate::build;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("unsupported project version {found} (expected {LATEST_VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("no channels configured")]
    NoChannels,

    #[error("duplicate channel id {id}")]
    DuplicateChannel { id: u16 },

    #[error("channel id {id} exceeds the dual-converter range")]
    ChannelIdOutOfRange { id: u16 },

    #[error("channel {id}: {message}")]
    Channel { id: u16, message: String },

    #[error("converter scaling: {message}")]
    Scaling { message: String },

    #[error("stage '{name}' references unknown channel {id}")]
    UnknownChannel { name: String, id: u16 },

    #[error(transparent)]
    Topology(#[from] RouterError),

    #[error("flow channel {id} is also configured as a temperature channel")]
    FlowChannelCollision { id: u16 },

    #[error("channel {id}: characteristic is not monotonic over the valid range")]
    NonMonotonic { id: u16 },

    #[error("{what}")]
    Parameter { what: &'static str },
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version != LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            found: project.version,
        });
    }

    if project.channels.is_empty() {
        return Err(ValidationError::NoChannels);
    }
    let mut seen = HashSet::new();
    for channel in &project.channels {
        if channel.id >= 16 {
            return Err(ValidationError::ChannelIdOutOfRange { id: channel.id });
        }
        if !seen.insert(channel.id) {
            return Err(ValidationError::DuplicateChannel { id: channel.id });
        }
        build::calibration(channel)
            .validate()
            .map_err(|err| ValidationError::Channel {
                id: channel.id,
                message: err.to_string(),
            })?;
        check_monotonic(channel)?;
    }

    build::scaling(&project.adc)
        .validate()
        .map_err(|err| ValidationError::Scaling {
            message: err.to_string(),
        })?;

    if !(project.cycle_rate_hz.is_finite() && project.cycle_rate_hz > 0.0) {
        return Err(ValidationError::Parameter {
            what: "cycle rate must be positive",
        });
    }
    if !(project.consistency_tolerance_mk.is_finite() && project.consistency_tolerance_mk > 0.0) {
        return Err(ValidationError::Parameter {
            what: "consistency tolerance must be positive",
        });
    }
    if project.filter.window() == 0 {
        return Err(ValidationError::Parameter {
            what: "filter window must be at least one sample",
        });
    }
    if let cf_pipeline::FilterMode::Ewma { alpha, .. } = project.filter {
        if !(alpha.is_finite() && alpha > 0.0 && alpha <= 1.0) {
            return Err(ValidationError::Parameter {
                what: "smoothing factor must be in (0, 1]",
            });
        }
    }
    if project.bus_capacity == 0 {
        return Err(ValidationError::Parameter {
            what: "bus capacity must be at least one result",
        });
    }

    project
        .coolant
        .validate()
        .map_err(|_| ValidationError::Parameter {
            what: "coolant model rejected its parameters",
        })?;

    match &project.flow {
        FlowConfig::Constant { rate_l_per_min } => {
            if !(rate_l_per_min.is_finite() && *rate_l_per_min > 0.0) {
                return Err(ValidationError::Parameter {
                    what: "flow rate must be positive",
                });
            }
        }
        FlowConfig::Measured {
            channel,
            sensitivity_l_per_s_per_v,
            ..
        } => {
            if *channel >= 16 {
                return Err(ValidationError::ChannelIdOutOfRange { id: *channel });
            }
            if seen.contains(channel) {
                return Err(ValidationError::FlowChannelCollision { id: *channel });
            }
            if !(sensitivity_l_per_s_per_v.is_finite() && *sensitivity_l_per_s_per_v > 0.0) {
                return Err(ValidationError::Parameter {
                    what: "flow sensitivity must be positive",
                });
            }
        }
    }

    for stage in &project.stages {
        for id in [stage.inlet, stage.outlet] {
            if !seen.contains(&id) {
                return Err(ValidationError::UnknownChannel {
                    name: stage.name.clone(),
                    id,
                });
            }
        }
    }
    topology::validate_chain(&build::stage_positions(project))?;

    Ok(())
}

/// Walk the characteristic over the channel's valid range and require a
/// strictly increasing resistance-to-temperature mapping.
fn check_monotonic(channel: &crate::schema::ChannelConfig) -> Result<(), ValidationError> {
    const GRID: usize = 33;
    let (lo, hi) = channel.valid_range_c;
    let r_lo = rtd::resistance_norm(lo);
    let r_hi = rtd::resistance_norm(hi);

    let mut previous = None;
    for i in 0..GRID {
        let r_norm = r_lo + (r_hi - r_lo) * i as f64 / (GRID - 1) as f64;
        let t = rtd::temperature_c(r_norm);
        if !t.is_finite() {
            return Err(ValidationError::NonMonotonic { id: channel.id });
        }
        if let Some(prev) = previous {
            // Tolerate the sub-microkelvin seam of the sub-zero fit.
            if t <= prev - 1e-6 {
                return Err(ValidationError::NonMonotonic { id: channel.id });
            }
        }
        previous = Some(t);
    }
    Ok(())
}
