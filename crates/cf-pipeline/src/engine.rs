//! Heat balance computation.
//!
//! `power = mdot * cp * deltaT` per stage, with a series-consistency
//! check: because the loop is series-connected, the outlet temperature of
//! stage i and the inlet temperature of stage i+1 are the same physical
//! location and must agree within tolerance. Disagreement means sensor
//! drift, a loop leak, or a miswired topology, and marks the downstream
//! stage suspect without stopping the pipeline.

use cf_coolant::{Coolant, CoolantModel};
use cf_core::{ChannelId, Real, units::k};
use cf_daq::RawSample;
use cf_sense::AdcScaling;
use serde::Serialize;
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};
use crate::topology::{RouterError, StagePosition, StageTemperatures};

/// Where the volumetric flow rate comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowSetting {
    /// Externally measured or pump-regulated constant rate.
    Constant { rate_l_per_min: Real },
    /// Dedicated flow-meter channel: volumetric rate is the channel
    /// voltage times the meter sensitivity.
    Measured {
        channel: ChannelId,
        sensitivity_l_per_s_per_v: Real,
        zero_offset_counts: Real,
    },
}

impl FlowSetting {
    pub fn validate(&self) -> PipelineResult<()> {
        match self {
            FlowSetting::Constant { rate_l_per_min } => {
                if !(rate_l_per_min.is_finite() && *rate_l_per_min > 0.0) {
                    return Err(PipelineError::InvalidSetup {
                        what: "constant flow rate must be positive",
                    });
                }
            }
            FlowSetting::Measured {
                sensitivity_l_per_s_per_v,
                zero_offset_counts,
                ..
            } => {
                if !(sensitivity_l_per_s_per_v.is_finite() && *sensitivity_l_per_s_per_v > 0.0) {
                    return Err(PipelineError::InvalidSetup {
                        what: "flow sensitivity must be positive",
                    });
                }
                if !zero_offset_counts.is_finite() {
                    return Err(PipelineError::InvalidSetup {
                        what: "flow zero offset must be finite",
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve the volumetric rate [L/s] for one cycle.
    pub fn volumetric_l_per_s(
        &self,
        raw: &[RawSample],
        adc: &AdcScaling,
    ) -> PipelineResult<Real> {
        match self {
            FlowSetting::Constant { rate_l_per_min } => Ok(rate_l_per_min / 60.0),
            FlowSetting::Measured {
                channel,
                sensitivity_l_per_s_per_v,
                zero_offset_counts,
            } => {
                let sample = raw.iter().find(|s| s.channel == *channel).ok_or(
                    PipelineError::Topology(RouterError::TopologyMismatch { channel: *channel }),
                )?;
                let volts = (sample.code as Real - zero_offset_counts) * adc.volts_per_count();
                // A stalled meter reads slightly below zero through noise.
                Ok((volts * sensitivity_l_per_s_per_v).max(0.0))
            }
        }
    }
}

/// Heat balance parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub flow: FlowSetting,
    pub coolant: Coolant,
    /// Allowed disagreement between stage i's outlet and stage i+1's
    /// inlet [mK].
    pub consistency_tolerance_mk: Real,
}

/// Power result for one stage of one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub index: usize,
    pub name: String,
    pub inlet_k: Option<Real>,
    pub outlet_k: Option<Real>,
    pub delta_t_k: Option<Real>,
    pub power_w: Option<Real>,
    /// Measured disagreement with the upstream stage's outlet [mK],
    /// when both readings exist.
    pub consistency_error_mk: Option<Real>,
    pub valid: bool,
}

/// One cycle's published record.
#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    pub sequence: u64,
    /// RFC 3339 wall-clock stamp taken at computation time.
    pub wall_time: String,
    pub flow_l_per_s: Real,
    pub stages: Vec<StageResult>,
    /// Sum of power over valid stages.
    pub cumulative_power_w: Real,
    /// True when no series-consistency violation occurred this cycle.
    pub consistent: bool,
    /// Flat indices of channels whose conversion failed this cycle.
    pub invalid_channels: Vec<u16>,
}

/// Computes stage powers and the series-consistency verdict.
#[derive(Debug, Clone)]
pub struct HeatBalanceEngine {
    config: EngineConfig,
}

impl HeatBalanceEngine {
    pub fn new(config: EngineConfig) -> PipelineResult<Self> {
        config.flow.validate()?;
        config
            .coolant
            .validate()
            .map_err(|_| PipelineError::InvalidSetup {
                what: "coolant model rejected its parameters",
            })?;
        if !(config.consistency_tolerance_mk.is_finite() && config.consistency_tolerance_mk > 0.0)
        {
            return Err(PipelineError::InvalidSetup {
                what: "consistency tolerance must be positive",
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute one cycle's result from routed, smoothed temperatures.
    pub fn compute(
        &self,
        sequence: u64,
        positions: &[StagePosition],
        temps: &[StageTemperatures],
        flow_l_per_s: Real,
        invalid_channels: Vec<u16>,
    ) -> CycleResult {
        debug_assert_eq!(positions.len(), temps.len());

        let mut stages: Vec<StageResult> = positions
            .iter()
            .zip(temps)
            .map(|(pos, st)| self.stage_power(pos, st, flow_l_per_s))
            .collect();

        // Series-consistency pass: compare each stage's inlet with the
        // upstream outlet. The downstream reading is the suspect one
        // relative to the already-checked upstream chain.
        let mut violations = 0_u32;
        for i in 1..stages.len() {
            let (upstream, downstream) = stages.split_at_mut(i);
            let prev = &upstream[i - 1];
            let this = &mut downstream[0];
            if let (Some(prev_out), Some(this_in)) = (prev.outlet_k, this.inlet_k) {
                let error_mk = (this_in - prev_out).abs() * 1e3;
                this.consistency_error_mk = Some(error_mk);
                if error_mk > self.config.consistency_tolerance_mk {
                    warn!(
                        stage = this.index,
                        error_mk, "series consistency violation"
                    );
                    this.valid = false;
                    violations += 1;
                }
            }
        }

        let cumulative_power_w = stages
            .iter()
            .filter(|s| s.valid)
            .filter_map(|s| s.power_w)
            .sum();

        CycleResult {
            sequence,
            wall_time: chrono::Utc::now().to_rfc3339(),
            flow_l_per_s,
            stages,
            cumulative_power_w,
            consistent: violations == 0,
            invalid_channels,
        }
    }

    fn stage_power(
        &self,
        pos: &StagePosition,
        st: &StageTemperatures,
        flow_l_per_s: Real,
    ) -> StageResult {
        let mut result = StageResult {
            index: pos.index,
            name: pos.name.clone(),
            inlet_k: st.inlet.map(|s| s.kelvin),
            outlet_k: st.outlet.map(|s| s.kelvin),
            delta_t_k: None,
            power_w: None,
            consistency_error_mk: None,
            valid: false,
        };

        let (Some(inlet), Some(outlet)) = (result.inlet_k, result.outlet_k) else {
            return result;
        };

        // The delta is taken before any property scaling so the
        // millikelvin signal is never folded into a large intermediate.
        let delta_t = outlet - inlet;
        let mean = k(0.5 * (inlet + outlet));

        let properties = self
            .config
            .coolant
            .cp(mean)
            .and_then(|cp| self.config.coolant.density(mean).map(|rho| (cp, rho)));
        let (cp, rho) = match properties {
            Ok(pair) => pair,
            Err(err) => {
                warn!(stage = pos.index, %err, "coolant property lookup failed");
                return result;
            }
        };

        let mdot_kg_per_s = flow_l_per_s * rho;
        result.delta_t_k = Some(delta_t);
        result.power_w = Some(mdot_kg_per_s * cp * delta_t);
        result.valid = true;
        result
    }
}
