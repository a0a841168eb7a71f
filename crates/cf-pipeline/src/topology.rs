//! Series coolant topology and channel routing.
//!
//! The coolant path is an explicit ordered sequence with index-based
//! adjacency, not a linked structure: stage i's outlet sensor is stage
//! i+1's inlet sensor. Configuration validation enforces that shape up
//! front; the router re-asserts it at runtime and refuses to compute over
//! a sample set that does not match.

use cf_core::ChannelId;
use cf_sense::TemperatureSample;
use thiserror::Error;

/// One heat source's slot in the series coolant path.
#[derive(Debug, Clone, PartialEq)]
pub struct StagePosition {
    /// Position in the series chain, 0-based, contiguous.
    pub index: usize,
    /// Operator-facing name ("Heat Source 1").
    pub name: String,
    /// Sensor upstream of the device under test.
    pub inlet: ChannelId,
    /// Sensor downstream of the device under test.
    pub outlet: ChannelId,
}

/// Routing and topology errors. All of these abort the cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    /// A configured channel is absent from the cycle's sample set.
    #[error("topology mismatch: channel {channel} missing from sample set")]
    TopologyMismatch { channel: ChannelId },

    /// Stage outlets and inlets do not chain.
    #[error("series chain broken between stage {upstream} and stage {downstream}")]
    BrokenChain { upstream: usize, downstream: usize },

    /// A stage measures nothing (inlet == outlet).
    #[error("stage {index} uses one sensor for both inlet and outlet")]
    DegenerateStage { index: usize },

    /// Stage indices are not 0..n in order.
    #[error("stage indices are not contiguous at position {position}")]
    NonContiguousIndex { position: usize },

    #[error("no stages configured")]
    EmptyTopology,
}

/// Check the series-chain invariants on a configured topology.
pub fn validate_chain(stages: &[StagePosition]) -> Result<(), RouterError> {
    if stages.is_empty() {
        return Err(RouterError::EmptyTopology);
    }
    for (position, stage) in stages.iter().enumerate() {
        if stage.index != position {
            return Err(RouterError::NonContiguousIndex { position });
        }
        if stage.inlet == stage.outlet {
            return Err(RouterError::DegenerateStage { index: stage.index });
        }
    }
    for pair in stages.windows(2) {
        if pair[0].outlet != pair[1].inlet {
            return Err(RouterError::BrokenChain {
                upstream: pair[0].index,
                downstream: pair[1].index,
            });
        }
    }
    Ok(())
}

/// One channel's contribution to a cycle: `None` when conversion marked
/// the channel invalid, but the channel was still sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReading {
    pub channel: ChannelId,
    pub sample: Option<TemperatureSample>,
}

/// A stage's inlet/outlet readings for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTemperatures {
    pub index: usize,
    pub inlet: Option<TemperatureSample>,
    pub outlet: Option<TemperatureSample>,
}

/// Map the cycle's channel readings onto the series topology.
///
/// Pure lookup, no computation. A channel that was never sampled is a
/// [`RouterError::TopologyMismatch`] and invalidates the whole cycle,
/// matching the all-or-nothing acquisition policy; a channel that was
/// sampled but failed conversion flows through as `None`.
pub fn route(
    readings: &[ChannelReading],
    stages: &[StagePosition],
) -> Result<Vec<StageTemperatures>, RouterError> {
    validate_chain(stages)?;

    let lookup = |channel: ChannelId| -> Result<Option<TemperatureSample>, RouterError> {
        readings
            .iter()
            .find(|r| r.channel == channel)
            .map(|r| r.sample)
            .ok_or(RouterError::TopologyMismatch { channel })
    };

    stages
        .iter()
        .map(|stage| {
            Ok(StageTemperatures {
                index: stage.index,
                inlet: lookup(stage.inlet)?,
                outlet: lookup(stage.outlet)?,
            })
        })
        .collect()
}
