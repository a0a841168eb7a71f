//! cf-pipeline: the acquisition/compute loop.
//!
//! One strictly cycle-serial pipeline: sample both converters, convert
//! every channel to a temperature, reorder channels into the configured
//! series coolant path, smooth per channel, compute per-stage and
//! cumulative thermal power, and publish the result into a bounded
//! drop-oldest bus. A slow consumer loses old results; it never stalls
//! acquisition.

pub mod bus;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod filter;
pub mod health;
pub mod topology;

pub use bus::ResultBus;
pub use coordinator::{Coordinator, PipelineConfig, PipelineHandle, spawn};
pub use engine::{CycleResult, EngineConfig, FlowSetting, HeatBalanceEngine, StageResult};
pub use error::{PipelineError, PipelineResult};
pub use filter::{FilterBank, FilterMode};
pub use health::{HealthSnapshot, PipelineHealth};
pub use topology::{ChannelReading, RouterError, StagePosition, StageTemperatures};
