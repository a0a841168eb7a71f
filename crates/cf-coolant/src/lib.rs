//! cf-coolant: coolant property models for the heat balance computation.
//!
//! Thermal power is `mdot * cp * deltaT`; both the specific heat capacity
//! and the density used to turn a volumetric flow reading into a mass rate
//! depend (weakly) on the coolant temperature. This crate provides those
//! properties behind a small trait, with a constant-property model and
//! tabulated models for liquid water and a 60 % by volume ethylene
//! glycol/water mixture.

pub mod error;
pub mod model;
pub mod tables;

pub use error::{CoolantError, CoolantResult};
pub use model::{Coolant, CoolantModel, Density, SpecHeatCapacity};
