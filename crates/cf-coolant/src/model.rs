//! Coolant property model trait and the built-in models.

use cf_core::units::Temperature;
use serde::{Deserialize, Serialize};
use uom::si::thermodynamic_temperature::degree_celsius;

use crate::error::{CoolantError, CoolantResult};
use crate::tables;

/// Specific heat capacity at constant pressure [J/(kg·K)].
pub type SpecHeatCapacity = f64;

/// Density [kg/L].
///
/// Kilograms per liter (== g/cm³) so that a volumetric flow reading in
/// liters converts to a mass rate by a single multiplication.
pub type Density = f64;

/// Trait for coolant property models.
///
/// Implementations must be thread-safe (Send + Sync); the pipeline
/// coordinator owns one instance for the lifetime of the acquisition loop.
pub trait CoolantModel: Send + Sync {
    /// Model name (for logging and result records).
    fn name(&self) -> &str;

    /// Specific heat capacity [J/(kg·K)] at the given temperature.
    fn cp(&self, t: Temperature) -> CoolantResult<SpecHeatCapacity>;

    /// Density [kg/L] at the given temperature.
    fn density(&self, t: Temperature) -> CoolantResult<Density>;
}

/// Configuration-selectable coolant model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Coolant {
    /// Fixed properties, independent of temperature.
    ///
    /// The default for narrow quasi-isothermal operation, where property
    /// variation over the loop is below the power resolution anyway.
    Constant {
        cp_j_per_kg_k: SpecHeatCapacity,
        density_kg_per_l: Density,
    },
    /// Liquid water, tabulated 0..100 °C.
    Water,
    /// 60 % by volume ethylene glycol/water mixture, tabulated -40..105 °C.
    Glycol60,
}

impl Default for Coolant {
    fn default() -> Self {
        Coolant::Constant {
            cp_j_per_kg_k: 4186.0,
            density_kg_per_l: 1.0,
        }
    }
}

impl Coolant {
    /// Check that fixed properties are physical. Tabulated models carry
    /// their own vetted data and always pass.
    pub fn validate(&self) -> CoolantResult<()> {
        if let Coolant::Constant {
            cp_j_per_kg_k,
            density_kg_per_l,
        } = self
        {
            if !cp_j_per_kg_k.is_finite() || *cp_j_per_kg_k <= 0.0 {
                return Err(CoolantError::NonPhysical {
                    what: "constant heat capacity",
                });
            }
            if !density_kg_per_l.is_finite() || *density_kg_per_l <= 0.0 {
                return Err(CoolantError::NonPhysical {
                    what: "constant density",
                });
            }
        }
        Ok(())
    }
}

impl CoolantModel for Coolant {
    fn name(&self) -> &str {
        match self {
            Coolant::Constant { .. } => "constant",
            Coolant::Water => "water",
            Coolant::Glycol60 => "glycol60",
        }
    }

    fn cp(&self, t: Temperature) -> CoolantResult<SpecHeatCapacity> {
        match self {
            Coolant::Constant { cp_j_per_kg_k, .. } => Ok(*cp_j_per_kg_k),
            Coolant::Water => Ok(tables::c_th_water(t.get::<degree_celsius>())),
            Coolant::Glycol60 => Ok(tables::c_th_glycol60(t.get::<degree_celsius>())),
        }
    }

    fn density(&self, t: Temperature) -> CoolantResult<Density> {
        match self {
            Coolant::Constant {
                density_kg_per_l, ..
            } => Ok(*density_kg_per_l),
            Coolant::Water => Ok(tables::rho_water(t.get::<degree_celsius>())),
            Coolant::Glycol60 => Ok(tables::rho_glycol60(t.get::<degree_celsius>())),
        }
    }
}
