//! Platinum RTD characteristic equation.
//!
//! Inversion of the Callendar–Van Dusen polynomial per IEC 60751 /
//! ITS-90. The quadratic inversion is exact for temperatures at or above
//! 0 °C; below zero the standard adds a fourth-order term in the forward
//! direction, which is handled here with a fifth-order polynomial fit of
//! the deviation between the numerically inverted full equation and the
//! plain quadratic solution.

use cf_core::{Real, polyval};

/// IEC 60751 coefficient A [1/°C].
pub const PT_A: Real = 3.9083e-3;

/// IEC 60751 coefficient B [1/°C²].
pub const PT_B: Real = -5.775e-7;

/// Deviation of the inverted full sub-zero equation from the quadratic
/// solution, as a polynomial in the normalized resistance. Constant term
/// first.
const SUB_ZERO_CORRECTION: [Real; 6] = [
    4.84112370e+00,
    -1.61875985e+01,
    1.80282972e+01,
    -5.34227299e+00,
    -2.85842067e+00,
    1.51892983e+00,
];

/// Temperature [°C] from normalized resistance `r_norm = r / r0`.
pub fn temperature_c(r_norm: Real) -> Real {
    let theta = (-PT_A + (PT_A * PT_A - 4.0 * PT_B * (1.0 - r_norm)).sqrt()) / (2.0 * PT_B);
    if r_norm < 1.0 {
        theta + polyval(&SUB_ZERO_CORRECTION, r_norm)
    } else {
        theta
    }
}

/// Normalized resistance `r / r0` at a temperature [°C] >= 0.
///
/// The forward quadratic, used to engineer synthetic readings and to
/// verify calibrations; sub-zero synthesis is not needed because the
/// coolant loop operates near ambient.
pub fn resistance_norm(theta_c: Real) -> Real {
    1.0 + PT_A * theta_c + PT_B * theta_c * theta_c
}
