//! Deflection-bridge arithmetic.
//!
//! Bridge layout, one active arm:
//!
//! ```text
//!   excitation
//!    ___|___
//!    |     |
//!   r_s   r_ref_hi     n_ref = r_ref_hi / r_ref_lo
//!    |-v_d>|..u_ref
//!   r_x   r_ref_lo
//!    |_____|
//!       |
//!       0 V
//! ```
//!
//! The reference divider pins its midpoint at
//! `u_ref = excitation / (1 + n_ref)`; the converter reads the
//! differential `v_d` between the sensor node and that midpoint. The
//! measurement is ratiometric in the arm resistances, so excitation drift
//! cancels to first order.

use cf_core::Real;

/// Sensor-arm resistance from the deflection voltage.
///
/// Returns `None` when the implied sensor-node voltage leaves the open
/// interval (0, excitation): an open sensor rails the node high, a short
/// pulls it to ground, and neither solves to a finite positive resistance.
pub fn resistance(v_d: Real, excitation_v: Real, n_ref: Real, r_series: Real) -> Option<Real> {
    let u_ref = excitation_v / (1.0 + n_ref);
    let u_x = u_ref + v_d;
    if u_x <= 0.0 || u_x >= excitation_v {
        return None;
    }
    let r = r_series * u_x / (excitation_v - u_x);
    r.is_finite().then_some(r)
}

/// Deflection voltage a given sensor resistance would produce.
///
/// Inverse of [`resistance`]; used to engineer synthetic readings.
pub fn deflection(r_x: Real, excitation_v: Real, n_ref: Real, r_series: Real) -> Real {
    let u_ref = excitation_v / (1.0 + n_ref);
    let u_x = excitation_v * r_x / (r_x + r_series);
    u_x - u_ref
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXC: Real = 5.0;
    const N_REF: Real = 9.0918;
    const R_S: Real = 9962.0;

    #[test]
    fn balanced_bridge_solves_to_divider_ratio() {
        // Zero deflection means the sensor arm mirrors the reference arm.
        let r = resistance(0.0, EXC, N_REF, R_S).unwrap();
        assert!((r - R_S / N_REF).abs() < 1e-9);
    }

    #[test]
    fn round_trip_through_deflection() {
        for r_x in [900.0, 1000.0, 1077.9, 1200.0] {
            let v_d = deflection(r_x, EXC, N_REF, R_S);
            let back = resistance(v_d, EXC, N_REF, R_S).unwrap();
            assert!((back - r_x).abs() < 1e-9, "r_x = {r_x}, back = {back}");
        }
    }

    #[test]
    fn railed_node_is_rejected() {
        // Open sensor: node at excitation.
        let u_ref = EXC / (1.0 + N_REF);
        assert!(resistance(EXC - u_ref, EXC, N_REF, R_S).is_none());
        // Shorted sensor: node at ground.
        assert!(resistance(-u_ref, EXC, N_REF, R_S).is_none());
        // Just inside the rails still solves.
        assert!(resistance(-u_ref + 1e-6, EXC, N_REF, R_S).is_some());
    }

    #[test]
    fn deflection_increases_with_resistance() {
        let v1 = deflection(1000.0, EXC, N_REF, R_S);
        let v2 = deflection(1001.0, EXC, N_REF, R_S);
        assert!(v2 > v1);
    }
}
