//! Tabulated coolant property data.
//!
//! Sources:
//! - Water heat capacity: handbook values for liquid water, 0..100 °C.
//! - Water density: Bettin, H., "Die Dichte des Wassers als Funktion der
//!   Temperatur nach Einführung der Internationalen Temperaturskala von
//!   1990", PTB Mitteilungen 100(3), 1990.
//! - Glycol/water 60 % by volume: BASF "GLYSANTIN Graphs", September 2016.

use cf_core::{Real, polyval};

/// Piecewise-linear interpolation over a sorted abscissa table.
///
/// Values outside the table range clamp to the endpoint values; the
/// operating range of the calorimeter is enforced upstream by the sensor
/// valid-range check, not here.
pub fn interp(xs: &[Real], ys: &[Real], x: Real) -> Real {
    debug_assert_eq!(xs.len(), ys.len());
    debug_assert!(!xs.is_empty());

    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    // xs is sorted, x is interior
    let hi = xs.partition_point(|&v| v < x).max(1);
    let lo = hi - 1;
    let frac = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + frac * (ys[hi] - ys[lo])
}

/// Specific heat capacity of liquid water [J/(kg·K)], 0..100 °C.
pub fn c_th_water(theta_c: Real) -> Real {
    const T: [Real; 11] = [
        0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0,
    ];
    const C: [Real; 11] = [
        4217.7, 4192.2, 4181.9, 4178.5, 4178.6, 4180.7, 4184.4, 4189.6, 4196.4, 4205.1, 4216.0,
    ];
    interp(&T, &C, theta_c)
}

/// Density of liquid water [kg/L] on the ITS-90 scale.
///
/// Rational polynomial fit, valid for 0..100 °C.
pub fn rho_water(theta_c: Real) -> Real {
    // Numerator and denominator coefficients, constant term first.
    const NUM: [Real; 6] = [
        9.9983952e2,
        1.6952577e1,
        -7.9905127e-3,
        -4.6241757e-5,
        1.0584601e-7,
        -2.8103006e-10,
    ];
    const DENOM: [Real; 2] = [1000.0, 1.68872e1];
    polyval(&NUM, theta_c) / polyval(&DENOM, theta_c)
}

/// Specific heat capacity of 60 % by volume ethylene glycol/water
/// [J/(kg·K)], -40..105 °C.
pub fn c_th_glycol60(theta_c: Real) -> Real {
    const T: [Real; 30] = [
        -40.0, -35.0, -30.0, -25.0, -20.0, -15.0, -10.0, -5.0, 0.0, 5.0, 10.0, 15.0, 20.0, 25.0,
        30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0, 80.0, 85.0, 90.0, 95.0, 100.0,
        105.0,
    ];
    const C: [Real; 30] = [
        2703.30, 2749.60, 2793.74, 2838.47, 2879.21, 2919.42, 2955.72, 2992.30, 3026.66, 3059.85,
        3092.32, 3122.75, 3152.32, 3181.33, 3208.28, 3234.92, 3259.96, 3285.54, 3309.36, 3331.49,
        3354.35, 3375.35, 3396.78, 3415.90, 3435.59, 3454.44, 3471.16, 3487.49, 3503.92, 3517.87,
    ];
    interp(&T, &C, theta_c)
}

/// Density of 60 % by volume ethylene glycol/water [kg/L], -40..110 °C.
pub fn rho_glycol60(theta_c: Real) -> Real {
    const T: [Real; 16] = [
        -40.0, -30.0, -20.0, -10.0, 0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0,
        100.0, 110.0,
    ];
    const R: [Real; 16] = [
        1.120010, 1.114359, 1.108554, 1.102760, 1.096879, 1.090945, 1.085007, 1.078812, 1.072367,
        1.065847, 1.059047, 1.051983, 1.044773, 1.037459, 1.030002, 1.022522,
    ];
    interp(&T, &R, theta_c)
}
