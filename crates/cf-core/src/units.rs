// cf-core/src/units.rs

use uom::si::f64::{
    ElectricPotential as UomElectricPotential, ElectricalResistance as UomElectricalResistance,
    Frequency as UomFrequency, MassRate as UomMassRate, Power as UomPower, Ratio as UomRatio,
    TemperatureInterval as UomTemperatureInterval,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
    VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Frequency = UomFrequency;
pub type MassRate = UomMassRate;
pub type Power = UomPower;
pub type Ratio = UomRatio;
pub type Resistance = UomElectricalResistance;
pub type TempInterval = UomTemperatureInterval;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;
pub type Voltage = UomElectricPotential;
pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn celsius(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

#[inline]
pub fn dk(v: f64) -> TempInterval {
    use uom::si::temperature_interval::kelvin;
    TempInterval::new::<kelvin>(v)
}

#[inline]
pub fn millikelvin(v: f64) -> TempInterval {
    use uom::si::temperature_interval::millikelvin;
    TempInterval::new::<millikelvin>(v)
}

#[inline]
pub fn w(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v)
}

#[inline]
pub fn lpm(v: f64) -> VolumeRate {
    use uom::si::volume_rate::liter_per_minute;
    VolumeRate::new::<liter_per_minute>(v)
}

#[inline]
pub fn volt(v: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(v)
}

#[inline]
pub fn ohm(v: f64) -> Resistance {
    use uom::si::electrical_resistance::ohm;
    Resistance::new::<ohm>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn hz(v: f64) -> Frequency {
    use uom::si::frequency::hertz;
    Frequency::new::<hertz>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

pub mod constants {
    /// Celsius zero point on the kelvin scale.
    pub const T0_CELSIUS_K: f64 = 273.15;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uom::si::power::watt;
    use uom::si::thermodynamic_temperature::kelvin;
    use uom::si::volume_rate::liter_per_second;

    #[test]
    fn constructors_smoke() {
        let _t = k(293.15);
        let _dt = millikelvin(50.0);
        let _p = w(1.744);
        let _mdot = kgps(0.008);
        let _q = lpm(0.5);
        let _u = volt(2.5);
        let _r = ohm(1000.0);
        let _f = hz(10.0);
        let _x = unitless(9.09);
    }

    #[test]
    fn celsius_kelvin_offset() {
        let t = celsius(20.0);
        assert!((t.get::<kelvin>() - 293.15).abs() < 1e-9);
    }

    #[test]
    fn volume_rate_conversion() {
        let q = lpm(0.5);
        assert!((q.get::<liter_per_second>() - 0.5 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn power_identity() {
        assert_eq!(w(2.0).get::<watt>(), 2.0);
    }
}
