//! Pressure/depth physics and display-unit conversion.

use crate::models::{Cylinder, Dive, GasMix};
use crate::preferences::UnitSystem;

/// Standard atmosphere in millibar.
pub const SURFACE_PRESSURE_MBAR: i32 = 1013;

/// Sea water density in g/10l.
pub const SEAWATER_SALINITY: u32 = 10300;

/// Anything shallower than this counts as being at the surface.
pub const SURFACE_THRESHOLD_MM: i32 = 750;

// Virial coefficients for the compressibility factor, fitted for 0..500 bar.
const O2_COEFFICIENTS: [f64; 3] = [-7.18092073703e-04, 2.81852572808e-06, -1.50290620492e-09];
const N2_COEFFICIENTS: [f64; 3] = [-2.19260353292e-04, 2.92844845532e-06, -2.07613482075e-09];
const HE_COEFFICIENTS: [f64; 3] = [4.87320026468e-04, -8.83632921053e-08, 5.33304543646e-11];

pub fn surface_pressure_mbar(dive: &Dive) -> i32 {
    if dive.surface_pressure_mbar != 0 {
        dive.surface_pressure_mbar as i32
    } else {
        SURFACE_PRESSURE_MBAR
    }
}

/// Water weight in mbar per mm of depth.
fn specific_weight(dive: &Dive) -> f64 {
    let salinity = if dive.salinity != 0 {
        dive.salinity
    } else {
        SEAWATER_SALINITY
    };
    salinity as f64 / 10000.0 * 0.981 / 10.0
}

/// Absolute ambient pressure at `depth_mm`.
pub fn depth_to_mbar(depth_mm: i32, dive: &Dive) -> i32 {
    surface_pressure_mbar(dive) + (depth_mm as f64 * specific_weight(dive)).round() as i32
}

/// Depth of a water column exerting `mbar` above the surface.
pub fn rel_mbar_to_depth(mbar: i32, dive: &Dive) -> i32 {
    (mbar as f64 / specific_weight(dive)).round() as i32
}

pub fn mbar_to_atm(mbar: i32) -> f64 {
    mbar as f64 / SURFACE_PRESSURE_MBAR as f64
}

fn virial(coefficients: &[f64; 3], x: f64) -> f64 {
    coefficients[0] * x + coefficients[1] * x * x + coefficients[2] * x * x * x
}

/// Real-gas compressibility factor Z of `gas` at `bar`.
pub fn gas_compressibility_factor(gas: &GasMix, bar: f64) -> f64 {
    let o2 = gas.o2_fraction();
    let he = gas.he_fraction();
    let n2 = 1.0 - o2 - he;
    1.0 + o2 * virial(&O2_COEFFICIENTS, bar)
        + he * virial(&HE_COEFFICIENTS, bar)
        + n2 * virial(&N2_COEFFICIENTS, bar)
}

/// Free gas volume (ml at surface) contained in `cyl` at `mbar`.
pub fn gas_volume(cyl: &Cylinder, mbar: i32) -> i64 {
    let bar = mbar as f64 / 1000.0;
    let z = gas_compressibility_factor(&cyl.gasmix, bar);
    (cyl.size_ml as f64 * mbar_to_atm(mbar) / z).round() as i64
}

pub fn depth_units(mm: i32, units: UnitSystem) -> (f64, &'static str) {
    match units {
        UnitSystem::Metric => (mm as f64 / 1000.0, "m"),
        UnitSystem::Imperial => (mm as f64 / 304.8, "ft"),
    }
}

pub fn pressure_units(mbar: i32, units: UnitSystem) -> (i32, &'static str) {
    match units {
        UnitSystem::Metric => ((mbar as f64 / 1000.0).round() as i32, "bar"),
        UnitSystem::Imperial => ((mbar as f64 * 0.0145037738).round() as i32, "psi"),
    }
}

pub fn temperature_units(mkelvin: u32, units: UnitSystem) -> (f64, &'static str) {
    let celsius = (mkelvin as f64 - 273_150.0) / 1000.0;
    match units {
        UnitSystem::Metric => (celsius, "°C"),
        UnitSystem::Imperial => (celsius * 1.8 + 32.0, "°F"),
    }
}

/// Vertical speed given in mm/s, shown per minute.
pub fn vertical_speed_units(mm_per_sec: i32, units: UnitSystem) -> (f64, &'static str) {
    let mm_per_min = mm_per_sec as f64 * 60.0;
    match units {
        UnitSystem::Metric => (mm_per_min / 1000.0, "m/min"),
        UnitSystem::Imperial => (mm_per_min / 304.8, "ft/min"),
    }
}
