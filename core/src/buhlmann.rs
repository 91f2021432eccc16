//! Bühlmann ZHL-16C tissue simulation with gradient factors.
//!
//! Implements a full 16-compartment tissue model using the Schreiner equation
//! to simulate inert gas loading one segment at a time. After each segment the
//! model reports the tissue tolerance: the lowest ambient pressure (bar) the
//! leading compartment tolerates under the configured gradient factors.

use crate::deco::{deco_allowed_depth, TissueModel};
use crate::models::{Dive, GasMix};
use crate::plot_data::NUM_COMPARTMENTS;

// ============================================================================
// Physical Constants
// ============================================================================

/// Water vapour pressure in the lungs (bar), at 37°C.
const P_WATER_VAPOR: f64 = 0.0627;

/// Fraction of N2 in air.
const AIR_FN2: f64 = 0.7902;

/// Fixed-point iterations when solving the depth-dependent gradient factor.
const GF_ITERATIONS: usize = 4;

// ============================================================================
// ZHL-16C Compartment Constants (Bühlmann / Baker)
// ============================================================================

/// N2 half-times in minutes for compartments 1–16 (ZHL-16C).
pub const N2_HALF_TIMES: [f64; NUM_COMPARTMENTS] = [
    5.0, 8.0, 12.5, 18.5, 27.0, 38.3, 54.3, 77.0, 109.0, 146.0, 187.0, 239.0, 305.0, 390.0, 498.0,
    635.0,
];

/// He half-times in minutes for compartments 1–16 (ZHL-16C).
const HE_HALF_TIMES: [f64; NUM_COMPARTMENTS] = [
    1.88, 3.02, 4.72, 6.99, 10.21, 14.48, 20.53, 29.11, 41.20, 55.19, 70.69, 90.34, 115.29, 147.42,
    188.24, 240.03,
];

/// N2 'a' coefficients (bar) for ZHL-16C.
const A_N2: [f64; NUM_COMPARTMENTS] = [
    1.1696, 1.0000, 0.8618, 0.7562, 0.6200, 0.5043, 0.4410, 0.4000, 0.3750, 0.3500, 0.3295, 0.3065,
    0.2835, 0.2610, 0.2480, 0.2327,
];

/// N2 'b' coefficients (dimensionless) for ZHL-16C.
const B_N2: [f64; NUM_COMPARTMENTS] = [
    0.5578, 0.6514, 0.7222, 0.7825, 0.8126, 0.8434, 0.8693, 0.8910, 0.9092, 0.9222, 0.9319, 0.9403,
    0.9477, 0.9544, 0.9602, 0.9653,
];

/// He 'a' coefficients (bar) for ZHL-16C.
const A_HE: [f64; NUM_COMPARTMENTS] = [
    1.6189, 1.3830, 1.1919, 1.0458, 0.9220, 0.8205, 0.7305, 0.6502, 0.5950, 0.5545, 0.5333, 0.5189,
    0.5181, 0.5176, 0.5172, 0.5119,
];

/// He 'b' coefficients (dimensionless) for ZHL-16C.
const B_HE: [f64; NUM_COMPARTMENTS] = [
    0.4770, 0.5747, 0.6527, 0.7223, 0.7582, 0.7957, 0.8279, 0.8553, 0.8757, 0.8903, 0.8997, 0.9073,
    0.9122, 0.9171, 0.9217, 0.9267,
];

// ============================================================================
// Tissue State
// ============================================================================

/// State of the 16 tissue compartments.
#[derive(Debug, Clone, PartialEq)]
struct TissueState {
    /// N2 partial pressure in each compartment (bar).
    p_n2: [f64; NUM_COMPARTMENTS],
    /// He partial pressure in each compartment (bar).
    p_he: [f64; NUM_COMPARTMENTS],
}

impl TissueState {
    /// Initialise tissues at surface equilibrium (breathing air).
    fn surface_equilibrium(surface_pressure: f64) -> Self {
        let p_n2_surface = (surface_pressure - P_WATER_VAPOR) * AIR_FN2;
        TissueState {
            p_n2: [p_n2_surface; NUM_COMPARTMENTS],
            p_he: [0.0; NUM_COMPARTMENTS],
        }
    }

    /// Update all compartments for a time interval using the Schreiner equation.
    ///
    /// `dt_sec`: exposure time in seconds.
    /// `p_inspired_n2`: inspired N2 partial pressure (bar).
    /// `p_inspired_he`: inspired He partial pressure (bar).
    fn update(&mut self, dt_sec: f64, p_inspired_n2: f64, p_inspired_he: f64) {
        if dt_sec <= 0.0 {
            return;
        }
        for i in 0..NUM_COMPARTMENTS {
            // N2
            let k_n2 = (2.0_f64.ln()) / (N2_HALF_TIMES[i] * 60.0);
            self.p_n2[i] = p_inspired_n2 + (self.p_n2[i] - p_inspired_n2) * (-k_n2 * dt_sec).exp();

            // He
            let k_he = (2.0_f64.ln()) / (HE_HALF_TIMES[i] * 60.0);
            self.p_he[i] = p_inspired_he + (self.p_he[i] - p_inspired_he) * (-k_he * dt_sec).exp();
        }
    }

    /// Loading-weighted Bühlmann coefficients (Workman/Baker) and total inert
    /// pressure of compartment `i`.
    fn coefficients(&self, i: usize) -> (f64, f64, f64) {
        let p_total = self.p_n2[i] + self.p_he[i];
        if p_total > 1e-10 {
            let a = (A_N2[i] * self.p_n2[i] + A_HE[i] * self.p_he[i]) / p_total;
            let b = (B_N2[i] * self.p_n2[i] + B_HE[i] * self.p_he[i]) / p_total;
            (a, b, p_total)
        } else {
            (A_N2[i], B_N2[i], p_total)
        }
    }
}

/// Inspired (N2, He) partial pressures in bar. A non-zero `ccpo2_mbar`
/// means a rebreather loop held at that oxygen setpoint.
fn inspired_pressures(ambient_bar: f64, gas: &GasMix, ccpo2_mbar: i32) -> (f64, f64) {
    let fhe = gas.he_fraction();
    let fn2 = gas.n2() as f64 / 1000.0;

    if ccpo2_mbar > 0 {
        let po2 = (ccpo2_mbar as f64 / 1000.0).min(ambient_bar);
        let inert = (ambient_bar - po2 - P_WATER_VAPOR).max(0.0);
        let inert_fraction = fn2 + fhe;
        if inert_fraction <= 0.0 {
            return (0.0, 0.0);
        }
        let he_ratio = fhe / inert_fraction;
        return (inert * (1.0 - he_ratio), inert * he_ratio);
    }

    let alveolar = (ambient_bar - P_WATER_VAPOR).max(0.0);
    (alveolar * fn2, alveolar * fhe)
}

// ============================================================================
// Public API
// ============================================================================

/// Saved model state, produced by [`TissueModel::checkpoint`] and consumed by
/// [`TissueModel::restore`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuhlmannSnapshot {
    tissues: TissueState,
    gf_low_pressure_bar: f64,
    tolerated: [f64; NUM_COMPARTMENTS],
    tolerance: f64,
}

/// ZHL-16C with gradient factors interpolated between `gf_low` at the deepest
/// pressure seen so far and `gf_high` at the surface.
#[derive(Debug, Clone)]
pub struct Buhlmann {
    tissues: TissueState,
    gf_low: f64,
    gf_high: f64,
    last_deco_stop_mm: i32,
    surface_bar: f64,
    /// Deepest ambient pressure so far; anchors `gf_low`.
    gf_low_pressure_bar: f64,
    tolerated: [f64; NUM_COMPARTMENTS],
    tolerance: f64,
}

impl Buhlmann {
    pub fn new(gf_low: f64, gf_high: f64, last_deco_stop_mm: i32) -> Self {
        let surface_bar = 1.013;
        Self {
            tissues: TissueState::surface_equilibrium(surface_bar),
            gf_low,
            gf_high,
            last_deco_stop_mm,
            surface_bar,
            gf_low_pressure_bar: surface_bar,
            tolerated: [0.0; NUM_COMPARTMENTS],
            tolerance: 0.0,
        }
    }

    /// Gradient factor in effect at ambient pressure `p`.
    fn gradient_factor(&self, p: f64) -> f64 {
        if p <= self.surface_bar || self.gf_low_pressure_bar <= self.surface_bar {
            return self.gf_high;
        }
        if p >= self.gf_low_pressure_bar {
            return self.gf_low;
        }
        let slope = (self.gf_low - self.gf_high) / (self.gf_low_pressure_bar - self.surface_bar);
        self.gf_high + slope * (p - self.surface_bar)
    }

    /// Lowest ambient pressure compartment `i` tolerates.
    fn compartment_tolerance(&self, i: usize) -> f64 {
        let (a, b, p_total) = self.tissues.coefficients(i);
        let tolerated = |gf: f64| (p_total - gf * a) / (gf / b + 1.0 - gf);

        let mut p = tolerated(self.gf_low);
        for _ in 0..GF_ITERATIONS {
            p = tolerated(self.gradient_factor(p));
        }
        p
    }

    fn update_tolerance(&mut self) -> f64 {
        let mut max = 0.0_f64;
        for i in 0..NUM_COMPARTMENTS {
            let p = self.compartment_tolerance(i);
            self.tolerated[i] = p;
            max = max.max(p);
        }
        self.tolerance = max;
        max
    }
}

impl TissueModel for Buhlmann {
    type Snapshot = BuhlmannSnapshot;

    fn reset(&mut self, surface_bar: f64) {
        self.surface_bar = surface_bar;
        self.gf_low_pressure_bar = surface_bar;
        self.tissues = TissueState::surface_equilibrium(surface_bar);
        self.update_tolerance();
    }

    fn add_segment(
        &mut self,
        ambient_bar: f64,
        gas: &GasMix,
        duration_sec: i32,
        ccpo2_mbar: i32,
    ) -> f64 {
        let (p_n2, p_he) = inspired_pressures(ambient_bar, gas, ccpo2_mbar);
        self.tissues.update(duration_sec as f64, p_n2, p_he);
        if ambient_bar > self.gf_low_pressure_bar {
            self.gf_low_pressure_bar = ambient_bar;
        }
        self.update_tolerance()
    }

    fn allowed_ceiling_mm(&self, tolerance: f64, surface_bar: f64, dive: &Dive, smooth: bool) -> i32 {
        deco_allowed_depth(tolerance, surface_bar, dive, smooth, self.last_deco_stop_mm)
    }

    fn compartment_tolerances(&self) -> [f64; NUM_COMPARTMENTS] {
        self.tolerated
    }

    fn checkpoint(&self) -> BuhlmannSnapshot {
        BuhlmannSnapshot {
            tissues: self.tissues.clone(),
            gf_low_pressure_bar: self.gf_low_pressure_bar,
            tolerated: self.tolerated,
            tolerance: self.tolerance,
        }
    }

    fn restore(&mut self, snapshot: BuhlmannSnapshot) -> f64 {
        self.tissues = snapshot.tissues;
        self.gf_low_pressure_bar = snapshot.gf_low_pressure_bar;
        self.tolerated = snapshot.tolerated;
        self.tolerance = snapshot.tolerance;
        self.tolerance
    }
}

// ============================================================================
// Tests
// ============================================================================
