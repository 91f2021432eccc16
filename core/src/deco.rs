//! Decompression driver: walks the tissue model along the densified depth
//! path, one simulated second at a time.
//!
//! The model is a black box behind [`TissueModel`]. Speculative NDL/TTS
//! estimation runs on a checkpoint and restores it afterwards, so the running
//! tissue state used for the next real step is never disturbed.

use crate::densify::interpolate;
use crate::models::{Dive, DiveComputer, GasMix};
use crate::plot_data::{PlotEntry, NUM_COMPARTMENTS};
use crate::preferences::Preferences;
use crate::units::{depth_to_mbar, rel_mbar_to_depth, surface_pressure_mbar};

/// No NDL is computed shallower than this; the entry gets the NDL cap.
const NDL_MIN_DEPTH_MM: i32 = 3000;

/// Upper bound on a speculative time-to-surface.
const MAX_TTS_SEC: i32 = 48 * 3600;

/// A multi-compartment inert gas loading model.
///
/// Tolerances are ambient pressures in bar: the shallowest pressure the
/// loaded tissues accept.
pub trait TissueModel {
    /// Saved state; a plain value handed back to [`TissueModel::restore`].
    type Snapshot;

    /// Start over with tissues equilibrated at the surface.
    fn reset(&mut self, surface_bar: f64);

    /// Breathe `gas` at `ambient_bar` for `duration_sec` and return the new
    /// tolerance. A non-zero `ccpo2_mbar` is a rebreather setpoint.
    fn add_segment(
        &mut self,
        ambient_bar: f64,
        gas: &GasMix,
        duration_sec: i32,
        ccpo2_mbar: i32,
    ) -> f64;

    /// Ceiling depth for `tolerance`. Unless `smooth`, rounded up to 3m stops.
    fn allowed_ceiling_mm(&self, tolerance: f64, surface_bar: f64, dive: &Dive, smooth: bool)
        -> i32;

    /// Tolerance of each compartment after the last segment.
    fn compartment_tolerances(&self) -> [f64; NUM_COMPARTMENTS];

    fn checkpoint(&self) -> Self::Snapshot;

    /// Return to `snapshot` and report its tolerance.
    fn restore(&mut self, snapshot: Self::Snapshot) -> f64;
}

fn round_up(value: i32, step: i32) -> i32 {
    (value + step - 1) / step * step
}

/// Convert a tissue tolerance into a ceiling depth. Ceilings shallower than
/// the last stop are moved down to it.
pub fn deco_allowed_depth(
    tolerance: f64,
    surface_bar: f64,
    dive: &Dive,
    smooth: bool,
    last_deco_stop_mm: i32,
) -> i32 {
    let delta_bar = (tolerance - surface_bar).max(0.0);
    let mut depth = rel_mbar_to_depth((delta_bar * 1000.0).round() as i32, dive);
    if !smooth {
        depth = round_up(depth, 3000);
    }
    if depth > 0 && depth < last_deco_stop_mm {
        depth = last_deco_stop_mm;
    }
    depth
}

/// Surface pressure the simulation starts from, in bar.
pub fn deco_surface_bar(dive: &Dive, dc: &DiveComputer) -> f64 {
    let mbar = if dc.surface_pressure_mbar != 0 {
        dc.surface_pressure_mbar as i32
    } else {
        surface_pressure_mbar(dive)
    };
    mbar as f64 / 1000.0
}

fn ambient_bar(depth_mm: i32, dive: &Dive) -> f64 {
    depth_to_mbar(depth_mm, dive) as f64 / 1000.0
}

fn smooth_ceiling<M: TissueModel>(model: &M, tolerance: f64, surface_bar: f64, dive: &Dive) -> i32 {
    model.allowed_ceiling_mm(tolerance, surface_bar, dive, true)
}

fn ccpo2_mbar(entry: &PlotEntry) -> i32 {
    (entry.po2 * 1000.0).round() as i32
}

/// Record the ceiling (and optionally per-compartment ceilings and NDL/TTS)
/// for every entry.
pub fn calculate_deco_information<M: TissueModel>(
    model: &mut M,
    dive: &Dive,
    dc: &DiveComputer,
    prefs: &Preferences,
    entries: &mut [PlotEntry],
    print_mode: bool,
) {
    let surface_bar = deco_surface_bar(dive, dc);
    model.reset(surface_bar);
    let mut tolerance = 0.0;
    let mut skipped = 0usize;

    for i in 1..entries.len() {
        let t0 = entries[i - 1].sec;
        let t1 = entries[i].sec;
        let previous_depth = entries[i - 1].depth_mm;
        let entry = &entries[i];

        match entry.breathing_cylinder() {
            Some(cyl) => {
                let gas = dive.gasmix(cyl);
                let ccpo2 = ccpo2_mbar(entry);
                for j in t0 + 1..=t1 {
                    let depth = interpolate(previous_depth, entry.depth_mm, j - t0, t1 - t0);
                    tolerance = model.add_segment(ambient_bar(depth, dive), &gas, 1, ccpo2);
                }
            }
            None if t1 > t0 => skipped += 1,
            None => {}
        }

        let ceiling = if t0 == t1 {
            entries[i - 1].ceiling_mm
        } else {
            model.allowed_ceiling_mm(tolerance, surface_bar, dive, !prefs.calc_ceiling_3m_incr)
        };
        entries[i].ceiling_mm = ceiling;

        if prefs.calc_all_tissues {
            let tolerances = model.compartment_tolerances();
            for (ceiling, tolerated) in entries[i].ceilings_mm.iter_mut().zip(tolerances) {
                *ceiling = model.allowed_ceiling_mm(tolerated, surface_bar, dive, true);
            }
        }

        if prefs.calc_ndl_tts && !print_mode {
            let snapshot = model.checkpoint();
            calculate_ndl_tts(model, tolerance, &mut entries[i], dive, prefs, surface_bar);
            tolerance = model.restore(snapshot);
        }
    }

    if skipped > 0 {
        log::warn!("no breathing cylinder on {skipped} entries, tissue loading skipped there");
    }
    log::debug!(
        "deco: {} entries, final tolerance {tolerance:.3} bar",
        entries.len()
    );
}

/// Speculative no-decompression limit, or first stop and time to surface,
/// for `entry`. Mutates the model; callers checkpoint and restore around it.
pub fn calculate_ndl_tts<M: TissueModel>(
    model: &mut M,
    mut tolerance: f64,
    entry: &mut PlotEntry,
    dive: &Dive,
    prefs: &Preferences,
    surface_bar: f64,
) {
    let Some(cyl) = entry.breathing_cylinder() else {
        return;
    };
    let gas = dive.gasmix(cyl);
    let ccpo2 = ccpo2_mbar(entry);
    let time_step = prefs.time_step_sec.max(1);
    let deco_step = prefs.deco_step_mm.max(1);
    let ascent_rate = prefs.ascent_mm_per_step.max(1);
    let deco_ascent_rate = prefs.ascent_mm_per_deco_step.max(1);

    let mut next_stop = round_up(smooth_ceiling(model, tolerance, surface_bar, dive), deco_step);
    let mut ascent_depth = entry.depth_mm;

    if next_stop == 0 {
        if entry.depth_mm < NDL_MIN_DEPTH_MM {
            entry.ndl_calc_sec = prefs.max_ndl_sec;
            return;
        }
        let ambient = ambient_bar(entry.depth_mm, dive);
        while entry.ndl_calc_sec < prefs.max_ndl_sec
            && smooth_ceiling(model, tolerance, surface_bar, dive) <= 0
        {
            entry.ndl_calc_sec += time_step;
            tolerance = model.add_segment(ambient, &gas, time_step, ccpo2);
        }
        return;
    }

    entry.in_deco_calc = true;

    // travel to the first stop
    while ascent_depth > next_stop {
        tolerance = model.add_segment(ambient_bar(ascent_depth, dive), &gas, 1, ccpo2);
        next_stop = round_up(smooth_ceiling(model, tolerance, surface_bar, dive), deco_step);
        ascent_depth -= ascent_rate;
        entry.tts_calc_sec += 1;
    }
    ascent_depth = next_stop;

    entry.stop_time_calc_sec = 0;
    entry.stop_depth_calc_mm = next_stop;
    next_stop -= deco_step;

    while next_stop >= 0 {
        if entry.tts_calc_sec >= MAX_TTS_SEC {
            log::warn!("TTS estimate at {}s capped at {MAX_TTS_SEC}s", entry.sec);
            break;
        }
        if ascent_depth == entry.stop_depth_calc_mm {
            entry.stop_time_calc_sec += time_step;
        }
        entry.tts_calc_sec += time_step;
        tolerance = model.add_segment(ambient_bar(ascent_depth, dive), &gas, time_step, ccpo2);

        if smooth_ceiling(model, tolerance, surface_bar, dive) <= next_stop {
            while ascent_depth > next_stop {
                tolerance = model.add_segment(ambient_bar(ascent_depth, dive), &gas, 1, ccpo2);
                ascent_depth -= deco_ascent_rate;
                entry.tts_calc_sec += 1;
            }
            ascent_depth = next_stop;
            next_stop -= deco_step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buhlmann::Buhlmann;
    use crate::plot_data::CylinderUse;

    /// Descend to `depth_mm` in a minute, then stay until `bottom_sec`;
    /// one entry every 10s on cylinder 0.
    fn square_profile(depth_mm: i32, bottom_sec: i32) -> Vec<PlotEntry> {
        let mut entries = Vec::new();
        for _ in 0..2 {
            entries.push(PlotEntry::default());
        }
        for sec in (10..=bottom_sec).step_by(10) {
            entries.push(PlotEntry {
                sec,
                depth_mm: if sec < 60 { depth_mm * sec / 60 } else { depth_mm },
                ..PlotEntry::default()
            });
        }
        for entry in entries.iter_mut() {
            entry.cylinders[0].usage = CylinderUse::Oc;
        }
        entries
    }

    fn model(prefs: &Preferences) -> Buhlmann {
        Buhlmann::new(prefs.gf_low, prefs.gf_high, prefs.last_deco_stop_mm)
    }

    fn run(prefs: &Preferences, entries: &mut [PlotEntry], print_mode: bool) {
        let dive = Dive::default();
        let dc = DiveComputer::default();
        let mut model = model(prefs);
        calculate_deco_information(&mut model, &dive, &dc, prefs, entries, print_mode);
    }

    #[test]
    fn test_allowed_depth_rounding() {
        let dive = Dive::default();
        // below the surface pressure: no ceiling
        assert_eq!(deco_allowed_depth(0.9, 1.013, &dive, true, 3000), 0);
        // 0.2 bar of overpressure is about 2m, moved down to the last stop
        assert_eq!(deco_allowed_depth(1.213, 1.013, &dive, true, 3000), 3000);
        let smooth = deco_allowed_depth(1.513, 1.013, &dive, true, 3000);
        assert!(smooth > 4000 && smooth < 6000, "smooth {smooth}");
        assert_eq!(deco_allowed_depth(1.513, 1.013, &dive, false, 3000), 6000);
        assert_eq!(deco_allowed_depth(1.213, 1.013, &dive, true, 6000), 6000);
    }

    #[test]
    fn test_surface_pressure_source() {
        let dive = Dive {
            surface_pressure_mbar: 980,
            ..Dive::default()
        };
        let dc = DiveComputer {
            surface_pressure_mbar: 1020,
            ..DiveComputer::default()
        };
        assert_eq!(deco_surface_bar(&dive, &dc), 1.020);
        assert_eq!(deco_surface_bar(&dive, &DiveComputer::default()), 0.980);
        assert_eq!(deco_surface_bar(&Dive::default(), &DiveComputer::default()), 1.013);
    }

    #[test]
    fn test_ceiling_appears_on_long_deep_dive() {
        let prefs = Preferences::default();
        let mut entries = square_profile(40_000, 30 * 60);
        run(&prefs, &mut entries, false);

        assert_eq!(entries[2].ceiling_mm, 0);
        let last = entries.last().map(|e| e.ceiling_mm).unwrap_or_default();
        assert!(last >= 3000, "ceiling {last}");
        // per-tissue ceilings are off by default
        assert!(entries.iter().all(|e| e.ceilings_mm == [0; NUM_COMPARTMENTS]));
    }

    #[test]
    fn test_all_tissue_ceilings() {
        let prefs = Preferences {
            calc_all_tissues: true,
            ..Preferences::default()
        };
        let mut entries = square_profile(40_000, 30 * 60);
        run(&prefs, &mut entries, false);
        let last = entries.last().cloned().unwrap_or_default();
        let deepest = last.ceilings_mm.iter().copied().max().unwrap_or_default();
        assert!(deepest > 0);
        // smooth ceilings: the overall one is the deepest compartment
        assert_eq!(deepest, last.ceiling_mm);
    }

    #[test]
    fn test_speculation_does_not_disturb_ceilings() {
        let plain = Preferences::default();
        let speculative = Preferences {
            calc_ndl_tts: true,
            ..Preferences::default()
        };
        let mut a = square_profile(40_000, 25 * 60);
        let mut b = square_profile(40_000, 25 * 60);
        run(&plain, &mut a, false);
        run(&speculative, &mut b, false);

        let ceilings_a: Vec<i32> = a.iter().map(|e| e.ceiling_mm).collect();
        let ceilings_b: Vec<i32> = b.iter().map(|e| e.ceiling_mm).collect();
        assert_eq!(ceilings_a, ceilings_b);
        assert!(a.iter().all(|e| e.ndl_calc_sec == 0 && e.tts_calc_sec == 0));
    }

    #[test]
    fn test_ndl_then_deco() {
        let prefs = Preferences {
            calc_ndl_tts: true,
            ..Preferences::default()
        };
        let mut entries = square_profile(40_000, 30 * 60);
        run(&prefs, &mut entries, false);

        // two minutes in there is still some NDL left
        let early = &entries[2 + 12];
        assert!(!early.in_deco_calc);
        assert!(early.ndl_calc_sec > 0 && early.ndl_calc_sec < prefs.max_ndl_sec);

        let late = entries.last().cloned().unwrap_or_default();
        assert!(late.in_deco_calc);
        assert!(late.stop_depth_calc_mm >= 3000);
        assert_eq!(late.stop_depth_calc_mm % 3000, 0);
        assert!(late.stop_time_calc_sec > 0);
        assert!(late.tts_calc_sec > late.stop_time_calc_sec);
    }

    #[test]
    fn test_shallow_entries_get_max_ndl() {
        let prefs = Preferences {
            calc_ndl_tts: true,
            ..Preferences::default()
        };
        let mut entries = square_profile(2_000, 5 * 60);
        run(&prefs, &mut entries, false);
        let last = entries.last().cloned().unwrap_or_default();
        assert_eq!(last.ndl_calc_sec, prefs.max_ndl_sec);
        assert_eq!(last.tts_calc_sec, 0);
    }

    #[test]
    fn test_print_mode_skips_speculation() {
        let prefs = Preferences {
            calc_ndl_tts: true,
            ..Preferences::default()
        };
        let mut entries = square_profile(40_000, 10 * 60);
        run(&prefs, &mut entries, true);
        assert!(entries
            .iter()
            .all(|e| e.ndl_calc_sec == 0 && e.tts_calc_sec == 0 && !e.in_deco_calc));
    }

    #[test]
    fn test_entries_without_breathing_gas_are_skipped() {
        let _ = env_logger::builder().is_test(true).try_init();
        let prefs = Preferences::default();
        let mut entries = square_profile(40_000, 30 * 60);
        for entry in entries.iter_mut() {
            entry.cylinders[0].usage = CylinderUse::NotInUse;
        }
        run(&prefs, &mut entries, false);
        assert!(entries.iter().all(|e| e.ceiling_mm == 0));
    }
}
