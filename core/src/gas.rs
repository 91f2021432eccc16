//! Partial pressures and the depth equivalents derived from them.

use crate::models::{Dive, N2_IN_AIR, O2_IN_AIR};
use crate::plot_data::PlotEntry;
use crate::preferences::Preferences;
use crate::units::depth_to_mbar;

// Gas densities in g/m³ at surface pressure.
const O2_DENSITY: f64 = 1429.0;
const N2_DENSITY: f64 = 1165.0;
const HE_DENSITY: f64 = 166.0;

/// Depth (mm) of each additional atmosphere of sea water in the EAD/END/EADD
/// approximations.
const MM_PER_ATM: f64 = 10_000.0;

fn set_partial_pressures(entry: &mut PlotEntry, ambient: f64, fo2: f64, fhe: f64, he_ratio: f64) {
    if entry.po2 > 0.0 {
        // a sensed loop pO2: the cylinder only sets the inert gas ratio
        let po2 = entry.po2.min(ambient);
        entry.po2 = po2;
        entry.phe = (ambient - po2) * he_ratio;
        entry.pn2 = ambient - po2 - entry.phe;
    } else {
        entry.po2 = fo2 * ambient;
        entry.phe = fhe * ambient;
        entry.pn2 = (1.0 - fo2 - fhe) * ambient;
    }
}

fn set_depth_equivalents(
    entry: &mut PlotEntry,
    ambient: f64,
    o2_permille: f64,
    he_ratio: f64,
    mod_po2: f64,
) {
    let depth = entry.depth_mm as f64 + MM_PER_ATM;
    let inert = ambient - entry.po2;

    let mod_mm = (mod_po2 / o2_permille * 1000.0 - 1.0) * MM_PER_ATM;
    let ead = depth * (entry.po2 + inert * (1.0 - he_ratio)) / ambient - MM_PER_ATM;
    let end = depth * inert * (1.0 - he_ratio) / ambient / N2_IN_AIR as f64 * 1000.0 - MM_PER_ATM;
    let density = entry.po2 / ambient * O2_DENSITY
        + entry.pn2 / ambient * N2_DENSITY
        + entry.phe / ambient * HE_DENSITY;
    let air_density = O2_IN_AIR as f64 * O2_DENSITY + N2_IN_AIR as f64 * N2_DENSITY;
    let eadd = depth * density / air_density * 1000.0 - MM_PER_ATM;

    entry.mod_mm = mod_mm.max(0.0) as i32;
    entry.ead_mm = ead.max(0.0) as i32;
    entry.end_mm = end.max(0.0) as i32;
    entry.eadd_mm = eadd.max(0.0) as i32;
}

/// Fill pO2/pHe/pN2 and MOD/EAD/END/EADD for every entry with a breathing
/// cylinder. Returns the largest partial pressure among the enabled graphs.
pub fn calculate_gas_information(
    dive: &Dive,
    prefs: &Preferences,
    entries: &mut [PlotEntry],
) -> f64 {
    let mut max_pp = 0.0_f64;
    let mut skipped = 0usize;
    let mut ambiguous = 0usize;

    for entry in entries.iter_mut().skip(1) {
        let Some(cyl) = entry.breathing_cylinder() else {
            skipped += 1;
            continue;
        };
        if entry.cylinders.iter().filter(|c| c.usage.is_breathing()).count() > 1 {
            ambiguous += 1;
        }

        let ambient = depth_to_mbar(entry.depth_mm, dive) as f64 / 1000.0;
        let gas = dive.gasmix(cyl);
        let o2 = gas.o2() as f64;
        let he = gas.he() as f64;
        let he_ratio = if o2 < 1000.0 { he / (1000.0 - o2) } else { 0.0 };

        set_partial_pressures(entry, ambient, o2 / 1000.0, he / 1000.0, he_ratio);
        set_depth_equivalents(entry, ambient, o2, he_ratio, prefs.mod_po2);

        if prefs.pp_graphs.po2 {
            max_pp = max_pp.max(entry.po2);
        }
        if prefs.pp_graphs.phe {
            max_pp = max_pp.max(entry.phe);
        }
        if prefs.pp_graphs.pn2 {
            max_pp = max_pp.max(entry.pn2);
        }
    }

    if skipped > 0 {
        log::warn!("no breathing cylinder on {skipped} entries, gas information skipped there");
    }
    if ambiguous > 0 {
        log::warn!("{ambiguous} entries breathe from more than one cylinder, using the first");
    }
    max_pp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cylinder, GasMix};
    use crate::plot_data::CylinderUse;
    use crate::preferences::PartialPressureGraphs;

    fn dive_with(mixes: &[GasMix]) -> Dive {
        Dive {
            cylinders: mixes
                .iter()
                .map(|&gasmix| Cylinder {
                    size_ml: 12_000,
                    gasmix,
                    ..Cylinder::default()
                })
                .collect(),
            ..Dive::default()
        }
    }

    fn entries_at(depths: &[i32], cyl: usize) -> Vec<PlotEntry> {
        let mut entries = vec![PlotEntry::default()];
        for (i, &depth_mm) in depths.iter().enumerate() {
            let mut entry = PlotEntry {
                sec: (i as i32 + 1) * 10,
                depth_mm,
                ..PlotEntry::default()
            };
            entry.cylinders[cyl].usage = CylinderUse::Oc;
            entries.push(entry);
        }
        entries
    }

    #[test]
    fn test_air_partial_pressures() {
        let dive = dive_with(&[GasMix::air()]);
        let mut entries = entries_at(&[30_000], 0);
        calculate_gas_information(&dive, &Preferences::default(), &mut entries);

        let entry = &entries[1];
        let ambient = depth_to_mbar(30_000, &dive) as f64 / 1000.0;
        assert!((entry.po2 - 0.209 * ambient).abs() < 1e-9);
        assert!((entry.pn2 - 0.791 * ambient).abs() < 1e-9);
        assert_eq!(entry.phe, 0.0);
        // on air the equivalent depths are about the real depth
        assert!((entry.ead_mm - 30_000).abs() < 500, "ead {}", entry.ead_mm);
        assert!((entry.end_mm - 30_000).abs() < 1_000, "end {}", entry.end_mm);
        assert!((entry.eadd_mm - 30_000).abs() < 1_000, "eadd {}", entry.eadd_mm);
        // 1.6 bar on air is about 66m
        assert!((entry.mod_mm - 66_555).abs() < 10, "mod {}", entry.mod_mm);
    }

    #[test]
    fn test_nitrox_and_trimix_equivalents() {
        let dive = dive_with(&[GasMix::new(320, 0), GasMix::new(210, 350)]);
        let mut nitrox = entries_at(&[30_000], 0);
        let mut trimix = entries_at(&[30_000], 1);
        let prefs = Preferences::default();
        calculate_gas_information(&dive, &prefs, &mut nitrox);
        calculate_gas_information(&dive, &prefs, &mut trimix);

        assert!(nitrox[1].end_mm < 30_000);
        assert!(nitrox[1].mod_mm < 45_000);
        assert!(trimix[1].phe > 1.0);
        assert!(trimix[1].end_mm < 20_000);
        assert!(trimix[1].eadd_mm < 30_000);
    }

    #[test]
    fn test_sensed_po2_overrides_mix() {
        let dive = dive_with(&[GasMix::new(210, 350)]);
        let mut entries = entries_at(&[20_000, 1_000], 0);
        entries[1].po2 = 1.3;
        entries[2].po2 = 1.3;
        calculate_gas_information(&dive, &Preferences::default(), &mut entries);

        let ambient = depth_to_mbar(20_000, &dive) as f64 / 1000.0;
        assert_eq!(entries[1].po2, 1.3);
        let he_ratio = 350.0 / 790.0;
        assert!((entries[1].phe - (ambient - 1.3) * he_ratio).abs() < 1e-9);
        assert!((entries[1].po2 + entries[1].phe + entries[1].pn2 - ambient).abs() < 1e-9);

        // shallower than the setpoint can reach
        let shallow_ambient = depth_to_mbar(1_000, &dive) as f64 / 1000.0;
        assert_eq!(entries[2].po2, shallow_ambient);
        assert_eq!(entries[2].phe, 0.0);
    }

    #[test]
    fn test_equivalents_clamped_at_surface() {
        let dive = dive_with(&[GasMix::new(1000, 0)]);
        let mut entries = entries_at(&[0], 0);
        calculate_gas_information(&dive, &Preferences::default(), &mut entries);
        assert_eq!(entries[1].mod_mm, 6_000);
        assert_eq!(entries[1].end_mm, 0);
        assert!(entries[1].ead_mm >= 0 && entries[1].eadd_mm >= 0);
    }

    #[test]
    fn test_max_pp_follows_enabled_graphs() {
        let dive = dive_with(&[GasMix::air()]);
        let mut entries = entries_at(&[10_000, 40_000], 0);

        let none = calculate_gas_information(&dive, &Preferences::default(), &mut entries.clone());
        assert_eq!(none, 0.0);

        let prefs = Preferences {
            pp_graphs: PartialPressureGraphs {
                po2: true,
                ..PartialPressureGraphs::default()
            },
            ..Preferences::default()
        };
        let po2_only = calculate_gas_information(&dive, &prefs, &mut entries.clone());
        let ambient = depth_to_mbar(40_000, &dive) as f64 / 1000.0;
        assert!((po2_only - 0.209 * ambient).abs() < 1e-9);

        let prefs = Preferences {
            pp_graphs: PartialPressureGraphs {
                po2: true,
                pn2: true,
                ..PartialPressureGraphs::default()
            },
            ..Preferences::default()
        };
        let with_n2 = calculate_gas_information(&dive, &prefs, &mut entries);
        assert!((with_n2 - 0.791 * ambient).abs() < 1e-9);
    }

    #[test]
    fn test_entries_without_cylinder_are_left_alone() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dive = dive_with(&[GasMix::air()]);
        let mut entries = entries_at(&[20_000], 0);
        entries[1].cylinders[0].usage = CylinderUse::NotInUse;
        calculate_gas_information(&dive, &Preferences::default(), &mut entries);
        assert_eq!(entries[1].po2, 0.0);
        assert_eq!(entries[1].mod_mm, 0);
    }
}
