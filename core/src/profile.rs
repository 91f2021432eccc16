//! Plot-info pipeline entry point, the plot session and axis scaling.

use crate::analyze::{analyze_plot_info, calculate_sac};
use crate::buhlmann::Buhlmann;
use crate::deco::{calculate_deco_information, TissueModel};
use crate::densify::{calculate_max_limits, populate_plot_entries};
use crate::describe::{compare_entries, describe_entry_at_time};
use crate::error::PlotError;
use crate::gas::calculate_gas_information;
use crate::models::{Dive, DiveComputer};
use crate::plot_data::PlotInfo;
use crate::preferences::Preferences;
use crate::pressure::{populate_pressure_information, setup_gas_sensor_pressure};
use crate::units::SURFACE_PRESSURE_MBAR;
use crate::usage::{assign_default_usage, check_gas_change_events};

fn round_up(value: i32, step: i32) -> i32 {
    (value + step - 1) / step * step
}

/// Build the plot info for one dive computer of `dive` with the ZHL-16C
/// model configured from `prefs`.
pub fn build_plot_info(
    dive: &Dive,
    dc: &DiveComputer,
    prefs: &Preferences,
    print_mode: bool,
) -> Result<PlotInfo, PlotError> {
    let mut model = Buhlmann::new(prefs.gf_low, prefs.gf_high, prefs.last_deco_stop_mm);
    build_plot_info_with(&mut model, dive, dc, prefs, print_mode)
}

/// [`build_plot_info`] with a caller supplied tissue model.
pub fn build_plot_info_with<M: TissueModel>(
    model: &mut M,
    dive: &Dive,
    dc: &DiveComputer,
    prefs: &Preferences,
    print_mode: bool,
) -> Result<PlotInfo, PlotError> {
    let limits = calculate_max_limits(dive);
    let mut entries = populate_plot_entries(dc, limits.max_time_sec)?;
    log::debug!(
        "building plot info: {} entries up to {}s",
        entries.len(),
        limits.max_time_sec
    );

    assign_default_usage(dive, &mut entries);
    check_gas_change_events(dive, dc, &mut entries);
    setup_gas_sensor_pressure(dive, &mut entries);
    populate_pressure_information(dive, &mut entries);
    calculate_sac(dive, &mut entries);
    if prefs.calc_ceiling {
        calculate_deco_information(model, dive, dc, prefs, &mut entries, print_mode);
    }
    let max_pp = calculate_gas_information(dive, prefs, &mut entries);
    analyze_plot_info(&mut entries);

    let has_ndl = entries.iter().any(|e| e.ndl_sec != 0);
    let mean_depth_mm = dive
        .computers
        .first()
        .map_or(dc.mean_depth_mm, |first| first.mean_depth_mm);

    Ok(PlotInfo {
        entries,
        max_depth_mm: limits.max_depth_mm,
        max_time_sec: limits.max_time_sec,
        max_pressure_mbar: limits.max_pressure_mbar,
        min_pressure_mbar: limits.min_pressure_mbar,
        min_temp_mk: limits.min_temp_mk,
        max_temp_mk: limits.max_temp_mk,
        max_pp,
        mean_depth_mm,
        has_ndl,
    })
}

/// Right edge of the time axis in seconds.
///
/// Unzoomed plots show at least 30 minutes so that short dives look short.
pub fn max_plot_time(pi: &PlotInfo, zoomed: bool) -> i32 {
    let seconds = pi.max_time_sec;
    if zoomed {
        // a quarter of the time as margin below 10 minutes, which meets the
        // fixed 150s at 600s
        if seconds < 600 {
            round_up(seconds + seconds / 4, 60)
        } else {
            round_up(seconds + 150, 60)
        }
    } else {
        (30 * 60).max(round_up(seconds + 150, 5 * 60))
    }
}

/// Bottom of the depth axis in mm, with room for the partial pressure graphs.
pub fn max_plot_depth(pi: &PlotInfo, zoomed: bool) -> i32 {
    let mm = pi.max_depth_mm;
    let depth = if zoomed {
        round_up(mm + 3000, 10_000)
    } else {
        30_000.max(round_up(mm + 3000, 10_000))
    };
    depth + (pi.max_pp * 9000.0) as i32
}

/// Vertical extent of a plot axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

/// Temperature axis in mK placing the curve in the lower part of the plot,
/// or `None` when the dive has no usable temperatures.
pub fn temperature_range(pi: &PlotInfo, prefs: &Preferences) -> Option<AxisRange> {
    let min = pi.min_temp_mk as f64;
    let max = pi.max_temp_mk as f64;
    if pi.max_temp_mk == 0 || max < min {
        return None;
    }
    let delta = (max - min).max(3000.0);
    let bottom = if prefs.pp_graphs_enabled() {
        min - delta * 2.0
    } else {
        min - delta / 3.0
    };
    Some(AxisRange {
        min: bottom,
        max: max + delta * 2.0,
    })
}

/// Partial pressure axis in bar: one and a half times the ambient pressure
/// at the bottom of the depth axis.
pub fn partial_pressure_range(pi: &PlotInfo, zoomed: bool) -> AxisRange {
    let depth = max_plot_depth(pi, zoomed) as f64;
    let top = 1.5 * (depth + 10_000.0) / 10_000.0 * SURFACE_PRESSURE_MBAR as f64 / 1000.0;
    AxisRange {
        min: -top / 20.0,
        max: top,
    }
}

/// Per-view state: zoom, the selected dive computer, preferences and the most
/// recently built plot info. Builds are serialized by the owner.
#[derive(Debug, Default)]
pub struct PlotSession {
    zoomed: bool,
    dc_number: i32,
    prefs: Preferences,
    last: Option<PlotInfo>,
}

impl PlotSession {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs,
            ..Self::default()
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Replace the preferences; the cached plot info is stale afterwards.
    pub fn set_preferences(&mut self, prefs: Preferences) {
        self.prefs = prefs;
        self.invalidate();
    }

    pub fn zoomed(&self) -> bool {
        self.zoomed
    }

    pub fn set_zoomed(&mut self, zoomed: bool) {
        self.zoomed = zoomed;
    }

    pub fn dc_number(&self) -> i32 {
        self.dc_number
    }

    /// Select a dive computer; negative numbers count from the last one.
    pub fn set_dc_number(&mut self, dc_number: i32) {
        self.dc_number = dc_number;
        self.invalidate();
    }

    /// The selected dive computer of `dive`. A selection past the end (after
    /// switching to a dive with fewer computers) falls back to the first one
    /// and resets the selection.
    pub fn select_dc<'a>(&mut self, dive: &'a Dive) -> Option<&'a DiveComputer> {
        let count = dive.computers.len() as i32;
        if count == 0 {
            return None;
        }
        let mut index = self.dc_number;
        while index < 0 {
            index += count;
        }
        if index >= count {
            self.dc_number = 0;
            index = 0;
        }
        dive.computers.get(index as usize)
    }

    /// Build and cache the plot info for the selected dive computer. The
    /// previous plot info is dropped first, even if the build fails.
    pub fn build(&mut self, dive: &Dive, print_mode: bool) -> Result<&PlotInfo, PlotError> {
        self.invalidate();
        let dc = self.select_dc(dive).ok_or(PlotError::NoDiveComputer)?;
        let pi = build_plot_info(dive, dc, &self.prefs, print_mode)?;
        Ok(&*self.last.insert(pi))
    }

    pub fn plot_info(&self) -> Option<&PlotInfo> {
        self.last.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }

    pub fn max_plot_time(&self) -> i32 {
        self.last
            .as_ref()
            .map_or(0, |pi| max_plot_time(pi, self.zoomed))
    }

    pub fn max_plot_depth(&self) -> i32 {
        self.last
            .as_ref()
            .map_or(0, |pi| max_plot_depth(pi, self.zoomed))
    }

    /// Tooltip text at `sec`; empty without plot info or outside the dive.
    pub fn describe_at(&self, sec: i32) -> String {
        self.last
            .as_ref()
            .map(|pi| describe_entry_at_time(pi, sec, &self.prefs))
            .unwrap_or_default()
    }

    /// Ruler text between two times; empty when either lies outside the dive.
    pub fn compare(&self, sec_a: i32, sec_b: i32, absolute_speeds: bool) -> String {
        let Some(pi) = self.last.as_ref() else {
            return String::new();
        };
        match (pi.entry_index_at(sec_a), pi.entry_index_at(sec_b)) {
            (Some(a), Some(b)) => {
                compare_entries(&pi.entries, a, b, absolute_speeds, self.prefs.units)
            }
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;

    fn pi_with(max_time_sec: i32, max_depth_mm: i32) -> PlotInfo {
        PlotInfo {
            max_time_sec,
            max_depth_mm,
            ..PlotInfo::default()
        }
    }

    fn dive_with_computers(models: &[&str]) -> Dive {
        Dive {
            computers: models
                .iter()
                .map(|model| DiveComputer {
                    model: model.to_string(),
                    samples: vec![Sample::new(0, 0), Sample::new(60, 10_000), Sample::new(120, 0)],
                    ..DiveComputer::default()
                })
                .collect(),
            ..Dive::default()
        }
    }

    #[test]
    fn test_max_plot_time() {
        assert_eq!(max_plot_time(&pi_with(1500, 0), false), 1800);
        assert_eq!(max_plot_time(&pi_with(5400, 0), false), 5700);
        assert_eq!(max_plot_time(&pi_with(400, 0), true), 540);
        assert_eq!(max_plot_time(&pi_with(1500, 0), true), 1680);
    }

    #[test]
    fn test_max_plot_depth() {
        assert_eq!(max_plot_depth(&pi_with(0, 12_000), false), 30_000);
        assert_eq!(max_plot_depth(&pi_with(0, 12_000), true), 20_000);
        assert_eq!(max_plot_depth(&pi_with(0, 38_000), false), 50_000);
        let pi = PlotInfo {
            max_pp: 1.5,
            ..pi_with(0, 12_000)
        };
        assert_eq!(max_plot_depth(&pi, false), 43_500);
    }

    #[test]
    fn test_axis_helpers() {
        let pi = PlotInfo {
            min_temp_mk: 288_150,
            max_temp_mk: 289_150,
            ..PlotInfo::default()
        };
        let prefs = Preferences::default();
        // a 1K spread is widened to 3K
        assert_eq!(
            temperature_range(&pi, &prefs),
            Some(AxisRange {
                min: 287_150.0,
                max: 295_150.0,
            })
        );
        assert_eq!(temperature_range(&PlotInfo::default(), &prefs), None);

        let pp = partial_pressure_range(&pi_with(0, 12_000), false);
        assert!((pp.max - 1.5 * 4.0 * 1.013).abs() < 1e-9);
        assert!((pp.min + pp.max / 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_dc_selection_wraps_and_resets() {
        let dive = dive_with_computers(&["a", "b", "c"]);
        let mut session = PlotSession::default();

        session.set_dc_number(-1);
        assert_eq!(session.select_dc(&dive).map(|dc| dc.model.as_str()), Some("c"));

        session.set_dc_number(1);
        assert_eq!(session.select_dc(&dive).map(|dc| dc.model.as_str()), Some("b"));

        session.set_dc_number(5);
        assert_eq!(session.select_dc(&dive).map(|dc| dc.model.as_str()), Some("a"));
        assert_eq!(session.dc_number(), 0);

        assert!(session.select_dc(&Dive::default()).is_none());
    }

    #[test]
    fn test_session_caches_last_build() {
        let dive = dive_with_computers(&["a"]);
        let mut session = PlotSession::new(Preferences::default());
        assert!(session.plot_info().is_none());
        assert_eq!(session.describe_at(30), "");

        let count = session.build(&dive, false).map(|pi| pi.count()).unwrap_or(0);
        assert!(count > 0);
        assert!(session.plot_info().is_some());
        assert_eq!(session.max_plot_time(), 1800);

        session.set_preferences(Preferences {
            calc_ceiling: false,
            ..Preferences::default()
        });
        assert!(session.plot_info().is_none());

        assert_eq!(
            session.build(&Dive::default(), false).err(),
            Some(PlotError::NoDiveComputer)
        );
        assert!(session.plot_info().is_none());
    }
}
