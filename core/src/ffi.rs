//! Surface exported to the host apps through uniffi (see `divelog.udl`).
//!
//! Fixed-size arrays of the internal series are flattened into `Vec`s; index
//! `i` of every per-cylinder vector refers to cylinder slot `i`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::PlotError;
use crate::models::{Dive, DiveComputer};
use crate::plot_data::{CylinderUse, PlotEntry, PlotInfo, Velocity};
use crate::preferences::Preferences;
use crate::profile::{
    max_plot_depth, max_plot_time, partial_pressure_range, temperature_range, AxisRange,
    PlotSession,
};

/// Summary of the last build, enough to lay out the plot axes.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileSummary {
    pub entry_count: u32,
    pub max_depth_mm: i32,
    pub max_time_sec: i32,
    pub max_pressure_mbar: i32,
    pub min_pressure_mbar: i32,
    pub min_temp_mk: u32,
    pub max_temp_mk: u32,
    pub max_pp: f64,
    pub mean_depth_mm: i32,
    pub has_ndl: bool,
    pub plot_max_time_sec: i32,
    pub plot_max_depth_mm: i32,
    pub temperature_axis: Option<AxisRange>,
    pub partial_pressure_axis: AxisRange,
}

/// One entry of the dense series.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfilePoint {
    pub sec: i32,
    pub depth_mm: i32,
    pub smoothed_mm: i32,
    pub temperature_mk: u32,
    pub speed: i32,
    pub velocity: Velocity,
    pub pressures_mbar: Vec<i32>,
    pub usage: Vec<CylinderUse>,
    pub sac_ml_min: Vec<i32>,
    pub po2: f64,
    pub phe: f64,
    pub pn2: f64,
    pub mod_mm: i32,
    pub ead_mm: i32,
    pub end_mm: i32,
    pub eadd_mm: i32,
    pub ceiling_mm: i32,
    pub tissue_ceilings_mm: Vec<i32>,
    pub ndl_sec: i32,
    pub stop_depth_mm: i32,
    pub stop_time_sec: i32,
    pub in_deco: bool,
    pub cns: u8,
    pub ndl_calc_sec: i32,
    pub tts_calc_sec: i32,
    pub stop_depth_calc_mm: i32,
    pub stop_time_calc_sec: i32,
    pub in_deco_calc: bool,
}

impl From<&PlotEntry> for ProfilePoint {
    fn from(entry: &PlotEntry) -> Self {
        Self {
            sec: entry.sec,
            depth_mm: entry.depth_mm,
            smoothed_mm: entry.smoothed_mm,
            temperature_mk: entry.temperature_mk,
            speed: entry.speed,
            velocity: entry.velocity,
            pressures_mbar: entry.cylinders.iter().map(|c| c.pressure()).collect(),
            usage: entry.cylinders.iter().map(|c| c.usage).collect(),
            sac_ml_min: entry.cylinders.iter().map(|c| c.sac).collect(),
            po2: entry.po2,
            phe: entry.phe,
            pn2: entry.pn2,
            mod_mm: entry.mod_mm,
            ead_mm: entry.ead_mm,
            end_mm: entry.end_mm,
            eadd_mm: entry.eadd_mm,
            ceiling_mm: entry.ceiling_mm,
            tissue_ceilings_mm: entry.ceilings_mm.to_vec(),
            ndl_sec: entry.ndl_sec,
            stop_depth_mm: entry.stop_depth_mm,
            stop_time_sec: entry.stop_time_sec,
            in_deco: entry.in_deco,
            cns: entry.cns,
            ndl_calc_sec: entry.ndl_calc_sec,
            tts_calc_sec: entry.tts_calc_sec,
            stop_depth_calc_mm: entry.stop_depth_calc_mm,
            stop_time_calc_sec: entry.stop_time_calc_sec,
            in_deco_calc: entry.in_deco_calc,
        }
    }
}

fn summarize(pi: &PlotInfo, prefs: &Preferences, zoomed: bool) -> ProfileSummary {
    ProfileSummary {
        entry_count: pi.count() as u32,
        max_depth_mm: pi.max_depth_mm,
        max_time_sec: pi.max_time_sec,
        max_pressure_mbar: pi.max_pressure_mbar,
        min_pressure_mbar: pi.min_pressure_mbar,
        min_temp_mk: pi.min_temp_mk,
        max_temp_mk: pi.max_temp_mk,
        max_pp: pi.max_pp,
        mean_depth_mm: pi.mean_depth_mm,
        has_ndl: pi.has_ndl,
        plot_max_time_sec: max_plot_time(pi, zoomed),
        plot_max_depth_mm: max_plot_depth(pi, zoomed),
        temperature_axis: temperature_range(pi, prefs),
        partial_pressure_axis: partial_pressure_range(pi, zoomed),
    }
}

/// Plot session shared with the host. Builds are expected to be serialized
/// by the caller; the lock only makes the object `Send + Sync`.
pub struct ProfileSession {
    inner: Mutex<PlotSession>,
}

impl ProfileSession {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            inner: Mutex::new(PlotSession::new(prefs)),
        }
    }

    fn session(&self) -> MutexGuard<'_, PlotSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild the plot info of the selected dive computer of `dive`.
    pub fn build(&self, dive: Dive, print_mode: bool) -> Result<ProfileSummary, PlotError> {
        let mut session = self.session();
        let zoomed = session.zoomed();
        let prefs = session.preferences().clone();
        let pi = session.build(&dive, print_mode)?;
        Ok(summarize(pi, &prefs, zoomed))
    }

    /// Summary of the last build, recomputed for the current zoom.
    pub fn summary(&self) -> Option<ProfileSummary> {
        let session = self.session();
        let pi = session.plot_info()?;
        Some(summarize(pi, session.preferences(), session.zoomed()))
    }

    /// The dense series of the last build; empty before the first build.
    pub fn points(&self) -> Vec<ProfilePoint> {
        self.session()
            .plot_info()
            .map(|pi| pi.entries.iter().map(ProfilePoint::from).collect())
            .unwrap_or_default()
    }

    pub fn describe_at(&self, sec: i32) -> String {
        self.session().describe_at(sec)
    }

    pub fn compare(&self, sec_a: i32, sec_b: i32, absolute_speeds: bool) -> String {
        self.session().compare(sec_a, sec_b, absolute_speeds)
    }

    pub fn max_plot_time(&self) -> i32 {
        self.session().max_plot_time()
    }

    pub fn max_plot_depth(&self) -> i32 {
        self.session().max_plot_depth()
    }

    pub fn set_zoomed(&self, zoomed: bool) {
        self.session().set_zoomed(zoomed);
    }

    /// Select the dive computer used by the next build; negative numbers
    /// count from the last one.
    pub fn select_dive_computer(&self, dc_number: i32) {
        self.session().set_dc_number(dc_number);
    }

    pub fn set_preferences(&self, prefs: Preferences) {
        self.session().set_preferences(prefs);
    }
}

/// Distinct event names of `dc`, in order of first occurrence.
pub fn dive_event_names(dc: DiveComputer) -> Vec<String> {
    dc.event_names()
}
