//! User preferences consulted while building plot info.
//!
//! Preferences are read-only for the duration of a build; the session owns
//! its copy and rebuilds from scratch when they change.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

/// Which partial pressure curves are shown, and their warning thresholds (bar).
#[derive(Clone, Debug, PartialEq)]
pub struct PartialPressureGraphs {
    pub po2: bool,
    pub pn2: bool,
    pub phe: bool,
    pub po2_threshold: f64,
    pub pn2_threshold: f64,
    pub phe_threshold: f64,
}

impl Default for PartialPressureGraphs {
    fn default() -> Self {
        Self {
            po2: false,
            pn2: false,
            phe: false,
            po2_threshold: 1.6,
            pn2_threshold: 4.0,
            phe_threshold: 13.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Preferences {
    /// Run the tissue simulation and record ceilings.
    pub calc_ceiling: bool,
    /// Round the ceiling up to 3m stop increments.
    pub calc_ceiling_3m_incr: bool,
    /// Record a ceiling for every tissue compartment.
    pub calc_all_tissues: bool,
    /// Speculative NDL / TTS estimation (skipped in print mode).
    pub calc_ndl_tts: bool,
    pub gf_low: f64,
    pub gf_high: f64,
    pub last_deco_stop_mm: i32,
    /// Ascent per second while travelling to the first stop.
    pub ascent_mm_per_step: i32,
    /// Ascent per second while travelling between stops.
    pub ascent_mm_per_deco_step: i32,
    pub time_step_sec: i32,
    pub deco_step_mm: i32,
    pub max_ndl_sec: i32,
    pub pp_graphs: PartialPressureGraphs,
    /// pO2 used for the maximum operating depth.
    pub mod_po2: f64,
    pub show_sac: bool,
    pub show_mod: bool,
    pub show_ead: bool,
    pub units: UnitSystem,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            calc_ceiling: true,
            calc_ceiling_3m_incr: false,
            calc_all_tissues: false,
            calc_ndl_tts: false,
            gf_low: 0.30,
            gf_high: 0.75,
            last_deco_stop_mm: 3000,
            ascent_mm_per_step: 200,
            ascent_mm_per_deco_step: 16,
            time_step_sec: 10,
            deco_step_mm: 3000,
            max_ndl_sec: 7200,
            pp_graphs: PartialPressureGraphs::default(),
            mod_po2: 1.6,
            show_sac: false,
            show_mod: false,
            show_ead: false,
            units: UnitSystem::Metric,
        }
    }
}

impl Preferences {
    pub fn pp_graphs_enabled(&self) -> bool {
        self.pp_graphs.po2 || self.pp_graphs.pn2 || self.pp_graphs.phe
    }
}
