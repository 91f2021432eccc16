//! Output model: the dense, reconstructed series consumed by renderers.

use crate::models::MAX_CYLINDERS;

/// Number of tissue compartments with an individual ceiling.
pub const NUM_COMPARTMENTS: usize = 16;

/// Half-widths (seconds) of the rolling depth windows.
pub const WINDOW_HALF_WIDTHS_SEC: [i32; 3] = [90, 180, 270];

/// How a cylinder slot is being used at a given instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CylinderUse {
    #[default]
    NotInUse,
    Oc,
    CcrO2,
    CcrDiluent,
}

impl CylinderUse {
    pub fn in_use(&self) -> bool {
        *self != CylinderUse::NotInUse
    }

    /// Open circuit and diluent are what the diver breathes from.
    pub fn is_breathing(&self) -> bool {
        matches!(self, CylinderUse::Oc | CylinderUse::CcrDiluent)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CylinderUse::NotInUse => "unused",
            CylinderUse::Oc => "OC",
            CylinderUse::CcrO2 => "CCR O2",
            CylinderUse::CcrDiluent => "CCR diluent",
        }
    }
}

/// Vertical velocity bucket, ordered by severity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Velocity {
    #[default]
    Stable,
    Slow,
    Moderate,
    Fast,
    Crazy,
}

impl Velocity {
    /// Classify a vertical speed in mm/s (negative = ascending). Ascent
    /// thresholds are about half the descent ones: ascending at 200 mm/s
    /// (12 m/min) is already `Fast`, while descending at the same rate is
    /// only `Moderate`.
    ///
    /// | bucket     | ascent (mm/s)  | descent (mm/s) |
    /// |------------|----------------|----------------|
    /// | `Stable`   | above -25      | below 25       |
    /// | `Slow`     | -25 to -76     | 25 to 152      |
    /// | `Moderate` | -76 to -152    | 152 to 304     |
    /// | `Fast`     | -152 to -304   | 304 to 507     |
    /// | `Crazy`    | below -304     | 507 and above  |
    pub fn from_speed(speed: i32) -> Self {
        if speed < -304 {
            // faster than 60ft/min up
            Velocity::Crazy
        } else if speed < -152 {
            Velocity::Fast
        } else if speed < -76 {
            Velocity::Moderate
        } else if speed < -25 {
            Velocity::Slow
        } else if speed < 25 {
            Velocity::Stable
        } else if speed < 152 {
            Velocity::Slow
        } else if speed < 304 {
            Velocity::Moderate
        } else if speed < 507 {
            // up to 100ft/min down
            Velocity::Fast
        } else {
            Velocity::Crazy
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CylinderState {
    pub usage: CylinderUse,
    /// Reading from the sensor; 0 = unknown.
    pub sensor_pressure: i32,
    /// Reconstructed pressure where no reading exists.
    pub interpolated_pressure: i32,
    /// Pressure-time accumulated from the previous entry.
    pub pressure_time: i64,
    /// Surface air consumption in ml/min.
    pub sac: i32,
}

impl CylinderState {
    /// Best known pressure: the sensor reading, else the reconstruction.
    pub fn pressure(&self) -> i32 {
        if self.sensor_pressure != 0 {
            self.sensor_pressure
        } else {
            self.interpolated_pressure
        }
    }
}

/// Rolling depth statistics around an entry; indices point into the series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepthWindow {
    pub min_index: usize,
    pub max_index: usize,
    pub avg_depth_mm: i32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlotEntry {
    pub sec: i32,
    pub depth_mm: i32,
    pub smoothed_mm: i32,
    /// 0 = unknown.
    pub temperature_mk: u32,
    /// Vertical speed in mm/s, positive when descending.
    pub speed: i32,
    pub velocity: Velocity,
    pub cylinders: [CylinderState; MAX_CYLINDERS],
    /// Partial pressures in bar. `po2` holds the sensed loop pO2 until the
    /// gas calculation replaces it.
    pub po2: f64,
    pub phe: f64,
    pub pn2: f64,
    pub mod_mm: i32,
    pub ead_mm: i32,
    pub end_mm: i32,
    pub eadd_mm: i32,
    pub ceiling_mm: i32,
    pub ceilings_mm: [i32; NUM_COMPARTMENTS],
    /// Values reported by the dive computer.
    pub ndl_sec: i32,
    pub stop_depth_mm: i32,
    pub stop_time_sec: i32,
    pub in_deco: bool,
    pub cns: u8,
    /// Values estimated by the decompression driver.
    pub ndl_calc_sec: i32,
    pub tts_calc_sec: i32,
    pub stop_depth_calc_mm: i32,
    pub stop_time_calc_sec: i32,
    pub in_deco_calc: bool,
    pub windows: [DepthWindow; 3],
}

impl PlotEntry {
    /// The open-circuit or diluent cylinder in use, if any.
    pub fn breathing_cylinder(&self) -> Option<usize> {
        self.cylinders.iter().position(|c| c.usage.is_breathing())
    }
}

/// Scaling limits gathered from every dive computer of a dive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlotLimits {
    pub max_depth_mm: i32,
    pub max_time_sec: i32,
    pub max_pressure_mbar: i32,
    pub min_pressure_mbar: i32,
    pub min_temp_mk: u32,
    pub max_temp_mk: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlotInfo {
    pub entries: Vec<PlotEntry>,
    pub max_depth_mm: i32,
    pub max_time_sec: i32,
    pub max_pressure_mbar: i32,
    pub min_pressure_mbar: i32,
    pub min_temp_mk: u32,
    pub max_temp_mk: u32,
    /// Largest displayed partial pressure, in bar.
    pub max_pp: f64,
    pub mean_depth_mm: i32,
    pub has_ndl: bool,
}

impl PlotInfo {
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Index of the first entry at or after `sec`, if `sec` lies inside the
    /// series.
    pub fn entry_index_at(&self, sec: i32) -> Option<usize> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        if sec < first.sec || sec > last.sec {
            return None;
        }
        self.entries.iter().position(|e| e.sec >= sec)
    }

    pub fn entry_at(&self, sec: i32) -> Option<&PlotEntry> {
        self.entry_index_at(sec).map(|i| &self.entries[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_asymmetry() {
        assert_eq!(Velocity::from_speed(-200), Velocity::Fast);
        assert_eq!(Velocity::from_speed(200), Velocity::Moderate);
        assert!(Velocity::from_speed(-200) > Velocity::from_speed(200));
    }

    #[test]
    fn test_velocity_buckets() {
        assert_eq!(Velocity::from_speed(0), Velocity::Stable);
        assert_eq!(Velocity::from_speed(-24), Velocity::Stable);
        assert_eq!(Velocity::from_speed(24), Velocity::Stable);
        assert_eq!(Velocity::from_speed(-50), Velocity::Slow);
        assert_eq!(Velocity::from_speed(100), Velocity::Slow);
        assert_eq!(Velocity::from_speed(-100), Velocity::Moderate);
        assert_eq!(Velocity::from_speed(400), Velocity::Fast);
        assert_eq!(Velocity::from_speed(-400), Velocity::Crazy);
        assert_eq!(Velocity::from_speed(600), Velocity::Crazy);
    }

    #[test]
    fn test_pressure_prefers_sensor() {
        let mut cyl = CylinderState {
            interpolated_pressure: 150_000,
            ..CylinderState::default()
        };
        assert_eq!(cyl.pressure(), 150_000);
        cyl.sensor_pressure = 151_000;
        assert_eq!(cyl.pressure(), 151_000);
    }

    #[test]
    fn test_entry_lookup_bounds() {
        let pi = PlotInfo {
            entries: (0..5)
                .map(|i| PlotEntry {
                    sec: i * 10,
                    ..PlotEntry::default()
                })
                .collect(),
            ..PlotInfo::default()
        };
        assert_eq!(pi.entry_index_at(0), Some(0));
        assert_eq!(pi.entry_index_at(15), Some(2));
        assert_eq!(pi.entry_index_at(40), Some(4));
        assert_eq!(pi.entry_index_at(41), None);
        assert_eq!(pi.entry_index_at(-1), None);
        assert!(PlotInfo::default().entry_at(0).is_none());
    }
}
