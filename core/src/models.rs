//! Input data model handed over by the dive-log parser.
//!
//! All depths are millimetres, pressures millibar, temperatures millikelvin and
//! times seconds from the start of the dive, matching what dive computers
//! report. These records are read-only inputs to the plot-info pipeline.

use std::borrow::Cow;

/// Number of cylinder slots tracked per plot entry.
pub const MAX_CYLINDERS: usize = 8;

/// Name carried by gas switch events.
pub const GAS_CHANGE_EVENT: &str = "gaschange";

/// Oxygen fraction of air in permille.
pub const O2_IN_AIR: u32 = 209;

/// Nitrogen fraction of air in permille.
pub const N2_IN_AIR: u32 = 781;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasMix {
    /// Oxygen in permille; zero means "air".
    pub o2_permille: u32,
    /// Helium in permille.
    pub he_permille: u32,
}

impl GasMix {
    pub fn new(o2_permille: u32, he_permille: u32) -> Self {
        Self {
            o2_permille,
            he_permille,
        }
    }

    pub fn air() -> Self {
        Self::new(O2_IN_AIR, 0)
    }

    /// Oxygen in permille, treating an unset mix as air.
    pub fn o2(&self) -> u32 {
        if self.o2_permille == 0 {
            O2_IN_AIR
        } else {
            self.o2_permille
        }
    }

    pub fn he(&self) -> u32 {
        self.he_permille
    }

    pub fn n2(&self) -> u32 {
        1000u32.saturating_sub(self.o2() + self.he())
    }

    pub fn o2_fraction(&self) -> f64 {
        self.o2() as f64 / 1000.0
    }

    pub fn he_fraction(&self) -> f64 {
        self.he() as f64 / 1000.0
    }
}

/// What a cylinder is rigged for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CylinderRole {
    #[default]
    OpenCircuit,
    /// Rebreather diluent.
    Diluent,
    /// Rebreather oxygen supply.
    Oxygen,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cylinder {
    pub description: String,
    /// Water capacity in millilitres.
    pub size_ml: u32,
    pub working_pressure_mbar: u32,
    pub gasmix: GasMix,
    pub role: CylinderRole,
    /// Manually entered start pressure (0 = not entered).
    pub start_mbar: u32,
    /// Manually entered end pressure (0 = not entered).
    pub end_mbar: u32,
    /// First pressure seen in the samples, filled by the parser.
    pub sample_start_mbar: u32,
    /// Last pressure seen in the samples, filled by the parser.
    pub sample_end_mbar: u32,
}

impl Cylinder {
    /// A slot with no information at all is treated as absent.
    pub fn is_empty(&self) -> bool {
        self.size_ml == 0
            && self.working_pressure_mbar == 0
            && self.description.is_empty()
            && self.gasmix.o2_permille == 0
            && self.gasmix.he_permille == 0
            && self.start_mbar == 0
            && self.end_mbar == 0
    }

    pub fn start_pressure(&self) -> u32 {
        if self.start_mbar != 0 {
            self.start_mbar
        } else {
            self.sample_start_mbar
        }
    }

    pub fn end_pressure(&self) -> u32 {
        if self.end_mbar != 0 {
            self.end_mbar
        } else {
            self.sample_end_mbar
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sample {
    pub time_sec: i32,
    pub depth_mm: i32,
    pub temperature_mk: Option<u32>,
    pub cylinder_pressure_mbar: Option<u32>,
    /// Cylinder slot the pressure reading belongs to.
    pub sensor: u8,
    pub stop_depth_mm: i32,
    pub stop_time_sec: i32,
    pub ndl_sec: i32,
    pub in_deco: bool,
    pub cns: u8,
    /// Loop oxygen partial pressure reported by a rebreather.
    pub po2_mbar: Option<u32>,
}

impl Sample {
    pub fn new(time_sec: i32, depth_mm: i32) -> Self {
        Self {
            time_sec,
            depth_mm,
            ..Self::default()
        }
    }

    pub fn with_pressure(mut self, sensor: u8, mbar: u32) -> Self {
        self.sensor = sensor;
        self.cylinder_pressure_mbar = Some(mbar);
        self
    }

    pub fn with_temperature(mut self, mkelvin: u32) -> Self {
        self.temperature_mk = Some(mkelvin);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    pub time_sec: i32,
    pub name: String,
    /// libdivecomputer sample event type.
    pub kind: u32,
    pub value: u32,
    pub flags: u32,
}

impl Event {
    pub fn is_gas_change(&self) -> bool {
        self.name == GAS_CHANGE_EVENT
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiveComputer {
    pub model: String,
    pub duration_sec: i32,
    pub max_depth_mm: i32,
    pub mean_depth_mm: i32,
    /// 0 when the computer did not record it.
    pub surface_pressure_mbar: u32,
    pub samples: Vec<Sample>,
    pub events: Vec<Event>,
}

impl DiveComputer {
    /// Recorded samples, or a synthetic square profile when the computer
    /// only stored summary data.
    pub fn effective_samples(&self) -> Cow<'_, [Sample]> {
        if self.samples.is_empty() {
            Cow::Owned(crate::densify::synthesize_samples(self))
        } else {
            Cow::Borrowed(&self.samples)
        }
    }

    /// Distinct event names in order of first appearance.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for event in &self.events {
            if event.name.is_empty() || names.iter().any(|n| *n == event.name) {
                continue;
            }
            names.push(event.name.clone());
        }
        names
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dive {
    pub max_depth_mm: i32,
    pub min_temp_mk: u32,
    pub max_temp_mk: u32,
    /// 0 means standard atmosphere.
    pub surface_pressure_mbar: u32,
    /// Water density in g/10l; 0 means sea water.
    pub salinity: u32,
    pub cylinders: Vec<Cylinder>,
    pub computers: Vec<DiveComputer>,
}

impl Dive {
    /// Cylinder in slot `index`, if configured.
    pub fn cylinder(&self, index: usize) -> Option<&Cylinder> {
        self.cylinders.get(index).filter(|c| !c.is_empty())
    }

    pub fn gasmix(&self, index: usize) -> GasMix {
        self.cylinders
            .get(index)
            .map(|c| c.gasmix)
            .unwrap_or_else(GasMix::air)
    }
}
