//! Reconstruction of per-cylinder tank pressure between sparse readings.
//!
//! Dive computers often report a cylinder's pressure only now and then (or
//! not at all once the diver switched away from it). For each cylinder we
//! split the series into segments bounded by known readings and integrate a
//! depth-weighted "pressure-time" over every step. Missing segment boundary
//! pressures are then shared out in proportion to each segment's
//! pressure-time, and the individual steps inside a segment are placed on a
//! ramp along their accumulated pressure-time.

use crate::models::{Dive, MAX_CYLINDERS};
use crate::plot_data::{CylinderUse, PlotEntry};
use crate::units::{depth_to_mbar, SURFACE_PRESSURE_MBAR, SURFACE_THRESHOLD_MM};

/// A run of entries for one cylinder between two pressure observations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PressureSegment {
    /// 0 = unknown.
    pub start: i32,
    /// 0 = unknown.
    pub end: i32,
    pub t_start: i32,
    pub t_end: i32,
    pub pressure_time: i64,
    pub usage: CylinderUse,
}

impl PressureSegment {
    fn new(start: i32, t_start: i32, usage: CylinderUse) -> Self {
        Self {
            start,
            end: 0,
            t_start,
            t_end: t_start,
            pressure_time: 0,
            usage,
        }
    }
}

/// Pressure-time between two consecutive entries; a unitless gas
/// consumption proxy.
///
/// Open circuit consumes in proportion to ambient pressure. Rebreather oxygen
/// consumption does not depend on depth (metabolism takes roughly 5% of one
/// atmosphere worth of gas), and diluent is only used to make up loop volume
/// on the way down.
pub fn pressure_time(dive: &Dive, a: &PlotEntry, b: &PlotEntry, usage: CylinderUse) -> i64 {
    let time = (b.sec - a.sec) as i64;
    let mean_depth = (a.depth_mm + b.depth_mm) / 2;

    let mbar = match usage {
        CylinderUse::Oc => {
            if mean_depth <= SURFACE_THRESHOLD_MM {
                return 0;
            }
            depth_to_mbar(mean_depth, dive)
        }
        CylinderUse::CcrO2 => SURFACE_PRESSURE_MBAR * 5 / 100,
        CylinderUse::CcrDiluent => {
            if b.depth_mm <= a.depth_mm || mean_depth <= SURFACE_THRESHOLD_MM {
                return 0;
            }
            depth_to_mbar(mean_depth, dive)
        }
        CylinderUse::NotInUse => return 0,
    };
    mbar as i64 * time
}

/// Seed the first and last in-use entries from the manually entered start
/// and end pressures of cylinders that never got a sensor reading.
pub fn setup_gas_sensor_pressure(dive: &Dive, entries: &mut [PlotEntry]) {
    for (index, cyl) in dive.cylinders.iter().enumerate().take(MAX_CYLINDERS) {
        let start = cyl.start_pressure() as i32;
        let end = cyl.end_pressure() as i32;
        if start == 0 || end == 0 {
            continue;
        }
        populate_cylinder_pressure_data(entries, index, start, end);
    }
}

fn populate_cylinder_pressure_data(entries: &mut [PlotEntry], index: usize, start: i32, end: i32) {
    let has_readings = entries.iter().any(|e| {
        let cyl = &e.cylinders[index];
        cyl.usage.in_use() && cyl.sensor_pressure != 0
    });
    if has_readings {
        return;
    }

    if let Some(first) = entries
        .iter_mut()
        .find(|e| e.cylinders[index].usage.in_use())
    {
        first.cylinders[index].sensor_pressure = start;
    }
    if let Some(last) = entries
        .iter_mut()
        .rev()
        .find(|e| e.cylinders[index].usage.in_use())
    {
        last.cylinders[index].sensor_pressure = end;
    }
}

/// Split the series into pressure segments for one cylinder, recording the
/// per-step pressure-time on the entries. Returns the segments and whether
/// any in-use entry lacks a reading.
pub(crate) fn track_segments(
    dive: &Dive,
    entries: &mut [PlotEntry],
    cyl: usize,
) -> (Vec<PressureSegment>, bool) {
    let mut segments: Vec<PressureSegment> = Vec::new();
    let mut missing = false;
    let mut first_segment_entry = true;

    for i in 0..entries.len() {
        let usage = entries[i].cylinders[cyl].usage;
        let pressure = entries[i].cylinders[cyl].sensor_pressure;

        if !usage.in_use() {
            first_segment_entry = true;
            continue;
        }

        if first_segment_entry || entries[i - 1].cylinders[cyl].usage != usage {
            first_segment_entry = false;
            if pressure == 0 {
                missing = true;
            }
            segments.push(PressureSegment::new(pressure, entries[i].sec, usage));
            continue;
        }

        let step = pressure_time(dive, &entries[i - 1], &entries[i], usage);
        entries[i].cylinders[cyl].pressure_time = step;
        let Some(current) = segments.last_mut() else {
            continue;
        };
        current.pressure_time += step;
        current.t_end = entries[i].sec;

        if pressure == 0 {
            missing = true;
            continue;
        }
        current.end = pressure;

        // continuous readings stay in one segment
        if entries[i - 1].cylinders[cyl].sensor_pressure != 0 {
            continue;
        }

        // the transmitter came back after a gap
        segments.push(PressureSegment::new(pressure, entries[i].sec, usage));
    }

    for segment in &segments {
        log::trace!(
            "cyl{cyl}: start {} end {} t_start {} t_end {} pt {} usage {:?}",
            segment.start,
            segment.end,
            segment.t_start,
            segment.t_end,
            segment.pressure_time,
            segment.usage
        );
    }
    (segments, missing)
}

/// Fill in unknown segment boundary pressures.
///
/// After switching away from a cylinder we know the start of the first
/// segment but not its end, then possibly several segments with neither,
/// until one finally has an end pressure. The drop across such a run is
/// shared out by pressure-time; the shares sum to the whole drop exactly.
pub(crate) fn fill_missing_segment_pressures(segments: &mut [PressureSegment]) {
    let mut i = 0;
    while i < segments.len() {
        let mut start = segments[i].start;
        let mut end;
        let mut j = i;
        let mut pt_sum: i64 = 0;
        loop {
            pt_sum += segments[j].pressure_time;
            end = segments[j].end;
            if end != 0 {
                break;
            }
            end = start;
            if j + 1 == segments.len() {
                break;
            }
            j += 1;
        }

        if start == 0 {
            start = end;
        }

        segments[i].start = start;
        segments[j].end = end;
        let mut pt: i64 = 0;
        let mut k = i;
        loop {
            pt += segments[k].pressure_time;
            let mut pressure = start;
            if k == j {
                pressure = end;
            } else if pt_sum != 0 {
                pressure -= ((start - end) as f64 * pt as f64 / pt_sum as f64).round() as i32;
            }
            segments[k].end = pressure;
            if k == j {
                break;
            }
            k += 1;
            segments[k].start = pressure;
        }

        i = j + 1;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Interpolation {
    start: i32,
    end: i32,
    pressure_time: i64,
    acc_pressure_time: i64,
}

/// Ramp parameters for entry `cur` inside `segment`: the nearest known
/// pressures on either side, the total pressure-time between them and how
/// much of it lies before `cur`.
fn interpolation_for(
    segment: &PressureSegment,
    entries: &[PlotEntry],
    cur: usize,
    cyl: usize,
) -> Interpolation {
    let mut interpolation = Interpolation {
        start: segment.start,
        end: segment.end,
        ..Interpolation::default()
    };

    for (i, entry) in entries.iter().enumerate() {
        let state = &entry.cylinders[cyl];
        if entry.sec < segment.t_start {
            continue;
        }
        if entry.sec >= segment.t_end {
            interpolation.pressure_time += state.pressure_time;
            break;
        }
        if entry.sec == segment.t_start {
            interpolation.acc_pressure_time = 0;
            interpolation.pressure_time = 0;
            if state.sensor_pressure != 0 {
                interpolation.start = state.sensor_pressure;
            }
            continue;
        }
        if i < cur {
            if state.sensor_pressure != 0 {
                interpolation.start = state.sensor_pressure;
                interpolation.acc_pressure_time = 0;
                interpolation.pressure_time = 0;
            } else {
                interpolation.acc_pressure_time += state.pressure_time;
                interpolation.pressure_time += state.pressure_time;
            }
            continue;
        }
        if i == cur {
            interpolation.acc_pressure_time += state.pressure_time;
            interpolation.pressure_time += state.pressure_time;
            continue;
        }
        interpolation.pressure_time += state.pressure_time;
        if state.sensor_pressure != 0 {
            interpolation.end = state.sensor_pressure;
            break;
        }
    }
    interpolation
}

fn fill_missing_tank_pressures(entries: &mut [PlotEntry], cyl: usize, segments: &mut [PressureSegment]) {
    fill_missing_segment_pressures(segments);
    let Some(first) = segments.first() else {
        return;
    };
    let mut current = first.start;

    // the first entry is a placeholder; start from the second in case there
    // is no sample at time zero
    for i in 1..entries.len() {
        let state = entries[i].cylinders[cyl];
        if !state.usage.in_use() {
            continue;
        }
        if state.sensor_pressure != 0 {
            current = state.sensor_pressure;
            continue;
        }

        let sec = entries[i].sec;
        let segment = segments.iter().find(|s| s.t_end >= sec);
        let Some(segment) = segment.filter(|s| s.pressure_time != 0) else {
            // nothing to apportion: hold the last known pressure
            entries[i].cylinders[cyl].interpolated_pressure = current;
            continue;
        };

        let interpolation = interpolation_for(segment, entries, i, cyl);
        log::trace!("interpolate cyl{cyl} entry {i}: {interpolation:?}");
        if interpolation.pressure_time != 0 {
            let slope = (interpolation.end - interpolation.start) as f64
                / interpolation.pressure_time as f64;
            current = (interpolation.start as f64 + slope * interpolation.acc_pressure_time as f64)
                .round() as i32;
        }
        entries[i].cylinders[cyl].interpolated_pressure = current;
    }
}

/// Integrate pressure-time for every cylinder and reconstruct the pressure
/// of every in-use entry that has no reading.
pub fn populate_pressure_information(dive: &Dive, entries: &mut [PlotEntry]) {
    for cyl in 0..MAX_CYLINDERS {
        let (mut segments, missing) = track_segments(dive, entries, cyl);
        if missing {
            fill_missing_tank_pressures(entries, cyl, &mut segments);
        }
    }
}
