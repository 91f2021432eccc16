//! Resampling of irregular dive computer samples onto a dense time grid.
//!
//! The series always starts with two placeholder entries at time zero and ends
//! with two surface entries one and two seconds after the last sample, so that
//! every consumer can look one or two entries back/ahead without bounds checks.

use crate::error::PlotError;
use crate::models::{Dive, DiveComputer, Sample, MAX_CYLINDERS};
use crate::plot_data::{PlotEntry, PlotLimits};
use crate::units::SURFACE_THRESHOLD_MM;

/// Longest gap between two entries of the densified series.
pub const MAX_STEP_SEC: i32 = 10;

/// Ascent/descent rate assumed for synthetic profiles (mm per minute).
const SYNTHETIC_RATE_MM_PER_MIN: i64 = 9000;

/// Linear interpolation rounded to the nearest integer.
pub(crate) fn interpolate(a: i32, b: i32, part: i32, whole: i32) -> i32 {
    if whole == 0 {
        return b;
    }
    let x = a as f64 * (whole - part) as f64 + b as f64 * part as f64;
    (x / whole as f64).round() as i32
}

/// Build a four point profile for a computer that only kept summary data.
/// Uses 9 m/min up and down, which stays just below the FAST bucket.
pub fn synthesize_samples(dc: &DiveComputer) -> Vec<Sample> {
    let duration = dc.duration_sec.max(0);
    let max_depth = dc.max_depth_mm.max(0);
    let mut asc_desc_time = (max_depth as i64 * 60 / SYNTHETIC_RATE_MM_PER_MIN) as i32;
    if asc_desc_time * 2 >= duration {
        asc_desc_time = duration / 2;
    }
    vec![
        Sample::new(0, 0),
        Sample::new(asc_desc_time, max_depth),
        Sample::new(duration - asc_desc_time, max_depth),
        Sample::new(duration, 0),
    ]
}

/// Scan every dive computer of the dive for the plot scaling limits.
pub fn calculate_max_limits(dive: &Dive) -> PlotLimits {
    let mut max_depth = dive.max_depth_mm;
    let mut max_time = 0;
    let mut max_pressure = dive
        .cylinders
        .iter()
        .map(|c| c.start_mbar as i32)
        .max()
        .unwrap_or(0);
    let mut min_pressure = i32::MAX;
    let mut min_temp = dive.min_temp_mk;
    let mut max_temp = dive.max_temp_mk;

    for dc in &dive.computers {
        let samples = dc.effective_samples();
        let mut last_depth = 0;
        for sample in samples.iter() {
            let depth = sample.depth_mm;
            let pressure = sample.cylinder_pressure_mbar.unwrap_or(0) as i32;

            if let Some(temperature) = sample.temperature_mk.filter(|t| *t != 0) {
                if min_temp == 0 || temperature < min_temp {
                    min_temp = temperature;
                }
                if temperature > max_temp {
                    max_temp = temperature;
                }
            }

            if pressure != 0 && pressure < min_pressure {
                min_pressure = pressure;
            }
            if pressure > max_pressure {
                max_pressure = pressure;
            }

            if depth > max_depth {
                max_depth = depth;
            }
            if (depth > SURFACE_THRESHOLD_MM || last_depth > SURFACE_THRESHOLD_MM)
                && sample.time_sec > max_time
            {
                max_time = sample.time_sec;
            }
            last_depth = depth;
        }
    }

    if min_pressure > max_pressure {
        min_pressure = 0;
    }

    PlotLimits {
        max_depth_mm: max_depth,
        max_time_sec: max_time,
        max_pressure_mbar: max_pressure,
        min_pressure_mbar: min_pressure,
        min_temp_mk: min_temp,
        max_temp_mk: max_temp,
    }
}

/// Resample `dc` onto a grid with at most [`MAX_STEP_SEC`] between entries,
/// stopping at `max_time`.
pub fn populate_plot_entries(dc: &DiveComputer, max_time: i32) -> Result<Vec<PlotEntry>, PlotError> {
    let samples = dc.effective_samples();

    // Samples may be denser than the grid, and we add four bracket entries
    // plus one spare.
    let capacity = samples.len() + 5 + (max_time.max(0) / MAX_STEP_SEC) as usize;
    let mut entries: Vec<PlotEntry> = Vec::new();
    entries
        .try_reserve_exact(capacity)
        .map_err(|_| PlotError::Allocation {
            requested: capacity as u64,
        })?;

    entries.push(PlotEntry::default());
    entries.push(PlotEntry::default());

    let mut last_depth = 0;
    let mut last_time = 0;
    let mut last_temp = 0;
    for sample in samples.iter() {
        let mut time = sample.time_sec;
        let depth = sample.depth_mm;

        let mut delta = time - last_time;
        if delta < 0 {
            // time went backwards: treat as a zero-width step
            time = last_time;
            delta = 0;
        }

        let mut offset = MAX_STEP_SEC;
        while offset < delta {
            if last_time + offset > max_time {
                break;
            }
            let mut entry = entries[entries.len() - 1].clone();
            entry.sec = last_time + offset;
            entry.depth_mm = interpolate(last_depth, depth, offset, delta);
            // pressure gets reconstructed later, not carried over
            for cyl in entry.cylinders.iter_mut() {
                cyl.sensor_pressure = 0;
            }
            entries.push(entry);
            offset += MAX_STEP_SEC;
        }

        if time > max_time {
            break;
        }

        let mut entry = PlotEntry {
            sec: time,
            depth_mm: depth,
            stop_depth_mm: sample.stop_depth_mm,
            stop_time_sec: sample.stop_time_sec,
            ndl_sec: sample.ndl_sec,
            in_deco: sample.in_deco,
            cns: sample.cns,
            po2: sample.po2_mbar.unwrap_or(0) as f64 / 1000.0,
            ..PlotEntry::default()
        };

        let sensor = sample.sensor as usize;
        if let Some(mbar) = sample.cylinder_pressure_mbar {
            if sensor < MAX_CYLINDERS {
                entry.cylinders[sensor].sensor_pressure = mbar as i32;
            } else {
                log::warn!(
                    "sample at {}s reports pressure for sensor {sensor}, ignoring",
                    sample.time_sec
                );
            }
        }

        if let Some(temperature) = sample.temperature_mk.filter(|t| *t != 0) {
            last_temp = temperature;
        }
        entry.temperature_mk = last_temp;

        entries.push(entry);
        last_time = time;
        last_depth = depth;
    }

    entries.push(PlotEntry {
        sec: last_time + 1,
        ..PlotEntry::default()
    });
    entries.push(PlotEntry {
        sec: last_time + 2,
        ..PlotEntry::default()
    });

    log::debug!(
        "densified {} samples into {} entries (max time {max_time}s)",
        samples.len(),
        entries.len()
    );
    Ok(entries)
}
