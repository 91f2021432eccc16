//! Text shown for a single instant (tooltip) and between two instants
//! (ruler). Field order and conditional lines are fixed; renderers rely on
//! them.

use crate::buhlmann::N2_HALF_TIMES;
use crate::models::MAX_CYLINDERS;
use crate::plot_data::{CylinderState, PlotEntry, PlotInfo};
use crate::preferences::{Preferences, UnitSystem};
use crate::units::{depth_units, pressure_units, temperature_units, vertical_speed_units};

const SUBSCRIPT_2: &str = "\u{2082}";
const DELTA: &str = "\u{0394}";
const DOWNWARDS_ARROW: &str = "\u{2193}";
const UPWARDS_ARROW: &str = "\u{2191}";
const AVERAGE: &str = "\u{00f8}";
const RIGHTWARDS_ARROW: &str = "\u{2192}";

fn div_up(seconds: i32, unit: i32) -> i32 {
    (seconds + unit - 1) / unit
}

/// Tooltip text for the first entry at or after `sec`; empty outside the
/// series.
pub fn describe_entry_at_time(pi: &PlotInfo, sec: i32, prefs: &Preferences) -> String {
    pi.entry_at(sec)
        .map(|entry| describe_entry(entry, pi.has_ndl, prefs))
        .unwrap_or_default()
}

/// Multi-line description of one entry.
pub fn describe_entry(entry: &PlotEntry, has_ndl: bool, prefs: &Preferences) -> String {
    let units = prefs.units;
    let mut lines: Vec<String> = Vec::new();

    let (depth, depth_unit) = depth_units(entry.depth_mm, units);
    lines.push(format!("@:{}:{:02}", entry.sec / 60, entry.sec % 60));
    lines.push(format!("D:{depth:.1} {depth_unit}"));

    for cyl in entry.cylinders.iter().filter(|c| c.usage.in_use()) {
        let pressure = cyl.pressure();
        if pressure == 0 {
            continue;
        }
        let (value, unit) = pressure_units(pressure, units);
        lines.push(format!("P ({}):{value} {unit}", cyl.usage.label()));
    }

    if entry.temperature_mk != 0 {
        let (value, unit) = temperature_units(entry.temperature_mk, units);
        lines.push(format!("T:{value:.1} {unit}"));
    }

    // shown positive when ascending
    let (mut speed, speed_unit) = vertical_speed_units(entry.speed.abs(), units);
    if entry.speed > 0 {
        speed = -speed;
    }
    lines.push(format!("V:{speed:.2} {speed_unit}"));

    if prefs.show_sac {
        for cyl in entry.cylinders.iter().filter(|c| c.usage.in_use()) {
            let sac = cyl.sac as f64 / 1000.0;
            lines.push(format!("SAC ({}):{sac:2.1}l/min", cyl.usage.label()));
        }
    }
    if entry.cns != 0 {
        lines.push(format!("CNS:{}%", entry.cns));
    }
    if prefs.pp_graphs.po2 {
        lines.push(format!("pO{SUBSCRIPT_2}:{:.2}bar", entry.po2));
    }
    if prefs.pp_graphs.pn2 {
        lines.push(format!("pN{SUBSCRIPT_2}:{:.2}bar", entry.pn2));
    }
    if prefs.pp_graphs.phe {
        lines.push(format!("pHe:{:.2}bar", entry.phe));
    }
    if prefs.show_mod {
        let (value, unit) = depth_units(entry.mod_mm, units);
        lines.push(format!("MOD:{}{unit}", value as i32));
    }
    if prefs.show_ead {
        let equivalents = [
            ("EAD", entry.ead_mm),
            ("END", entry.end_mm),
            ("EADD", entry.eadd_mm),
        ];
        for (label, mm) in equivalents {
            let (value, unit) = depth_units(mm, units);
            lines.push(format!("{label}:{}{unit}", value as i32));
        }
    }

    lines.extend(device_stop(entry, has_ndl, units));
    lines.extend(calculated_stop(entry, prefs));

    if entry.tts_calc_sec != 0 {
        lines.push(format!("TTS:{}min (calc)", div_up(entry.tts_calc_sec, 60)));
    }
    if entry.ceiling_mm != 0 {
        let (value, unit) = depth_units(entry.ceiling_mm, units);
        lines.push(format!("Calculated ceiling {value:.0} {unit}"));
        if prefs.calc_all_tissues {
            for (ceiling, half_time) in entry.ceilings_mm.iter().zip(N2_HALF_TIMES) {
                if *ceiling == 0 {
                    continue;
                }
                let (value, unit) = depth_units(*ceiling, units);
                lines.push(format!("Tissue {half_time:.0}min: {value:.0} {unit}"));
            }
        }
    }
    lines.join("\n")
}

/// Stop, deco or NDL state as reported by the dive computer. A stop while
/// NDL remains is a safety stop.
fn device_stop(entry: &PlotEntry, has_ndl: bool, units: UnitSystem) -> Option<String> {
    if entry.stop_depth_mm != 0 {
        let (depth, unit) = depth_units(entry.stop_depth_mm, units);
        let kind = if entry.ndl_sec != 0 { "Safetystop" } else { "Deco" };
        let line = if entry.stop_time_sec != 0 {
            let minutes = div_up(entry.stop_time_sec, 60);
            format!("{kind}:{minutes}min @ {depth:.0} {unit}")
        } else {
            format!("{kind}:unkn time @ {depth:.0} {unit}")
        };
        Some(line)
    } else if entry.in_deco {
        Some("In deco".to_string())
    } else if has_ndl {
        Some(format!("NDL:{}min", div_up(entry.ndl_sec, 60)))
    } else {
        None
    }
}

fn calculated_stop(entry: &PlotEntry, prefs: &Preferences) -> Option<String> {
    if entry.stop_depth_calc_mm != 0 && entry.stop_time_calc_sec != 0 {
        let (depth, unit) = depth_units(entry.stop_depth_calc_mm, prefs.units);
        let minutes = div_up(entry.stop_time_calc_sec, 60);
        Some(format!("Deco:{minutes}min @ {depth:.0} {unit} (calc)"))
    } else if entry.in_deco_calc {
        // no NDL left and no stop: a slow ascent is enough
        Some("In deco (calc)".to_string())
    } else if prefs.calc_ndl_tts && entry.ndl_calc_sec != 0 {
        Some(format!("NDL:{}min (calc)", div_up(entry.ndl_calc_sec, 60)))
    } else {
        None
    }
}

/// Pressure drawn from one cylinder between two ruler points. Zero is an
/// unknown pressure, so a cylinder without a value at either end has no
/// number.
fn pressure_change(
    index: usize,
    before: &CylinderState,
    after: &CylinderState,
    units: UnitSystem,
) -> String {
    let labels = format!(
        "{} {RIGHTWARDS_ARROW} {}",
        before.usage.label(),
        after.usage.label()
    );
    let (start, end) = (before.pressure(), after.pressure());
    if start == 0 || end == 0 {
        return format!(" {DELTA}P {index}:unkn {labels} ");
    }
    let (change, unit) = pressure_units(start - end, units);
    format!(" {DELTA}P {index}:{change} {unit} {labels} ")
}

/// Ruler text between entries `a` and `b` (in either order): elapsed time,
/// depth change and range, speed extremes and mean, and the pressure used
/// from every cylinder in use over the span.
///
/// With `absolute_speeds` the mean speed averages magnitudes, so ascents and
/// descents do not cancel out. Empty when an index is out of range or both
/// entries are at the same time.
pub fn compare_entries(
    entries: &[PlotEntry],
    a: usize,
    b: usize,
    absolute_speeds: bool,
    units: UnitSystem,
) -> String {
    let (Some(first), Some(second)) = (entries.get(a), entries.get(b)) else {
        return String::new();
    };
    let (start, stop) = match first.sec.cmp(&second.sec) {
        std::cmp::Ordering::Less => (a, b),
        std::cmp::Ordering::Greater => (b, a),
        std::cmp::Ordering::Equal => return String::new(),
    };
    let span = &entries[start.min(stop)..=start.max(stop)];
    let start = &entries[start];
    let stop = &entries[stop];

    let mut speed_sum: i64 = 0;
    let mut depth_sum: i64 = 0;
    let mut max_ascent = 0;
    let mut max_descent = 0;
    let mut min_depth = i32::MAX;
    let mut max_depth = 0;
    let mut cyl_used = [false; MAX_CYLINDERS];
    let mut last_sec = start.sec;

    for data in span {
        let dt = (data.sec - last_sec) as i64;
        let speed = if absolute_speeds {
            data.speed.abs()
        } else {
            data.speed
        };
        speed_sum += speed as i64 * dt;
        depth_sum += data.depth_mm as i64 * dt;

        max_descent = max_descent.max(data.speed);
        max_ascent = max_ascent.min(data.speed);
        min_depth = min_depth.min(data.depth_mm);
        max_depth = max_depth.max(data.depth_mm);

        for (used, cyl) in cyl_used.iter_mut().zip(&data.cylinders) {
            if cyl.usage.in_use() {
                *used = true;
            }
        }
        last_sec = data.sec;
    }

    let delta_time = stop.sec - start.sec;
    let avg_depth = (depth_sum / delta_time as i64) as i32;
    let avg_speed = (speed_sum / delta_time as i64) as i32;
    let delta_depth = (start.depth_mm - stop.depth_mm).abs();

    let mut buf = format!("{DELTA}T: {}:{:02} min", delta_time / 60, delta_time % 60);
    for (arrow, depth_mm) in [
        (DELTA, delta_depth),
        (DOWNWARDS_ARROW, min_depth),
        (UPWARDS_ARROW, max_depth),
        (AVERAGE, avg_depth),
    ] {
        let (value, unit) = depth_units(depth_mm, units);
        buf.push_str(&format!(" {arrow}D:{value:.1}{unit}"));
    }
    buf.push('\n');

    let speeds = [
        (DOWNWARDS_ARROW, max_descent),
        (UPWARDS_ARROW, max_ascent),
        (AVERAGE, avg_speed),
    ];
    let speeds: Vec<String> = speeds
        .iter()
        .map(|&(arrow, speed)| {
            let (value, unit) = vertical_speed_units(speed.abs(), units);
            format!("{arrow}V:{value:.2}{unit}")
        })
        .collect();
    buf.push_str(&speeds.join(" "));

    if cyl_used.iter().any(|used| *used) {
        buf.push('\n');
        for (index, _) in cyl_used.iter().enumerate().filter(|(_, used)| **used) {
            buf.push_str(&pressure_change(
                index,
                &start.cylinders[index],
                &stop.cylinders[index],
                units,
            ));
        }
    }
    buf
}
