//! Derived series: surface air consumption, smoothed depth, vertical
//! velocity and rolling depth windows.

use crate::models::{Dive, MAX_CYLINDERS};
use crate::plot_data::{DepthWindow, PlotEntry, Velocity, WINDOW_HALF_WIDTHS_SEC};
use crate::units::{depth_to_mbar, gas_volume, SURFACE_PRESSURE_MBAR};

/// Width of the averaging window for SAC.
pub const SAC_WINDOW_SEC: i32 = 45;

/// Short steps are reclassified over at least this many seconds.
const VELOCITY_WINDOW_SEC: i32 = 15;

/// Surface air consumption in ml/min for cylinder `cyl` between two
/// entries; 0 whenever it cannot be computed.
pub fn local_sac(dive: &Dive, a: &PlotEntry, b: &PlotEntry, cyl: usize) -> i32 {
    if !a.cylinders[cyl].usage.in_use() || !b.cylinders[cyl].usage.in_use() {
        return 0;
    }
    let duration = b.sec - a.sec;
    if duration <= 0 {
        return 0;
    }
    let start = a.cylinders[cyl].pressure();
    let end = b.cylinders[cyl].pressure();
    if start == 0 || end == 0 {
        return 0;
    }
    let Some(cylinder) = dive.cylinders.get(cyl) else {
        return 0;
    };

    let mean_depth = (a.depth_mm + b.depth_mm) / 2;
    let atm = depth_to_mbar(mean_depth, dive) as f64 / SURFACE_PRESSURE_MBAR as f64;
    let air_use = gas_volume(cylinder, start) - gas_volume(cylinder, end);
    (air_use as f64 / atm * 60.0 / duration as f64) as i32
}

/// Per-cylinder SAC averaged over a sliding window of roughly
/// [`SAC_WINDOW_SEC`].
pub fn calculate_sac(dive: &Dive, entries: &mut [PlotEntry]) {
    for cyl in 0..MAX_CYLINDERS {
        let mut baseline: Option<usize> = None;
        for i in 0..entries.len() {
            let usage = entries[i].cylinders[cyl].usage;
            if !usage.in_use() {
                baseline = None;
                continue;
            }

            let last = match baseline {
                Some(last) if entries[last].cylinders[cyl].usage == usage => last,
                _ => {
                    baseline = Some(i);
                    let sac = entries
                        .get(i + 1)
                        .map_or(0, |next| local_sac(dive, &entries[i], next, cyl));
                    entries[i].cylinders[cyl].sac = sac;
                    continue;
                }
            };

            let sum: i64 = (last..i)
                .map(|j| local_sac(dive, &entries[j], &entries[j + 1], cyl) as i64)
                .sum();
            entries[i].cylinders[cyl].sac = if i > last {
                (sum / (i - last) as i64) as i32
            } else {
                0
            };
            if entries[i].sec - entries[last].sec >= SAC_WINDOW_SEC {
                baseline = Some(last + 1);
            }
        }
    }
}

/// Speed in mm/s and its bucket for entry `i`, looking further back when
/// the samples are close together and the step is not already fast.
fn classify_velocity(entries: &[PlotEntry], i: usize) -> (i32, Velocity) {
    let cur = &entries[i];
    let prev = &entries[i - 1];
    let dt = cur.sec - prev.sec;
    if dt == 0 {
        return (0, Velocity::Stable);
    }

    let speed = (cur.depth_mm - prev.depth_mm) / dt;
    let mut velocity = Velocity::from_speed(speed);
    if dt < VELOCITY_WINDOW_SEC && velocity < Velocity::Fast {
        let mut past = i.saturating_sub(2);
        while past > 0 && cur.sec - entries[past].sec < VELOCITY_WINDOW_SEC {
            past -= 1;
        }
        let span = cur.sec - entries[past].sec;
        if span > 0 {
            velocity = Velocity::from_speed((cur.depth_mm - entries[past].depth_mm) / span);
        }
    }
    (speed, velocity)
}

fn depth_window(entries: &[PlotEntry], index: usize, half_width: i32) -> DepthWindow {
    let time = entries[index].sec;

    let mut p = index;
    while p > 0 && entries[p - 1].sec >= time - half_width {
        p -= 1;
    }

    let mut min = p;
    let mut max = p;
    let mut sum = entries[p].depth_mm as i64;
    let mut count: i64 = 1;
    for (j, entry) in entries.iter().enumerate().skip(p + 1) {
        if entry.sec > time + half_width {
            break;
        }
        sum += entry.depth_mm as i64;
        count += 1;
        if entry.depth_mm < entries[min].depth_mm {
            min = j;
        }
        if entry.depth_mm > entries[max].depth_mm {
            max = j;
        }
    }

    DepthWindow {
        min_index: min,
        max_index: max,
        avg_depth_mm: ((sum + count / 2) / count) as i32,
    }
}

/// Smoothing, velocity and rolling windows over the finished series.
pub fn analyze_plot_info(entries: &mut [PlotEntry]) {
    let n = entries.len();
    for entry in entries.iter_mut() {
        entry.smoothed_mm = entry.depth_mm;
    }

    // 5-point triangular smooth
    for i in 2..n.saturating_sub(2) {
        let weighted = entries[i - 2].depth_mm
            + 2 * entries[i - 1].depth_mm
            + 3 * entries[i].depth_mm
            + 2 * entries[i + 1].depth_mm
            + entries[i + 2].depth_mm;
        entries[i].smoothed_mm = (weighted + 4) / 9;
    }

    for i in 2..n {
        let (speed, velocity) = classify_velocity(entries, i);
        entries[i].speed = speed;
        entries[i].velocity = velocity;
    }

    for i in 0..n {
        let mut windows = [DepthWindow::default(); 3];
        for (window, half_width) in windows.iter_mut().zip(WINDOW_HALF_WIDTHS_SEC) {
            *window = depth_window(entries, i, half_width);
        }
        entries[i].windows = windows;
    }
}
