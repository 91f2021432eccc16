//! Assigns, per entry, how each cylinder slot is in use.

use crate::models::{CylinderRole, Dive, DiveComputer, Event, MAX_CYLINDERS};
use crate::plot_data::{CylinderUse, PlotEntry};

/// libdivecomputer gas switch carrying only the O2 percentage.
pub const SAMPLE_EVENT_GASCHANGE: u32 = 11;
/// libdivecomputer gas switch carrying O2 and He percentages.
pub const SAMPLE_EVENT_GASCHANGE2: u32 = 25;

fn breathing_use(role: CylinderRole) -> CylinderUse {
    match role {
        CylinderRole::Diluent => CylinderUse::CcrDiluent,
        CylinderRole::OpenCircuit | CylinderRole::Oxygen => CylinderUse::Oc,
    }
}

/// Starting state for every entry: the first breathable cylinder is active
/// and rebreather oxygen cylinders feed the loop for the whole dive.
pub fn assign_default_usage(dive: &Dive, entries: &mut [PlotEntry]) {
    let mut initial = [CylinderUse::NotInUse; MAX_CYLINDERS];
    let mut breathing = None;
    for (index, cyl) in dive.cylinders.iter().enumerate().take(MAX_CYLINDERS) {
        if cyl.is_empty() {
            continue;
        }
        match cyl.role {
            CylinderRole::Oxygen => initial[index] = CylinderUse::CcrO2,
            role if breathing.is_none() => {
                initial[index] = breathing_use(role);
                breathing = Some(index);
            }
            _ => {}
        }
    }
    if breathing.is_none() && initial[0] == CylinderUse::NotInUse {
        // no usable cylinder description: assume the diver breathes from slot 0
        initial[0] = CylinderUse::Oc;
    }

    for entry in entries.iter_mut() {
        for (cyl, usage) in entry.cylinders.iter_mut().zip(initial) {
            cyl.usage = usage;
        }
    }
}

/// Decode a gas switch value into permille (O2, He). The event carries
/// percentages, O2 in the low and He in the high 16 bits.
pub fn gas_change_target(event: &Event) -> (i32, i32) {
    let o2 = (event.value & 0xFFFF) as i32 * 10;
    let he = (event.value >> 16) as i32 * 10;
    (o2, he)
}

/// Configured cylinder closest to the mix a gas switch asks for. Helium is
/// only compared for the event type that reports it; ties go to the lowest
/// slot.
pub fn cylinder_index_for(dive: &Dive, event: &Event) -> usize {
    let (target_o2, target_he) = gas_change_target(event);
    let mut best = 0;
    let mut score = i64::MAX;

    for (index, cyl) in dive.cylinders.iter().enumerate().take(MAX_CYLINDERS) {
        if cyl.is_empty() {
            continue;
        }
        let delta_o2 = (cyl.gasmix.o2() as i32 - target_o2) as i64;
        let delta_he = (cyl.gasmix.he() as i32 - target_he) as i64;
        let mut distance = delta_o2 * delta_o2;
        if event.kind == SAMPLE_EVENT_GASCHANGE2 {
            distance += delta_he * delta_he;
        }
        if distance >= score {
            continue;
        }
        score = distance;
        best = index;
    }
    best
}

/// Mark `cylinder` as the breathing gas on entries from `start` until
/// `end_sec` (exclusive; `None` runs to the end). Returns the first entry
/// not touched.
fn set_cylinder_index(
    dive: &Dive,
    entries: &mut [PlotEntry],
    start: usize,
    cylinder: usize,
    end_sec: Option<i32>,
) -> usize {
    let role = dive
        .cylinders
        .get(cylinder)
        .map(|c| c.role)
        .unwrap_or_default();
    let usage = breathing_use(role);

    let mut i = start;
    while i < entries.len() {
        let entry = &mut entries[i];
        if end_sec.is_some_and(|end| entry.sec >= end) {
            break;
        }
        for (index, cyl) in entry.cylinders.iter_mut().enumerate() {
            if index != cylinder && cyl.usage.is_breathing() {
                cyl.usage = CylinderUse::NotInUse;
            }
        }
        // Readings are keyed by sensor slot, so one taken at the switch
        // belongs to the cylinder in that slot and stays as a segment anchor.
        // Readings of the slot switched away from sit on unused entries and
        // are never tracked.
        entry.cylinders[cylinder].usage = usage;
        i += 1;
    }
    i
}

/// Walk the gas switch events and assign the breathing cylinder to each
/// entry. Without gas switches the default usage is left alone.
pub fn check_gas_change_events(dive: &Dive, dc: &DiveComputer, entries: &mut [PlotEntry]) {
    let mut events: Vec<&Event> = dc.events.iter().filter(|e| e.is_gas_change()).collect();
    if events.is_empty() {
        return;
    }
    events.sort_by_key(|e| e.time_sec);

    let mut cylinder = entries
        .first()
        .and_then(|e| e.breathing_cylinder())
        .unwrap_or(0);
    let mut i = 0;
    for event in events {
        i = set_cylinder_index(dive, entries, i, cylinder, Some(event.time_sec));
        cylinder = cylinder_index_for(dive, event);
        log::debug!("gas switch at {}s to cylinder {cylinder}", event.time_sec);
    }
    set_cylinder_index(dive, entries, i, cylinder, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cylinder, GasMix};

    fn cylinder(o2: u32, he: u32) -> Cylinder {
        Cylinder {
            size_ml: 11_100,
            gasmix: GasMix::new(o2, he),
            ..Cylinder::default()
        }
    }

    fn gas_change(time_sec: i32, kind: u32, o2_percent: u32, he_percent: u32) -> Event {
        Event {
            time_sec,
            name: "gaschange".to_string(),
            kind,
            value: o2_percent | (he_percent << 16),
            flags: 0,
        }
    }

    fn entries(secs: &[i32]) -> Vec<PlotEntry> {
        secs.iter()
            .map(|&sec| PlotEntry {
                sec,
                ..PlotEntry::default()
            })
            .collect()
    }

    #[test]
    fn test_decode_gas_change_value() {
        let ev = gas_change(0, SAMPLE_EVENT_GASCHANGE2, 21, 35);
        assert_eq!(gas_change_target(&ev), (210, 350));
    }

    #[test]
    fn test_helium_only_counts_for_gaschange2() {
        let dive = Dive {
            cylinders: vec![cylinder(180, 0), cylinder(210, 350)],
            ..Dive::default()
        };
        // only O2 is compared, and slot 1 matches it exactly
        assert_eq!(cylinder_index_for(&dive, &gas_change(0, SAMPLE_EVENT_GASCHANGE, 21, 0)), 1);

        let dive = Dive {
            cylinders: vec![cylinder(210, 350), cylinder(210, 0)],
            ..Dive::default()
        };
        // same O2: without helium the first slot wins the tie
        assert_eq!(cylinder_index_for(&dive, &gas_change(0, SAMPLE_EVENT_GASCHANGE, 21, 0)), 0);
        // with helium the air cylinder is the exact match
        assert_eq!(cylinder_index_for(&dive, &gas_change(0, SAMPLE_EVENT_GASCHANGE2, 21, 0)), 1);
    }

    #[test]
    fn test_empty_slots_are_skipped() {
        let dive = Dive {
            cylinders: vec![Cylinder::default(), cylinder(500, 0)],
            ..Dive::default()
        };
        assert_eq!(cylinder_index_for(&dive, &gas_change(0, SAMPLE_EVENT_GASCHANGE, 21, 0)), 1);
    }

    #[test]
    fn test_switch_splits_at_event_time() {
        let dive = Dive {
            cylinders: vec![cylinder(0, 0), cylinder(320, 0)],
            computers: vec![DiveComputer {
                events: vec![gas_change(600, SAMPLE_EVENT_GASCHANGE, 32, 0)],
                ..DiveComputer::default()
            }],
            ..Dive::default()
        };
        let mut series = entries(&[0, 0, 0, 300, 590, 600, 610, 1200, 1201, 1202]);
        assign_default_usage(&dive, &mut series);
        check_gas_change_events(&dive, &dive.computers[0], &mut series);

        for entry in &series {
            let (active, idle) = if entry.sec < 600 { (0, 1) } else { (1, 0) };
            assert_eq!(entry.cylinders[active].usage, CylinderUse::Oc, "at {}s", entry.sec);
            assert_eq!(entry.cylinders[idle].usage, CylinderUse::NotInUse, "at {}s", entry.sec);
            assert_eq!(entry.breathing_cylinder(), Some(active));
        }
    }

    #[test]
    fn test_no_events_keeps_default() {
        let dive = Dive {
            cylinders: vec![cylinder(0, 0), cylinder(500, 0)],
            ..Dive::default()
        };
        let mut series = entries(&[0, 10, 20]);
        assign_default_usage(&dive, &mut series);
        let before = series.clone();
        check_gas_change_events(&dive, &DiveComputer::default(), &mut series);
        assert_eq!(series, before);
        assert!(series.iter().all(|e| e.breathing_cylinder() == Some(0)));
    }

    #[test]
    fn test_rebreather_default_usage() {
        let dive = Dive {
            cylinders: vec![
                Cylinder {
                    role: CylinderRole::Oxygen,
                    ..cylinder(1000, 0)
                },
                Cylinder {
                    role: CylinderRole::Diluent,
                    ..cylinder(210, 0)
                },
            ],
            ..Dive::default()
        };
        let mut series = entries(&[0, 10]);
        assign_default_usage(&dive, &mut series);
        assert_eq!(series[1].cylinders[0].usage, CylinderUse::CcrO2);
        assert_eq!(series[1].cylinders[1].usage, CylinderUse::CcrDiluent);
        assert_eq!(series[1].breathing_cylinder(), Some(1));
    }

    #[test]
    fn test_switch_keeps_slot_readings() {
        let dive = Dive {
            cylinders: vec![cylinder(0, 0), cylinder(500, 0)],
            computers: vec![DiveComputer {
                events: vec![gas_change(600, SAMPLE_EVENT_GASCHANGE, 50, 0)],
                ..DiveComputer::default()
            }],
            ..Dive::default()
        };
        let mut series = entries(&[0, 300, 600, 900]);
        for (entry, pressure) in series.iter_mut().zip([200_000, 190_000, 180_000, 175_000]) {
            entry.cylinders[0].sensor_pressure = pressure;
        }
        series[2].cylinders[1].sensor_pressure = 199_000;
        assign_default_usage(&dive, &mut series);
        check_gas_change_events(&dive, &dive.computers[0], &mut series);

        assert_eq!(series[2].cylinders[1].usage, CylinderUse::Oc);
        assert_eq!(series[2].cylinders[1].sensor_pressure, 199_000);
        // slot 0 readings after the switch are on unused entries
        for entry in &series[2..] {
            assert_eq!(entry.cylinders[0].usage, CylinderUse::NotInUse);
        }
        assert_eq!(series[1].cylinders[0].sensor_pressure, 190_000);
    }
}
